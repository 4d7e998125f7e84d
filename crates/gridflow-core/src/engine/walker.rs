//! Graph walker: drives step execution over a validated step graph.
//!
//! Computes the execution plan (declaration order, or the reachable set
//! when an anchor is given), runs each step through the `StepRunner`, and
//! records results in the run context. Each reachable step executes at
//! most once per walk. The first step failure aborts the walk and
//! propagates a wrapped error naming the failing step.

use gridflow_types::workflow::StepDefinition;

use super::context::RunContext;
use super::graph::{self, GraphError};
use super::step::{StepError, StepRunner};

/// Errors raised while walking a workflow's step graph.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// Plan computation failed (unknown anchor).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A step failed; the whole walk is aborted.
    #[error("step '{step_name}' failed: {source}")]
    StepFailed {
        step_name: String,
        #[source]
        source: StepError,
    },
}

/// Execute the workflow's steps, recording each result into `ctx`.
///
/// Without an anchor every runnable step executes in declaration order;
/// with an anchor only the steps reachable from it. Returns the number of
/// steps executed.
pub async fn walk(
    runner: &StepRunner,
    steps: &[StepDefinition],
    anchor: Option<&str>,
    ctx: &mut RunContext,
) -> Result<u32, WalkError> {
    let plan = graph::execution_order(steps, anchor)?;

    let mut executed = 0u32;
    for step in plan {
        tracing::debug!(step = %step.id, name = %step.name, "executing step");
        let result = runner
            .run(step, ctx)
            .await
            .map_err(|source| WalkError::StepFailed {
                step_name: step.name.clone(),
                source,
            })?;
        ctx.record(&step.id, result);
        executed += 1;
    }

    Ok(executed)
}

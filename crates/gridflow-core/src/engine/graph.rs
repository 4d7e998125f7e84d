//! Step graph validation, reachability, and execution ordering.
//!
//! Uses `petgraph` to model `next_steps` edges as a directed graph.
//! Topological sort rejects cyclic graphs at create/update time, so a run
//! can never loop: by the time the walker sees a workflow its graph is
//! known to be acyclic.

use std::collections::{HashMap, HashSet};

use gridflow_types::workflow::{StepDefinition, StepKind};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised by graph validation and ordering.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A workflow must contain at least one step.
    #[error("workflow has no steps")]
    EmptyWorkflow,

    /// Two steps share the same ID.
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    /// A `next_steps` entry references a step that does not exist.
    #[error("step '{step}' references unknown successor '{successor}'")]
    UnknownSuccessor { step: String, successor: String },

    /// A step's declared kind disagrees with its config variant.
    #[error("step '{step}' kind '{kind:?}' does not match its config")]
    KindMismatch { step: String, kind: StepKind },

    /// The successor edges form a cycle.
    #[error("cycle detected involving step '{0}'")]
    CycleDetected(String),

    /// An execution anchor names a step that does not exist.
    #[error("unknown step '{0}'")]
    UnknownStep(String),
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a workflow's step collection.
///
/// Checks, in order: non-empty, unique step IDs, kind/config agreement,
/// successor references resolve, and the successor edges form a DAG
/// (topological sort over the whole graph, trigger edges included).
pub fn validate_steps(steps: &[StepDefinition]) -> Result<(), GraphError> {
    if steps.is_empty() {
        return Err(GraphError::EmptyWorkflow);
    }

    let mut ids = HashSet::new();
    for step in steps {
        if !ids.insert(step.id.as_str()) {
            return Err(GraphError::DuplicateStepId(step.id.clone()));
        }
        if step.kind != step.config.kind() {
            return Err(GraphError::KindMismatch {
                step: step.id.clone(),
                kind: step.kind,
            });
        }
    }

    let id_to_idx: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut graph = DiGraph::<&str, ()>::new();
    let node_indices: Vec<_> = steps.iter().map(|s| graph.add_node(s.id.as_str())).collect();

    for step in steps {
        let from_idx = id_to_idx[step.id.as_str()];
        for successor in &step.next_steps {
            let to_idx = id_to_idx.get(successor.as_str()).ok_or_else(|| {
                GraphError::UnknownSuccessor {
                    step: step.id.clone(),
                    successor: successor.clone(),
                }
            })?;
            graph.add_edge(node_indices[from_idx], node_indices[*to_idx], ());
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        let node_id = graph[cycle.node_id()];
        GraphError::CycleDetected(node_id.to_string())
    })?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reachability
// ---------------------------------------------------------------------------

/// All step IDs reachable from `anchor` (inclusive) over `next_steps` edges.
///
/// Step B is reachable from A if B is in A's direct successor set, or if B
/// is reachable from any direct successor of A.
pub fn reachable_from(anchor: &str, steps: &[StepDefinition]) -> HashSet<String> {
    let step_map: HashMap<&str, &StepDefinition> =
        steps.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut visited = HashSet::new();
    let mut stack = vec![anchor];

    while let Some(current) = stack.pop() {
        if !visited.insert(current.to_string()) {
            continue;
        }
        if let Some(step) = step_map.get(current) {
            for successor in &step.next_steps {
                if !visited.contains(successor.as_str()) {
                    stack.push(successor.as_str());
                }
            }
        }
    }

    visited
}

// ---------------------------------------------------------------------------
// Execution ordering
// ---------------------------------------------------------------------------

/// Compute the steps to execute, in declaration order.
///
/// Without an anchor, every runnable step executes in declaration order.
/// With an anchor, only steps reachable from the anchor (inclusive)
/// execute. Trigger-kind steps are entry markers and are never part of
/// the plan either way.
pub fn execution_order<'a>(
    steps: &'a [StepDefinition],
    anchor: Option<&str>,
) -> Result<Vec<&'a StepDefinition>, GraphError> {
    let plan: Vec<&StepDefinition> = match anchor {
        None => steps
            .iter()
            .filter(|s| s.kind != StepKind::Trigger)
            .collect(),
        Some(anchor_id) => {
            if !steps.iter().any(|s| s.id == anchor_id) {
                return Err(GraphError::UnknownStep(anchor_id.to_string()));
            }
            let reachable = reachable_from(anchor_id, steps);
            steps
                .iter()
                .filter(|s| s.kind != StepKind::Trigger && reachable.contains(&s.id))
                .collect()
        }
    };

    Ok(plan)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

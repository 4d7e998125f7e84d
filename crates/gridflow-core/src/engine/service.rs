//! Workflow lifecycle manager: the engine's public surface.
//!
//! CRUD over workflow definitions plus the execute state machine,
//! schedule/unschedule delegation, and event emission. All status
//! transitions for running go through the store's atomic
//! `transition_status`, so two concurrent `execute` calls on one workflow
//! cannot both pass the active-precondition.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use gridflow_types::error::StoreError;
use gridflow_types::event::EngineEvent;
use gridflow_types::workflow::{
    NewWorkflow, RunReport, Workflow, WorkflowStatus, WorkflowUpdate,
};

use crate::event::EventBus;
use crate::store::WorkflowStore;

use super::context::RunContext;
use super::graph::{self, GraphError};
use super::scheduler::{self, CronCallback, CronScheduler, SchedulerError};
use super::step::StepRunner;
use super::walker::{self, WalkError};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors surfaced by the lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown workflow id.
    #[error("workflow {0} not found")]
    NotFound(Uuid),

    /// `execute` was called while the workflow was not `active`.
    #[error("workflow {id} is not active (status: {status})")]
    NotActive { id: Uuid, status: WorkflowStatus },

    /// The step graph failed validation.
    #[error("invalid workflow: {0}")]
    Validation(#[from] GraphError),

    /// A run aborted on a failing step.
    #[error(transparent)]
    Run(#[from] WalkError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// WorkflowService
// ---------------------------------------------------------------------------

/// The workflow store and lifecycle manager.
///
/// Owns the store, the step runner, the cron scheduler, and the event bus.
/// No other component mutates workflows directly.
pub struct WorkflowService<S> {
    store: Arc<S>,
    scheduler: Arc<CronScheduler>,
    runner: Arc<StepRunner>,
    bus: EventBus,
}

impl<S: WorkflowStore + 'static> WorkflowService<S> {
    pub fn new(
        store: Arc<S>,
        scheduler: Arc<CronScheduler>,
        runner: Arc<StepRunner>,
        bus: EventBus,
    ) -> Self {
        Self {
            store,
            scheduler,
            runner,
            bus,
        }
    }

    /// The engine event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Create a workflow. Validates the step graph, assigns a UUIDv7, zeroes
    /// the counters, and starts in `draft`. Never auto-enables execution.
    pub async fn create(&self, new: NewWorkflow) -> Result<Workflow, EngineError> {
        graph::validate_steps(&new.steps)?;

        let now = Utc::now();
        let workflow = Workflow {
            id: Uuid::now_v7(),
            name: new.name,
            description: new.description,
            trigger: new.trigger,
            steps: new.steps,
            enabled: new.enabled,
            status: WorkflowStatus::Draft,
            run_count: 0,
            error_count: 0,
            created_at: now,
            updated_at: now,
            last_run: None,
            next_run: None,
        };
        self.store.insert(&workflow).await?;

        tracing::info!(workflow_id = %workflow.id, name = %workflow.name, "workflow created");
        Ok(workflow)
    }

    pub async fn get(&self, id: Uuid) -> Result<Workflow, EngineError> {
        self.store
            .get(&id)
            .await?
            .ok_or(EngineError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<Workflow>, EngineError> {
        Ok(self.store.list().await?)
    }

    /// Shallow-merge the supplied fields into the workflow. A new step
    /// graph is re-validated before it is accepted.
    pub async fn update(&self, id: Uuid, update: WorkflowUpdate) -> Result<Workflow, EngineError> {
        let mut workflow = self.get(id).await?;

        if let Some(steps) = &update.steps {
            graph::validate_steps(steps)?;
        }

        if let Some(name) = update.name {
            workflow.name = name;
        }
        if let Some(description) = update.description {
            workflow.description = Some(description);
        }
        if let Some(trigger) = update.trigger {
            workflow.trigger = trigger;
        }
        if let Some(steps) = update.steps {
            workflow.steps = steps;
        }
        if let Some(enabled) = update.enabled {
            workflow.enabled = enabled;
        }
        if let Some(status) = update.status {
            workflow.status = status;
        }
        workflow.updated_at = Utc::now();

        self.store.update(&workflow).await?;
        Ok(workflow)
    }

    /// Delete a workflow, unscheduling it first. Returns whether it existed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, EngineError> {
        self.scheduler.unschedule_workflow(id).await?;
        let existed = self.store.delete(&id).await?;
        if existed {
            tracing::info!(workflow_id = %id, "workflow deleted");
        }
        Ok(existed)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Run a workflow.
    ///
    /// State machine: `active -> running -> active` on success,
    /// `active -> running -> error` on failure. The entry transition is a
    /// compare-and-set, so at most one run per workflow is in flight.
    pub async fn execute(&self, id: Uuid, payload: Value) -> Result<RunReport, EngineError> {
        let workflow = self.get(id).await?;

        let entered = self
            .store
            .transition_status(&id, WorkflowStatus::Active, WorkflowStatus::Running)
            .await?;
        if !entered {
            // Re-read for an accurate status in the error.
            let status = self
                .store
                .get(&id)
                .await?
                .map(|w| w.status)
                .ok_or(EngineError::NotFound(id))?;
            return Err(EngineError::NotActive { id, status });
        }

        let started_at = Utc::now();
        let timer = std::time::Instant::now();

        // Run bookkeeping happens on entry, success or not. The targeted
        // store mutation leaves fields a concurrent `update` may be
        // replacing untouched.
        self.store.record_run_started(&id, started_at).await?;

        tracing::info!(workflow_id = %id, name = %workflow.name, "workflow run started");

        let mut ctx = RunContext::new(payload);
        match walker::walk(&self.runner, &workflow.steps, None, &mut ctx).await {
            Ok(steps_executed) => {
                let results = ctx.into_results();
                self.store
                    .transition_status(&id, WorkflowStatus::Running, WorkflowStatus::Active)
                    .await?;

                let result_value =
                    serde_json::to_value(&results).unwrap_or(Value::Null);
                self.bus.publish(EngineEvent::WorkflowCompleted {
                    workflow_id: id,
                    name: workflow.name.clone(),
                    result: result_value,
                    timestamp: Utc::now(),
                });

                let duration_ms = timer.elapsed().as_millis() as u64;
                tracing::info!(
                    workflow_id = %id,
                    steps_executed,
                    duration_ms,
                    "workflow run completed"
                );

                Ok(RunReport {
                    workflow_id: id,
                    results,
                    started_at,
                    duration_ms,
                    steps_executed,
                })
            }
            Err(err) => {
                let message = err.to_string();
                self.store.record_run_failed(&id).await?;

                self.bus.publish(EngineEvent::WorkflowFailed {
                    workflow_id: id,
                    name: workflow.name.clone(),
                    error: message.clone(),
                    timestamp: Utc::now(),
                });

                tracing::warn!(workflow_id = %id, error = %message, "workflow run failed");
                Err(err.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Bind the workflow to a cron expression.
    ///
    /// Re-scheduling replaces any existing binding. The workflow becomes
    /// `active` (scheduled fires require it) and `next_run` is recorded.
    /// Errors from scheduled runs are swallowed and logged so one bad run
    /// cannot kill future fires.
    pub async fn schedule(self: &Arc<Self>, id: Uuid, expr: &str) -> Result<Workflow, EngineError> {
        let mut workflow = self.get(id).await?;

        let service = Arc::clone(self);
        let callback: CronCallback = Arc::new(move |workflow_id, fired_at| {
            let service = Arc::clone(&service);
            Box::pin(async move {
                let payload = serde_json::json!({
                    "trigger": "schedule",
                    "fired_at": fired_at.to_rfc3339(),
                });
                if let Err(err) = service.execute(workflow_id, payload).await {
                    tracing::error!(
                        workflow_id = %workflow_id,
                        error = %err,
                        "scheduled run failed"
                    );
                }
            })
        });

        let cron_expr = self
            .scheduler
            .schedule_workflow(id, expr, callback)
            .await?;

        if workflow.status != WorkflowStatus::Running {
            workflow.status = WorkflowStatus::Active;
        }
        workflow.next_run = scheduler::next_occurrence(&cron_expr);
        workflow.updated_at = Utc::now();
        self.store.update(&workflow).await?;

        self.bus.publish(EngineEvent::WorkflowScheduled {
            workflow_id: id,
            cron_expr,
            next_run: workflow.next_run,
        });

        Ok(workflow)
    }

    /// Remove the workflow's cron binding and pause it.
    ///
    /// Idempotent: a second call is a no-op and the status stays `paused`.
    /// Does not interrupt a run already in flight.
    pub async fn unschedule(&self, id: Uuid) -> Result<Workflow, EngineError> {
        let mut workflow = self.get(id).await?;

        let removed = self.scheduler.unschedule_workflow(id).await?;

        if workflow.status != WorkflowStatus::Running {
            workflow.status = WorkflowStatus::Paused;
        }
        workflow.next_run = None;
        workflow.updated_at = Utc::now();
        self.store.update(&workflow).await?;

        if removed {
            self.bus
                .publish(EngineEvent::WorkflowUnscheduled { workflow_id: id });
        }

        Ok(workflow)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryWorkflowStore;
    use gridflow_types::workflow::{
        StepConfig, StepDefinition, StepKind, TriggerDescriptor, TriggerKind,
    };
    use serde_json::json;

    fn service() -> Arc<WorkflowService<MemoryWorkflowStore>> {
        Arc::new(WorkflowService::new(
            Arc::new(MemoryWorkflowStore::new()),
            Arc::new(CronScheduler::new()),
            Arc::new(StepRunner::new()),
            EventBus::new(64),
        ))
    }

    fn action_step(id: &str, action: &str, next: Vec<&str>) -> StepDefinition {
        StepDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            kind: StepKind::Action,
            config: StepConfig::Action {
                action: action.to_string(),
                params: json!({}),
            },
            next_steps: next.into_iter().map(String::from).collect(),
        }
    }

    fn new_workflow(steps: Vec<StepDefinition>) -> NewWorkflow {
        NewWorkflow {
            name: "pipeline".to_string(),
            description: None,
            trigger: TriggerDescriptor {
                kind: TriggerKind::Event,
                config: Value::Null,
            },
            steps,
            enabled: true,
        }
    }

    async fn activate(svc: &Arc<WorkflowService<MemoryWorkflowStore>>, id: Uuid) {
        svc.update(
            id,
            WorkflowUpdate {
                status: Some(WorkflowStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    // -------------------------------------------------------------------
    // CRUD
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn create_starts_in_draft_with_zero_counters() {
        let svc = service();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();

        assert_eq!(wf.status, WorkflowStatus::Draft);
        assert_eq!(wf.run_count, 0);
        assert_eq!(wf.error_count, 0);
        assert!(wf.last_run.is_none());
    }

    #[tokio::test]
    async fn create_rejects_cyclic_graph() {
        let svc = service();
        let result = svc
            .create(new_workflow(vec![
                action_step("a", "run_analytics", vec!["b"]),
                action_step("b", "run_analytics", vec!["a"]),
            ]))
            .await;

        assert!(matches!(
            result,
            Err(EngineError::Validation(GraphError::CycleDetected(_)))
        ));
    }

    #[tokio::test]
    async fn update_rejects_cyclic_steps() {
        let svc = service();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();

        let result = svc
            .update(
                wf.id,
                WorkflowUpdate {
                    steps: Some(vec![action_step("x", "run_analytics", vec!["x"])]),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(EngineError::Validation(_))));
        // original steps untouched
        assert_eq!(svc.get(wf.id).await.unwrap().steps[0].id, "a");
    }

    #[tokio::test]
    async fn delete_returns_existence() {
        let svc = service();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();

        assert!(svc.delete(wf.id).await.unwrap());
        assert!(!svc.delete(wf.id).await.unwrap());
        assert!(matches!(
            svc.get(wf.id).await,
            Err(EngineError::NotFound(_))
        ));
    }

    // -------------------------------------------------------------------
    // Execute state machine
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn execute_requires_active_status() {
        let svc = service();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();

        let result = svc.execute(wf.id, Value::Null).await;
        assert!(matches!(
            result,
            Err(EngineError::NotActive {
                status: WorkflowStatus::Draft,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn successful_run_updates_counters_and_emits_event() {
        let svc = service();
        let wf = svc
            .create(new_workflow(vec![
                action_step("collect", "run_analytics", vec!["analyze"]),
                action_step("analyze", "run_analytics", vec!["notify"]),
                action_step("notify", "send_notification", vec![]),
            ]))
            .await
            .unwrap();
        activate(&svc, wf.id).await;

        let mut rx = svc.bus().subscribe();
        let report = svc.execute(wf.id, json!({"source": "test"})).await.unwrap();

        assert_eq!(report.steps_executed, 3);
        assert_eq!(report.results.len(), 3);
        assert!(report.results.contains_key("notify"));

        let after = svc.get(wf.id).await.unwrap();
        assert_eq!(after.run_count, 1);
        assert_eq!(after.error_count, 0);
        assert_eq!(after.status, WorkflowStatus::Active);
        assert!(after.last_run.is_some());

        match rx.recv().await.unwrap() {
            EngineEvent::WorkflowCompleted { workflow_id, .. } => {
                assert_eq!(workflow_id, wf.id);
            }
            other => panic!("expected WorkflowCompleted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_step_sets_error_status_and_emits_event() {
        let svc = service();
        let wf = svc
            .create(new_workflow(vec![
                action_step("collect", "run_analytics", vec!["boom"]),
                action_step("boom", "no_such_action", vec![]),
            ]))
            .await
            .unwrap();
        activate(&svc, wf.id).await;

        let mut rx = svc.bus().subscribe();
        let result = svc.execute(wf.id, Value::Null).await;
        assert!(matches!(result, Err(EngineError::Run(_))));

        let after = svc.get(wf.id).await.unwrap();
        assert_eq!(after.run_count, 1);
        assert_eq!(after.error_count, 1);
        assert_eq!(after.status, WorkflowStatus::Error);

        match rx.recv().await.unwrap() {
            EngineEvent::WorkflowFailed {
                workflow_id, error, ..
            } => {
                assert_eq!(workflow_id, wf.id);
                assert!(error.contains("boom"));
            }
            other => panic!("expected WorkflowFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_executes_admit_exactly_one() {
        let svc = service();
        let wf = svc
            .create(new_workflow(vec![StepDefinition {
                id: "wait".to_string(),
                name: "wait".to_string(),
                description: None,
                kind: StepKind::Delay,
                config: StepConfig::Delay {
                    duration: 100,
                    unit: "raw".to_string(),
                },
                next_steps: vec![],
            }]))
            .await
            .unwrap();
        activate(&svc, wf.id).await;

        let a = {
            let svc = Arc::clone(&svc);
            let id = wf.id;
            tokio::spawn(async move { svc.execute(id, Value::Null).await })
        };
        let b = {
            let svc = Arc::clone(&svc);
            let id = wf.id;
            tokio::spawn(async move { svc.execute(id, Value::Null).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(EngineError::NotActive { .. })))
            .count();

        assert_eq!(ok, 1, "exactly one run admitted");
        assert_eq!(rejected, 1, "the other sees NotActive");
        assert_eq!(svc.get(wf.id).await.unwrap().run_count, 1);
    }

    // -------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn schedule_sets_active_and_next_run() {
        let svc = service();
        svc.scheduler.start().await.unwrap();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();

        let scheduled = svc.schedule(wf.id, "*/5 * * * *").await.unwrap();
        assert_eq!(scheduled.status, WorkflowStatus::Active);
        assert!(scheduled.next_run.is_some());

        svc.scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unschedule_twice_is_idempotent() {
        let svc = service();
        svc.scheduler.start().await.unwrap();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();
        svc.schedule(wf.id, "*/5 * * * *").await.unwrap();

        let first = svc.unschedule(wf.id).await.unwrap();
        assert_eq!(first.status, WorkflowStatus::Paused);
        assert!(first.next_run.is_none());

        // second call is a no-op, status stays paused
        let second = svc.unschedule(wf.id).await.unwrap();
        assert_eq!(second.status, WorkflowStatus::Paused);

        svc.scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn delete_unschedules_first() {
        let svc = service();
        svc.scheduler.start().await.unwrap();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();
        svc.schedule(wf.id, "*/5 * * * *").await.unwrap();
        assert_eq!(svc.scheduler.binding_count().await, 1);

        assert!(svc.delete(wf.id).await.unwrap());
        assert_eq!(svc.scheduler.binding_count().await, 0);

        svc.scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected() {
        let svc = service();
        svc.scheduler.start().await.unwrap();
        let wf = svc
            .create(new_workflow(vec![action_step("a", "run_analytics", vec![])]))
            .await
            .unwrap();

        let result = svc.schedule(wf.id, "whenever").await;
        assert!(matches!(
            result,
            Err(EngineError::Scheduler(SchedulerError::InvalidSchedule(_)))
        ));

        svc.scheduler.stop().await.unwrap();
    }
}

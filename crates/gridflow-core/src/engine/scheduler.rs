//! Cron scheduler wrapping `tokio-cron-scheduler`.
//!
//! A pure timer-to-callback binding table keyed by workflow id. The
//! scheduler owns no business data: the lifecycle manager supplies a
//! callback that performs the actual `execute`, and status/next-run
//! bookkeeping stays in the workflow store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during scheduling operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Failed to create or manipulate a cron job.
    #[error("scheduler error: {0}")]
    JobError(String),

    /// Invalid cron expression.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// The scheduler has not been started.
    #[error("scheduler not started")]
    NotStarted,
}

// ---------------------------------------------------------------------------
// Cron expression handling
// ---------------------------------------------------------------------------

/// Normalize a cron expression to the 6-field (with seconds) form.
///
/// Standard 5-field expressions get a `0` seconds field prepended;
/// 6-field expressions pass through. Anything else is rejected.
pub fn normalize_cron(expr: &str) -> Result<String, SchedulerError> {
    let trimmed = expr.trim();
    let fields = trimmed.split_whitespace().count();
    match fields {
        5 => Ok(format!("0 {trimmed}")),
        6 => Ok(trimmed.to_string()),
        _ => Err(SchedulerError::InvalidSchedule(format!(
            "expected 5 or 6 cron fields, got {fields} in '{trimmed}'"
        ))),
    }
}

/// The next fire time for a cron expression, or `None` if the expression
/// does not parse or never fires again.
pub fn next_occurrence(expr: &str) -> Option<DateTime<Utc>> {
    let normalized = normalize_cron(expr).ok()?;
    let cron = normalized.parse::<croner::Cron>().ok()?;
    cron.iter_after(Utc::now()).next()
}

// ---------------------------------------------------------------------------
// CronScheduler
// ---------------------------------------------------------------------------

/// Callback type invoked when a cron binding fires.
pub type CronCallback =
    Arc<dyn Fn(Uuid, DateTime<Utc>) -> futures_util::future::BoxFuture<'static, ()> + Send + Sync>;

/// Tracks one registered cron binding.
struct CronBinding {
    /// The job UUID assigned by tokio-cron-scheduler.
    job_id: Uuid,
    /// The normalized cron expression.
    cron_expr: String,
}

/// Cron scheduler that wraps `tokio_cron_scheduler::JobScheduler`.
///
/// Bindings are keyed by workflow id. Re-scheduling an already bound
/// workflow replaces the old binding; unscheduling an unknown workflow is
/// a no-op. Fires invoke the supplied callback, which is responsible for
/// swallowing execution errors so one bad run cannot kill future fires.
pub struct CronScheduler {
    inner: Arc<RwLock<Option<JobScheduler>>>,
    bindings: Arc<RwLock<HashMap<Uuid, CronBinding>>>,
}

impl CronScheduler {
    /// Create a new cron scheduler (not yet started).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            bindings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start the scheduler. Must be called before binding workflows.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        let mut inner = self.inner.write().await;
        *inner = Some(scheduler);

        tracing::info!("cron scheduler started");
        Ok(())
    }

    /// Stop the scheduler and drop all bindings.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut inner = self.inner.write().await;
        if let Some(mut scheduler) = inner.take() {
            scheduler
                .shutdown()
                .await
                .map_err(|e| SchedulerError::JobError(e.to_string()))?;
            tracing::info!("cron scheduler stopped");
        }
        self.bindings.write().await.clear();
        Ok(())
    }

    /// Bind a workflow to a cron expression.
    ///
    /// Any existing binding for this workflow is removed first, so
    /// re-scheduling is idempotent. Returns the normalized expression.
    pub async fn schedule_workflow(
        &self,
        workflow_id: Uuid,
        expr: &str,
        callback: CronCallback,
    ) -> Result<String, SchedulerError> {
        let cron_expr = normalize_cron(expr)?;

        // Replace any existing binding before registering the new job.
        self.unschedule_workflow(workflow_id).await?;

        let inner = self.inner.read().await;
        let scheduler = inner.as_ref().ok_or(SchedulerError::NotStarted)?;

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let cb = callback.clone();
            Box::pin(async move {
                let now = Utc::now();
                tracing::debug!(%workflow_id, %now, "cron binding fired");
                cb(workflow_id, now).await;
            })
        })
        .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;

        let job_id = job.guid();
        scheduler
            .add(job)
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        let mut bindings = self.bindings.write().await;
        bindings.insert(
            workflow_id,
            CronBinding {
                job_id,
                cron_expr: cron_expr.clone(),
            },
        );

        tracing::info!(%workflow_id, %cron_expr, "workflow scheduled");
        Ok(cron_expr)
    }

    /// Remove a workflow's cron binding.
    ///
    /// Idempotent: returns `true` when a binding existed, `false` when
    /// there was nothing to remove.
    pub async fn unschedule_workflow(&self, workflow_id: Uuid) -> Result<bool, SchedulerError> {
        let entry = {
            let mut bindings = self.bindings.write().await;
            bindings.remove(&workflow_id)
        };
        let Some(entry) = entry else {
            return Ok(false);
        };

        let inner = self.inner.read().await;
        if let Some(scheduler) = inner.as_ref() {
            scheduler
                .remove(&entry.job_id)
                .await
                .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        }

        tracing::info!(%workflow_id, "workflow unscheduled");
        Ok(true)
    }

    /// The cron expression currently bound to a workflow, if any.
    pub async fn bound_expression(&self, workflow_id: Uuid) -> Option<String> {
        self.bindings
            .read()
            .await
            .get(&workflow_id)
            .map(|b| b.cron_expr.clone())
    }

    /// Number of bound workflows.
    pub async fn binding_count(&self) -> usize {
        self.bindings.read().await.len()
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

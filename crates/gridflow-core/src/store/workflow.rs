//! Workflow store trait definition.
//!
//! The storage interface for workflow definitions and their lifecycle
//! bookkeeping. The reference implementation is in-memory (`MemoryWorkflowStore`);
//! persistent backings implement the same trait.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use chrono::{DateTime, Utc};
use gridflow_types::error::StoreError;
use gridflow_types::workflow::{Workflow, WorkflowStatus};
use uuid::Uuid;

/// Store trait for workflow persistence.
///
/// All lifecycle mutations go through the lifecycle manager; the store only
/// provides the primitives. `transition_status` is the one semantically
/// loaded operation: it must be an atomic compare-and-set so that two
/// concurrent `execute` calls on the same workflow cannot both observe
/// `active` and start running.
pub trait WorkflowStore: Send + Sync {
    /// Insert a new workflow. Fails with `Conflict` if the ID exists.
    fn insert(
        &self,
        workflow: &Workflow,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Get a workflow by ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Workflow>, StoreError>> + Send;

    /// List all workflows.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Workflow>, StoreError>> + Send;

    /// Replace a stored workflow. Fails with `NotFound` if the ID is unknown.
    fn update(
        &self,
        workflow: &Workflow,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a workflow by ID. Returns `true` if it existed.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Atomically set status to `to` if and only if the current status is
    /// `from`. Returns `true` on success; `false` when the workflow is
    /// missing or its status differs from `from`.
    fn transition_status(
        &self,
        id: &Uuid,
        from: WorkflowStatus,
        to: WorkflowStatus,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Bump `run_count` and set `last_run` in place. A targeted mutation
    /// rather than a full replace, so it cannot clobber a concurrent
    /// `update` of other fields.
    fn record_run_started(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Bump `error_count` and set status to `error` in place.
    fn record_run_failed(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

//! Shared error types used by store trait definitions in gridflow-core.

use thiserror::Error;

/// Errors from store operations.
///
/// The reference backing is in-memory, so most of these only occur with an
/// alternative store implementation behind the trait.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

//! Store traits and the reference in-memory implementations.

pub mod memory;
pub mod webhook;
pub mod workflow;

pub use memory::{MemoryWebhookStore, MemoryWorkflowStore};
pub use webhook::WebhookStore;
pub use workflow::WorkflowStore;

//! The workflow engine: graph validation, step execution, the cron
//! scheduler, and the lifecycle manager tying them together.

pub mod context;
pub mod graph;
pub mod scheduler;
pub mod service;
pub mod step;
pub mod walker;

pub use context::RunContext;
pub use scheduler::CronScheduler;
pub use service::{EngineError, WorkflowService};
pub use step::StepRunner;

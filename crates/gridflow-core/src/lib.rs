//! Workflow engine and store traits for GridFlow.
//!
//! This crate defines the "ports" (store traits) plus the reference
//! in-memory implementations, the engine itself (graph validation, step
//! execution, the lifecycle manager), the cron scheduler, and the
//! broadcast event bus. It depends only on `gridflow-types` -- never on
//! `gridflow-infra` or any HTTP/IO crate.

pub mod engine;
pub mod event;
pub mod store;

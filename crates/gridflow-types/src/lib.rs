//! Shared domain types for GridFlow.
//!
//! This crate contains the core domain types used across the GridFlow
//! platform: workflows and their step graphs, webhook registrations, the
//! engine event enum, and configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod webhook;
pub mod workflow;

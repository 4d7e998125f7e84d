//! Outbound integrations for GridFlow: webhook payload signing and HTTP
//! dispatch, plus the TOML configuration loader.

pub mod config;
pub mod webhook;

//! Outbound webhook delivery: payload signing and HTTP dispatch.

pub mod dispatcher;
pub mod signature;

pub use dispatcher::{DispatchError, WebhookDispatcher};
pub use signature::{generate_secret, sign_payload, verify_signature};

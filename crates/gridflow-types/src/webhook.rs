//! Webhook domain types: registrations, fired events, delivery reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// An external HTTP endpoint subscribed to one or more event types.
///
/// The signing `secret` is generated once at registration (when the caller
/// does not supply one) and is never rotated implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRegistration {
    /// UUIDv7 assigned at registration.
    pub id: Uuid,
    pub name: String,
    /// Destination URL (http or https).
    pub url: String,
    /// Event types this endpoint receives. Non-empty.
    pub event_types: Vec<String>,
    /// Shared HMAC signing secret.
    pub secret: String,
    /// Toggleable kill switch; a disabled registration never receives
    /// a delivery attempt.
    pub enabled: bool,
    /// Lifecycle status; only `active` registrations receive deliveries.
    pub status: WebhookStatus,
    pub success_count: u64,
    pub failure_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a webhook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Active,
    Suspended,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An immutable record of a fired event, retained in a bounded
/// recent-history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// Payload for registering a webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWebhook {
    pub name: String,
    pub url: String,
    /// Event types to subscribe to ("events" on the wire). Non-empty.
    #[serde(alias = "events")]
    pub event_types: Vec<String>,
    /// Optional caller-supplied secret; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Partial update for a webhook registration. The secret is deliberately
/// not updatable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WebhookStatus>,
}

/// Outcome of a single test delivery attempt.
///
/// Test deliveries never touch the registration's success/failure counters;
/// the embedded `success` flag is the only record of the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub webhook_id: Uuid,
    pub event_type: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_accepts_events_alias() {
        let req: RegisterWebhook = serde_json::from_value(json!({
            "name": "settlement feed",
            "url": "https://example.com/hooks/settle",
            "events": ["energy_data_created"]
        }))
        .unwrap();

        assert_eq!(req.event_types, vec!["energy_data_created"]);
        assert!(req.enabled, "enabled defaults to true");
        assert!(req.secret.is_none());
    }

    #[test]
    fn webhook_status_snake_case() {
        assert_eq!(
            serde_json::to_value(WebhookStatus::Active).unwrap(),
            json!("active")
        );
    }
}

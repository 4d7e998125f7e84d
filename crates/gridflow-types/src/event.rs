//! Event types for the GridFlow engine event bus.
//!
//! `EngineEvent` is the unified event type broadcast by the lifecycle
//! manager and scheduler. All variants are Clone + Send + Sync for use with
//! tokio broadcast channels. The webhook dispatcher listens to this bus and
//! fans completion/failure events out to external subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Events emitted during workflow lifecycle and webhook dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A workflow run finished successfully.
    WorkflowCompleted {
        workflow_id: Uuid,
        name: String,
        /// Step ID -> result value for the run.
        result: Value,
        timestamp: DateTime<Utc>,
    },

    /// A workflow run raised an error.
    WorkflowFailed {
        workflow_id: Uuid,
        name: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A cron schedule was bound to a workflow.
    WorkflowScheduled {
        workflow_id: Uuid,
        cron_expr: String,
        next_run: Option<DateTime<Utc>>,
    },

    /// A workflow's cron binding was removed.
    WorkflowUnscheduled { workflow_id: Uuid },

    /// A webhook delivery attempt succeeded (2xx).
    WebhookDelivered {
        webhook_id: Uuid,
        event_type: String,
        status_code: u16,
    },

    /// A webhook delivery attempt failed (non-2xx, timeout, or transport).
    WebhookDeliveryFailed {
        webhook_id: Uuid,
        event_type: String,
        error: String,
    },
}

impl EngineEvent {
    /// The event-type string used for webhook subscription matching.
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::WorkflowCompleted { .. } => "workflow_completed",
            EngineEvent::WorkflowFailed { .. } => "workflow_failed",
            EngineEvent::WorkflowScheduled { .. } => "workflow_scheduled",
            EngineEvent::WorkflowUnscheduled { .. } => "workflow_unscheduled",
            EngineEvent::WebhookDelivered { .. } => "webhook_delivered",
            EngineEvent::WebhookDeliveryFailed { .. } => "webhook_delivery_failed",
        }
    }
}

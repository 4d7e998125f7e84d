//! Workflow domain types for GridFlow.
//!
//! Defines the canonical representation of an automation workflow: the
//! trigger descriptor, the ordered step graph, lifecycle status, and run
//! counters. The HTTP API and the engine both speak these types; there is
//! no separate wire model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A named automation composed of steps and a trigger descriptor.
///
/// `steps` declaration order is significant: a full run executes steps in
/// the order they were declared, not in graph-traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// UUIDv7 assigned at creation.
    pub id: Uuid,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// How this workflow is launched.
    pub trigger: TriggerDescriptor,
    /// Ordered list of step definitions forming the workflow graph.
    pub steps: Vec<StepDefinition>,
    /// Whether the workflow may run at all. Independent of `status`.
    pub enabled: bool,
    /// Current lifecycle status.
    pub status: WorkflowStatus,
    /// Number of runs started (successful or not).
    pub run_count: u64,
    /// Number of runs that ended in failure.
    pub error_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the last run started, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    /// Next scheduled fire time, if a schedule is bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

/// Lifecycle status of a workflow.
///
/// `Running` is transient: it only holds for the duration of one execution
/// and reverts to `Active` (success) or `Error` (failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
    Error,
    Running,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Active => "active",
            WorkflowStatus::Paused => "paused",
            WorkflowStatus::Error => "error",
            WorkflowStatus::Running => "running",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Trigger descriptor
// ---------------------------------------------------------------------------

/// How a workflow is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Cron-style schedule (bound via the scheduler API).
    Schedule,
    /// Launched by an incoming webhook.
    Webhook,
    /// Launched by a domain event.
    Event,
}

/// Trigger kind plus its kind-specific configuration.
///
/// The config payload is opaque to the engine (cron expression, webhook
/// path, event type filter); the scheduler and dispatch layers interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
}

// ---------------------------------------------------------------------------
// Step definition
// ---------------------------------------------------------------------------

/// A single node in a workflow's execution graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// User-defined step ID (e.g. "collect-prices"). Unique within a workflow.
    pub id: String,
    /// Human-readable step name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The kind of step. Must agree with the `config` variant.
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Kind-specific configuration payload.
    pub config: StepConfig,
    /// IDs of the steps that follow this one (graph edges).
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// The kind of step in a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Conceptual entry point. Never executed as a runtime node.
    Trigger,
    /// Invoke a named action handler.
    Action,
    /// Evaluate a comparison and record the boolean result.
    Condition,
    /// Suspend the run for a duration.
    Delay,
}

/// Step-specific configuration payload, internally tagged by `type`:
///
/// ```json
/// { "type": "action", "action": "send_notification", "params": { ... } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    /// Entry marker; carries no runtime configuration.
    Trigger {},
    /// Invoke an action handler by name.
    Action {
        action: String,
        #[serde(default)]
        params: Value,
    },
    /// Compare `value` against `compare_to` using `operator`.
    ///
    /// `operator` is an open string set (`equals`, `greater_than`,
    /// `less_than`, `contains`); unrecognized operators evaluate to false.
    Condition {
        value: Value,
        operator: String,
        compare_to: Value,
    },
    /// Suspend for `duration` in the given unit (`seconds`, `minutes`,
    /// `hours`; anything else is treated as raw milliseconds).
    Delay { duration: u64, unit: String },
}

impl StepConfig {
    /// The step kind this config variant belongs to.
    pub fn kind(&self) -> StepKind {
        match self {
            StepConfig::Trigger {} => StepKind::Trigger,
            StepConfig::Action { .. } => StepKind::Action,
            StepConfig::Condition { .. } => StepKind::Condition,
            StepConfig::Delay { .. } => StepKind::Delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Payload for creating a workflow. Identity, counters, and status are
/// assigned by the engine (status always starts as `draft`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger: TriggerDescriptor,
    pub steps: Vec<StepDefinition>,
    #[serde(default)]
    pub enabled: bool,
}

/// Partial update for a workflow. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkflowStatus>,
}

/// Summary of one completed workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub workflow_id: Uuid,
    /// Step ID -> result value, keyed by exactly the executed steps.
    pub results: std::collections::HashMap<String, Value>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps_executed: u32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_config_internally_tagged() {
        let config: StepConfig = serde_json::from_value(json!({
            "type": "action",
            "action": "send_notification",
            "params": { "channel": "trading-desk" }
        }))
        .unwrap();

        match &config {
            StepConfig::Action { action, params } => {
                assert_eq!(action, "send_notification");
                assert_eq!(params["channel"], "trading-desk");
            }
            other => panic!("expected action config, got {other:?}"),
        }
        assert_eq!(config.kind(), StepKind::Action);
    }

    #[test]
    fn step_config_action_params_default_to_null() {
        let config: StepConfig = serde_json::from_value(json!({
            "type": "action",
            "action": "run_analytics"
        }))
        .unwrap();

        assert!(matches!(
            config,
            StepConfig::Action { ref params, .. } if params.is_null()
        ));
    }

    #[test]
    fn step_config_delay_round_trips() {
        let config = StepConfig::Delay {
            duration: 2,
            unit: "minutes".to_string(),
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "delay");
        assert_eq!(value["duration"], 2);

        let back: StepConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind(), StepKind::Delay);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(WorkflowStatus::Running).unwrap(),
            json!("running")
        );
        let status: WorkflowStatus = serde_json::from_value(json!("draft")).unwrap();
        assert_eq!(status, WorkflowStatus::Draft);
    }

    #[test]
    fn workflow_update_defaults_empty() {
        let update: WorkflowUpdate = serde_json::from_value(json!({})).unwrap();
        assert!(update.name.is_none());
        assert!(update.steps.is_none());
        assert!(update.status.is_none());
    }
}

//! Step executor: action dispatch, condition evaluation, delays.
//!
//! `StepRunner` dispatches on the step's tagged config. Actions resolve
//! through a named handler registry; conditions evaluate a coercing
//! comparison; delays suspend the task. The built-in action handlers are
//! stand-ins for the platform integrations (dashboard service,
//! notification service, analytics engine) -- name in, structured result
//! out.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use uuid::Uuid;

use gridflow_types::workflow::{StepConfig, StepDefinition};

use super::context::RunContext;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during step execution.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// No handler registered under the given action name. Hard failure.
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// The handler itself failed.
    #[error("action '{action}' failed: {message}")]
    ActionFailed { action: String, message: String },

    /// A trigger-kind step reached the runner. Trigger steps denote the
    /// graph entry and are excluded from execution plans.
    #[error("step '{0}' is a trigger and cannot be executed")]
    NotExecutable(String),
}

// ---------------------------------------------------------------------------
// Action handlers
// ---------------------------------------------------------------------------

/// A named action implementation.
///
/// Handlers receive the action params and a read view of the run context,
/// and return a structured result. Boxed futures keep the trait
/// dyn-compatible so handlers can live in a registry.
pub trait ActionHandler: Send + Sync {
    fn execute<'a>(
        &'a self,
        params: &'a Value,
        ctx: &'a RunContext,
    ) -> BoxFuture<'a, Result<Value, StepError>>;
}

/// Stand-in for the dashboard service: reports a created dashboard.
struct CreateDashboard;

impl ActionHandler for CreateDashboard {
    fn execute<'a>(
        &'a self,
        params: &'a Value,
        _ctx: &'a RunContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("untitled");
            tracing::info!(dashboard = name, "create_dashboard action");
            Ok(json!({
                "dashboard_id": Uuid::now_v7(),
                "name": name,
                "created": true,
            }))
        })
    }
}

/// Stand-in for the dashboard service: applies an update.
struct UpdateDashboard;

impl ActionHandler for UpdateDashboard {
    fn execute<'a>(
        &'a self,
        params: &'a Value,
        _ctx: &'a RunContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            let dashboard_id = params.get("dashboard_id").cloned().unwrap_or(Value::Null);
            Ok(json!({
                "dashboard_id": dashboard_id,
                "updated": true,
                "changes": params.get("changes").cloned().unwrap_or(json!({})),
            }))
        })
    }
}

/// Stand-in for the notification service.
struct SendNotification;

impl ActionHandler for SendNotification {
    fn execute<'a>(
        &'a self,
        params: &'a Value,
        _ctx: &'a RunContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            let channel = params
                .get("channel")
                .and_then(Value::as_str)
                .unwrap_or("default");
            let message = params
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("");
            tracing::info!(channel, "send_notification action");
            Ok(json!({
                "notified": true,
                "channel": channel,
                "message": message,
            }))
        })
    }
}

/// Stand-in for the analytics engine. Reports how many upstream step
/// results were available as its input set.
struct RunAnalytics;

impl ActionHandler for RunAnalytics {
    fn execute<'a>(
        &'a self,
        params: &'a Value,
        ctx: &'a RunContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            Ok(json!({
                "analysis": params.get("kind").cloned().unwrap_or(json!("summary")),
                "inputs_available": ctx.len(),
                "completed": true,
            }))
        })
    }
}

/// Stand-in for nested webhook registration from inside a workflow.
struct CreateWebhook;

impl ActionHandler for CreateWebhook {
    fn execute<'a>(
        &'a self,
        params: &'a Value,
        _ctx: &'a RunContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            let url = params.get("url").and_then(Value::as_str);
            match url {
                Some(url) => Ok(json!({
                    "webhook_id": Uuid::now_v7(),
                    "url": url,
                    "registered": true,
                })),
                None => Err(StepError::ActionFailed {
                    action: "create_webhook".to_string(),
                    message: "missing 'url' param".to_string(),
                }),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Condition evaluation
// ---------------------------------------------------------------------------

/// Evaluate `(value, operator, compare_to)`.
///
/// Operators: `equals` (equality after coercion to `value`'s native type),
/// `greater_than` / `less_than` (lossy numeric coercion, fails closed to
/// false), `contains` (substring test after string coercion). An unknown
/// operator evaluates to `false` rather than erroring.
pub fn evaluate_condition(value: &Value, operator: &str, compare_to: &Value) -> bool {
    match operator {
        "equals" => coerced_equals(value, compare_to),
        "greater_than" => match (coerce_f64(value), coerce_f64(compare_to)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        "less_than" => match (coerce_f64(value), coerce_f64(compare_to)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        "contains" => coerce_string(value).contains(&coerce_string(compare_to)),
        _ => false,
    }
}

/// Equality after coercing `compare_to` to `value`'s native type.
fn coerced_equals(value: &Value, compare_to: &Value) -> bool {
    match value {
        Value::Number(_) => match (coerce_f64(value), coerce_f64(compare_to)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        Value::Bool(b) => match coerce_bool(compare_to) {
            Some(other) => *b == other,
            None => false,
        },
        _ => coerce_string(value) == coerce_string(compare_to),
    }
}

/// Lossy numeric coercion: numbers pass through, strings parse.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// String coercion: strings pass through, everything else renders as JSON.
fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Delay conversion
// ---------------------------------------------------------------------------

/// Convert a `(duration, unit)` pair to milliseconds.
///
/// `seconds` x1000, `minutes` x60000, `hours` x3600000; an unrecognized
/// unit treats `duration` as raw milliseconds. Durations are caller-supplied
/// and unbounded, so the conversion saturates rather than overflowing.
pub fn delay_to_millis(duration: u64, unit: &str) -> u64 {
    match unit {
        "seconds" => duration.saturating_mul(1_000),
        "minutes" => duration.saturating_mul(60_000),
        "hours" => duration.saturating_mul(3_600_000),
        _ => duration,
    }
}

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

/// Executes individual workflow steps by dispatching on the tagged config.
pub struct StepRunner {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl StepRunner {
    /// Create a runner with the built-in action handlers registered.
    pub fn new() -> Self {
        let mut runner = Self {
            handlers: HashMap::new(),
        };
        runner.register_handler("create_dashboard", Arc::new(CreateDashboard));
        runner.register_handler("update_dashboard", Arc::new(UpdateDashboard));
        runner.register_handler("send_notification", Arc::new(SendNotification));
        runner.register_handler("run_analytics", Arc::new(RunAnalytics));
        runner.register_handler("create_webhook", Arc::new(CreateWebhook));
        runner
    }

    /// Register (or replace) an action handler under `name`.
    pub fn register_handler(&mut self, name: &str, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    /// Run a step and return its result.
    pub async fn run(&self, step: &StepDefinition, ctx: &RunContext) -> Result<Value, StepError> {
        match &step.config {
            StepConfig::Trigger {} => Err(StepError::NotExecutable(step.id.clone())),

            StepConfig::Action { action, params } => {
                let handler = self
                    .handlers
                    .get(action)
                    .ok_or_else(|| StepError::UnknownAction(action.clone()))?;
                handler.execute(params, ctx).await
            }

            StepConfig::Condition {
                value,
                operator,
                compare_to,
            } => {
                let met = evaluate_condition(value, operator, compare_to);
                tracing::debug!(step = %step.id, operator, met, "condition evaluated");
                Ok(json!({
                    "condition_met": met,
                    "operator": operator,
                }))
            }

            StepConfig::Delay { duration, unit } => {
                let ms = delay_to_millis(*duration, unit);
                tracing::debug!(step = %step.id, ms, "delay step sleeping");
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                Ok(json!({
                    "delayed_ms": ms,
                    "unit": unit,
                }))
            }
        }
    }
}

impl Default for StepRunner {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

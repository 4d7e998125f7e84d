//! Ephemeral per-run context.
//!
//! Accumulates step results during one execution and carries the trigger
//! payload. Scoped to a single run and discarded afterwards; never
//! persisted.

use std::collections::HashMap;

use serde_json::Value;

/// Mutable accumulator for one workflow run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Step ID -> that step's result.
    results: HashMap<String, Value>,
    /// Payload supplied by whatever triggered the run (API call, cron fire,
    /// webhook body).
    trigger_payload: Value,
}

impl RunContext {
    /// Create a context carrying the trigger payload.
    pub fn new(trigger_payload: Value) -> Self {
        Self {
            results: HashMap::new(),
            trigger_payload,
        }
    }

    /// Record a step's result.
    pub fn record(&mut self, step_id: &str, result: Value) {
        self.results.insert(step_id.to_string(), result);
    }

    /// A previously recorded step result.
    pub fn result(&self, step_id: &str) -> Option<&Value> {
        self.results.get(step_id)
    }

    /// The trigger payload.
    pub fn trigger_payload(&self) -> &Value {
        &self.trigger_payload
    }

    /// Number of recorded step results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the context and return the result map.
    pub fn into_results(self) -> HashMap<String, Value> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_and_read_back() {
        let mut ctx = RunContext::new(json!({"source": "manual"}));
        ctx.record("collect", json!({"rows": 42}));

        assert_eq!(ctx.result("collect").unwrap()["rows"], 42);
        assert!(ctx.result("missing").is_none());
        assert_eq!(ctx.trigger_payload()["source"], "manual");
    }

    #[test]
    fn into_results_keys_match_recorded_steps() {
        let mut ctx = RunContext::new(Value::Null);
        ctx.record("a", json!(1));
        ctx.record("b", json!(2));

        let results = ctx.into_results();
        let mut keys: Vec<_> = results.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }
}

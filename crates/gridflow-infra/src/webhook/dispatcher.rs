//! Outbound webhook dispatcher.
//!
//! Registration CRUD plus three delivery paths:
//! - `test`: one synthetic signed delivery, counters untouched
//! - `fire`: fan-out to matching registrations, each delivery an
//!   independent spawned task, at most one attempt per subscriber
//! - `spawn_bus_listener`: translates engine events into `fire` calls
//!
//! Delivery is fire-and-forget. Failures land in the failure counter and
//! the log; they never propagate to the caller that fired the event.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use uuid::Uuid;

use gridflow_core::event::EventBus;
use gridflow_core::store::WebhookStore;
use gridflow_types::error::StoreError;
use gridflow_types::event::EngineEvent;
use gridflow_types::webhook::{
    DeliveryReport, RegisterWebhook, WebhookEvent, WebhookRegistration, WebhookStatus,
    WebhookUpdate,
};

use super::signature::{self, SignatureError};

/// Signature over the exact serialized body, hex-encoded.
const SIGNATURE_HEADER: &str = "X-GridFlow-Signature";
/// Which registration this delivery belongs to.
const WEBHOOK_ID_HEADER: &str = "X-GridFlow-Webhook-Id";
const USER_AGENT: &str = "GridFlow-Webhook/1.0";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors surfaced by the dispatcher's registration surface.
///
/// Delivery outcomes are reported through [`DeliveryReport`], not here.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Unknown webhook id.
    #[error("webhook {0} not found")]
    NotFound(Uuid),

    /// URL failed to parse or is not http/https.
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),

    /// A registration must subscribe to at least one event type.
    #[error("event_types must not be empty")]
    EmptyEventTypes,

    #[error(transparent)]
    Signing(#[from] SignatureError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// WebhookDispatcher
// ---------------------------------------------------------------------------

/// Webhook registry and outbound delivery engine.
pub struct WebhookDispatcher<S> {
    store: Arc<S>,
    client: reqwest::Client,
    bus: EventBus,
}

impl<S: WebhookStore + 'static> WebhookDispatcher<S> {
    /// Create a dispatcher with a bounded per-delivery timeout.
    pub fn new(
        store: Arc<S>,
        bus: EventBus,
        delivery_timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(delivery_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { store, client, bus })
    }

    // -----------------------------------------------------------------------
    // Registration CRUD
    // -----------------------------------------------------------------------

    /// Register a new webhook endpoint.
    ///
    /// The URL must parse as http or https and `event_types` must be
    /// non-empty. A signing secret is generated when the caller supplies
    /// none; it is returned here and never rotated implicitly.
    pub async fn register(
        &self,
        request: RegisterWebhook,
    ) -> Result<WebhookRegistration, DispatchError> {
        validate_url(&request.url)?;
        if request.event_types.is_empty() {
            return Err(DispatchError::EmptyEventTypes);
        }

        let registration = WebhookRegistration {
            id: Uuid::now_v7(),
            name: request.name,
            url: request.url,
            event_types: request.event_types,
            secret: request.secret.unwrap_or_else(signature::generate_secret),
            enabled: request.enabled,
            status: WebhookStatus::Active,
            success_count: 0,
            failure_count: 0,
            last_triggered: None,
            created_at: Utc::now(),
        };
        self.store.insert(&registration).await?;

        tracing::info!(
            webhook_id = %registration.id,
            name = %registration.name,
            url = %registration.url,
            "webhook registered"
        );
        Ok(registration)
    }

    pub async fn get(&self, id: Uuid) -> Result<WebhookRegistration, DispatchError> {
        self.store
            .get(&id)
            .await?
            .ok_or(DispatchError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<WebhookRegistration>, DispatchError> {
        Ok(self.store.list().await?)
    }

    /// Merge the supplied fields into the registration. A new URL is
    /// validated; the secret is not updatable here.
    pub async fn update(
        &self,
        id: Uuid,
        update: WebhookUpdate,
    ) -> Result<WebhookRegistration, DispatchError> {
        let mut registration = self.get(id).await?;

        if let Some(url) = update.url {
            validate_url(&url)?;
            registration.url = url;
        }
        if let Some(event_types) = update.event_types {
            if event_types.is_empty() {
                return Err(DispatchError::EmptyEventTypes);
            }
            registration.event_types = event_types;
        }
        if let Some(name) = update.name {
            registration.name = name;
        }
        if let Some(enabled) = update.enabled {
            registration.enabled = enabled;
        }
        if let Some(status) = update.status {
            registration.status = status;
        }

        self.store.update(&registration).await?;
        Ok(registration)
    }

    /// Remove a registration. Returns whether it existed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DispatchError> {
        Ok(self.store.delete(&id).await?)
    }

    /// Most recent fired events, newest first.
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<WebhookEvent>, DispatchError> {
        Ok(self.store.recent_events(limit).await?)
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    /// Send one synthetic signed delivery to the registration's URL.
    ///
    /// The payload comes from the sample-template registry. Test deliveries
    /// are exempt from statistics: success and failure counters stay put,
    /// the report's `success` flag is the only record of the outcome.
    pub async fn test(
        &self,
        id: Uuid,
        event_type: &str,
    ) -> Result<DeliveryReport, DispatchError> {
        let registration = self.get(id).await?;
        let event = WebhookEvent {
            id: Uuid::now_v7(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            payload: sample_payload(event_type),
            user_id: None,
        };
        Ok(deliver(&self.client, &registration, &event).await)
    }

    /// Fire an event: append it to history and fan out to every enabled,
    /// active registration subscribed to this event type.
    ///
    /// Each delivery is an independent spawned task with at most one
    /// attempt. Outcomes land in the registration's counters and on the
    /// event bus; nothing is raised to the caller.
    pub async fn fire(
        &self,
        event_type: &str,
        data: Value,
        user_id: Option<String>,
    ) -> Result<WebhookEvent, DispatchError> {
        let event = WebhookEvent {
            id: Uuid::now_v7(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            payload: data,
            user_id,
        };
        self.store.append_event(&event).await?;

        let matching: Vec<WebhookRegistration> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|r| {
                r.enabled
                    && r.status == WebhookStatus::Active
                    && r.event_types.iter().any(|t| t == event_type)
            })
            .collect();

        tracing::debug!(
            event_type,
            event_id = %event.id,
            subscribers = matching.len(),
            "firing webhook event"
        );

        for registration in matching {
            let client = self.client.clone();
            let store = Arc::clone(&self.store);
            let bus = self.bus.clone();
            let event = event.clone();
            tokio::spawn(async move {
                let report = deliver(&client, &registration, &event).await;
                if let Err(err) = store.record_delivery(&registration.id, report.success).await {
                    tracing::warn!(
                        webhook_id = %registration.id,
                        error = %err,
                        "failed to record delivery outcome"
                    );
                }
                if report.success {
                    bus.publish(EngineEvent::WebhookDelivered {
                        webhook_id: registration.id,
                        event_type: report.event_type,
                        status_code: report.status_code.unwrap_or_default(),
                    });
                } else {
                    tracing::warn!(
                        webhook_id = %registration.id,
                        url = %registration.url,
                        status_code = report.status_code,
                        error = report.error.as_deref(),
                        "webhook delivery failed"
                    );
                    bus.publish(EngineEvent::WebhookDeliveryFailed {
                        webhook_id: registration.id,
                        event_type: report.event_type,
                        error: report
                            .error
                            .unwrap_or_else(|| "delivery failed".to_string()),
                    });
                }
            });
        }

        Ok(event)
    }

    /// Spawn a task that turns engine events into webhook fires.
    ///
    /// Subscribes to the bus and translates workflow completion and failure
    /// into `fire` calls; other event kinds are ignored. The task ends when
    /// the bus closes.
    pub fn spawn_bus_listener(self: &Arc<Self>, bus: &EventBus) -> tokio::task::JoinHandle<()> {
        let mut rx = bus.subscribe();
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(EngineEvent::WorkflowCompleted {
                        workflow_id,
                        name,
                        result,
                        timestamp,
                    }) => {
                        let data = json!({
                            "workflow_id": workflow_id,
                            "name": name,
                            "result": result,
                            "timestamp": timestamp,
                        });
                        if let Err(err) = dispatcher.fire("workflow_completed", data, None).await {
                            tracing::warn!(error = %err, "failed to fan out workflow_completed");
                        }
                    }
                    Ok(EngineEvent::WorkflowFailed {
                        workflow_id,
                        name,
                        error,
                        timestamp,
                    }) => {
                        let data = json!({
                            "workflow_id": workflow_id,
                            "name": name,
                            "error": error,
                            "timestamp": timestamp,
                        });
                        if let Err(err) = dispatcher.fire("workflow_failed", data, None).await {
                            tracing::warn!(error = %err, "failed to fan out workflow_failed");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "webhook bus listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Delivery mechanics
// ---------------------------------------------------------------------------

/// Serialize, sign, and POST one event to one registration.
///
/// Never touches counters; the caller decides what to record.
async fn deliver(
    client: &reqwest::Client,
    registration: &WebhookRegistration,
    event: &WebhookEvent,
) -> DeliveryReport {
    let timer = std::time::Instant::now();

    let payload = delivery_payload(event, registration);
    let body = match serde_json::to_vec(&payload) {
        Ok(body) => body,
        Err(err) => {
            return DeliveryReport {
                webhook_id: registration.id,
                event_type: event.event_type.clone(),
                success: false,
                status_code: None,
                error: Some(format!("payload serialization failed: {err}")),
                duration_ms: timer.elapsed().as_millis() as u64,
            };
        }
    };

    let sig = match signature::sign_payload(&registration.secret, &body) {
        Ok(sig) => sig,
        Err(err) => {
            return DeliveryReport {
                webhook_id: registration.id,
                event_type: event.event_type.clone(),
                success: false,
                status_code: None,
                error: Some(format!("payload signing failed: {err}")),
                duration_ms: timer.elapsed().as_millis() as u64,
            };
        }
    };

    let response = client
        .post(&registration.url)
        .header("Content-Type", "application/json")
        .header(SIGNATURE_HEADER, sig)
        .header(WEBHOOK_ID_HEADER, registration.id.to_string())
        .body(body)
        .send()
        .await;

    let duration_ms = timer.elapsed().as_millis() as u64;
    match response {
        Ok(resp) => {
            let status = resp.status();
            DeliveryReport {
                webhook_id: registration.id,
                event_type: event.event_type.clone(),
                success: status.is_success(),
                status_code: Some(status.as_u16()),
                error: (!status.is_success()).then(|| format!("HTTP {status}")),
                duration_ms,
            }
        }
        Err(err) => DeliveryReport {
            webhook_id: registration.id,
            event_type: event.event_type.clone(),
            success: false,
            status_code: None,
            error: Some(err.to_string()),
            duration_ms,
        },
    }
}

/// The wire envelope: `{ id, type, timestamp, data, webhook: { id, name } }`.
fn delivery_payload(event: &WebhookEvent, registration: &WebhookRegistration) -> Value {
    json!({
        "id": event.id,
        "type": event.event_type,
        "timestamp": event.timestamp,
        "data": event.payload,
        "webhook": {
            "id": registration.id,
            "name": registration.name,
        },
    })
}

fn validate_url(url: &str) -> Result<(), DispatchError> {
    let parsed = Url::parse(url).map_err(|_| DispatchError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DispatchError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Payload templates
// ---------------------------------------------------------------------------

/// Sample payloads for every well-known event type, keyed by type name.
pub fn payload_templates() -> Value {
    json!({
        "workflow_completed": sample_payload("workflow_completed"),
        "workflow_failed": sample_payload("workflow_failed"),
        "energy_data_created": sample_payload("energy_data_created"),
        "alert_triggered": sample_payload("alert_triggered"),
    })
}

/// Synthetic payload for a test delivery. Unknown event types fall back
/// to a generic sample.
fn sample_payload(event_type: &str) -> Value {
    match event_type {
        "workflow_completed" => json!({
            "workflow_id": "0192e4a0-0000-7000-8000-000000000000",
            "name": "intraday-settlement",
            "result": { "notify": { "status": "sent" } },
        }),
        "workflow_failed" => json!({
            "workflow_id": "0192e4a0-0000-7000-8000-000000000000",
            "name": "intraday-settlement",
            "error": "step 'reconcile' failed",
        }),
        "energy_data_created" => json!({
            "meter_id": "mtr-0042",
            "interval_start": "2025-01-01T00:00:00Z",
            "kwh": 1842.5,
            "price_eur_mwh": 86.4,
        }),
        "alert_triggered" => json!({
            "alert": "price_spike",
            "threshold": 120.0,
            "observed": 134.8,
        }),
        other => json!({
            "message": "sample event",
            "event_type": other,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::signature::verify_signature;
    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use gridflow_core::store::MemoryWebhookStore;
    use std::net::SocketAddr;

    /// Requests captured by the local receiver: (signature, webhook id, body).
    #[derive(Clone, Default)]
    struct Received(Arc<tokio::sync::Mutex<Vec<(String, String, Vec<u8>)>>>);

    async fn capture(
        State(received): State<Received>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        received.0.lock().await.push((
            header("x-gridflow-signature"),
            header("x-gridflow-webhook-id"),
            body.to_vec(),
        ));
        StatusCode::OK
    }

    async fn always_fails() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Spawn a local receiver; returns its address and the captured requests.
    async fn spawn_receiver() -> (SocketAddr, Received) {
        let received = Received::default();
        let app = Router::new()
            .route("/hook", post(capture))
            .route("/fail", post(always_fails))
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, received)
    }

    fn dispatcher() -> (Arc<WebhookDispatcher<MemoryWebhookStore>>, EventBus) {
        let bus = EventBus::new(64);
        let dispatcher = WebhookDispatcher::new(
            Arc::new(MemoryWebhookStore::new(100)),
            bus.clone(),
            Duration::from_secs(5),
        )
        .unwrap();
        (Arc::new(dispatcher), bus)
    }

    fn registration_for(url: String, event_types: Vec<&str>) -> RegisterWebhook {
        RegisterWebhook {
            name: "settlement feed".to_string(),
            url,
            event_types: event_types.into_iter().map(String::from).collect(),
            secret: None,
            enabled: true,
        }
    }

    /// Wait for spawned delivery tasks to land.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    // -------------------------------------------------------------------
    // Registration validation
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn register_rejects_bad_url() {
        let (dispatcher, _bus) = dispatcher();
        let result = dispatcher
            .register(registration_for("not a url".to_string(), vec!["x"]))
            .await;
        assert!(matches!(result, Err(DispatchError::InvalidUrl(_))));

        let result = dispatcher
            .register(registration_for("ftp://example.com/hook".to_string(), vec!["x"]))
            .await;
        assert!(matches!(result, Err(DispatchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn register_rejects_empty_event_types() {
        let (dispatcher, _bus) = dispatcher();
        let result = dispatcher
            .register(registration_for("https://example.com/hook".to_string(), vec![]))
            .await;
        assert!(matches!(result, Err(DispatchError::EmptyEventTypes)));
    }

    #[tokio::test]
    async fn register_generates_secret_when_absent() {
        let (dispatcher, _bus) = dispatcher();
        let registration = dispatcher
            .register(registration_for(
                "https://example.com/hook".to_string(),
                vec!["energy_data_created"],
            ))
            .await
            .unwrap();

        assert!(registration.secret.starts_with("whsec_"));
        assert_eq!(registration.status, WebhookStatus::Active);
        assert_eq!(registration.success_count, 0);
    }

    #[tokio::test]
    async fn update_validates_url_and_event_types() {
        let (dispatcher, _bus) = dispatcher();
        let registration = dispatcher
            .register(registration_for(
                "https://example.com/hook".to_string(),
                vec!["energy_data_created"],
            ))
            .await
            .unwrap();

        let result = dispatcher
            .update(
                registration.id,
                WebhookUpdate {
                    url: Some("nope".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DispatchError::InvalidUrl(_))));

        let result = dispatcher
            .update(
                registration.id,
                WebhookUpdate {
                    event_types: Some(vec![]),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DispatchError::EmptyEventTypes)));
    }

    // -------------------------------------------------------------------
    // fire
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn fire_delivers_signed_payload_and_increments_success() {
        let (addr, received) = spawn_receiver().await;
        let (dispatcher, _bus) = dispatcher();
        let registration = dispatcher
            .register(registration_for(
                format!("http://{addr}/hook"),
                vec!["energy_data_created"],
            ))
            .await
            .unwrap();

        dispatcher
            .fire("energy_data_created", json!({"kwh": 12.5}), None)
            .await
            .unwrap();
        settle().await;

        let requests = received.0.lock().await;
        assert_eq!(requests.len(), 1);
        let (sig, webhook_id, body) = &requests[0];
        assert_eq!(webhook_id, &registration.id.to_string());
        // signature verifies against the exact body bytes
        verify_signature(&registration.secret, body, sig).unwrap();
        let envelope: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(envelope["type"], "energy_data_created");
        assert_eq!(envelope["data"]["kwh"], 12.5);
        assert_eq!(envelope["webhook"]["name"], "settlement feed");
        drop(requests);

        let after = dispatcher.get(registration.id).await.unwrap();
        assert_eq!(after.success_count, 1);
        assert_eq!(after.failure_count, 0);
        assert!(after.last_triggered.is_some());
    }

    #[tokio::test]
    async fn fire_skips_disabled_and_non_matching() {
        let (addr, received) = spawn_receiver().await;
        let (dispatcher, _bus) = dispatcher();

        let disabled = dispatcher
            .register(RegisterWebhook {
                enabled: false,
                ..registration_for(format!("http://{addr}/hook"), vec!["energy_data_created"])
            })
            .await
            .unwrap();
        let wrong_type = dispatcher
            .register(registration_for(
                format!("http://{addr}/hook"),
                vec!["alert_triggered"],
            ))
            .await
            .unwrap();

        dispatcher
            .fire("energy_data_created", json!({}), None)
            .await
            .unwrap();
        settle().await;

        assert!(received.0.lock().await.is_empty());
        assert_eq!(dispatcher.get(disabled.id).await.unwrap().success_count, 0);
        assert_eq!(dispatcher.get(wrong_type.id).await.unwrap().success_count, 0);
    }

    #[tokio::test]
    async fn failed_delivery_increments_failure_count() {
        let (addr, _received) = spawn_receiver().await;
        let (dispatcher, _bus) = dispatcher();
        let registration = dispatcher
            .register(registration_for(
                format!("http://{addr}/fail"),
                vec!["energy_data_created"],
            ))
            .await
            .unwrap();

        dispatcher
            .fire("energy_data_created", json!({}), None)
            .await
            .unwrap();
        settle().await;

        let after = dispatcher.get(registration.id).await.unwrap();
        assert_eq!(after.success_count, 0);
        assert_eq!(after.failure_count, 1);
        assert!(after.last_triggered.is_none());
    }

    #[tokio::test]
    async fn fire_appends_to_event_history() {
        let (dispatcher, _bus) = dispatcher();
        dispatcher
            .fire("energy_data_created", json!({"kwh": 1.0}), Some("trader-7".to_string()))
            .await
            .unwrap();

        let events = dispatcher.recent_events(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "energy_data_created");
        assert_eq!(events[0].user_id.as_deref(), Some("trader-7"));
    }

    // -------------------------------------------------------------------
    // test delivery
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_delivery_reports_success_without_touching_counters() {
        let (addr, received) = spawn_receiver().await;
        let (dispatcher, _bus) = dispatcher();
        let registration = dispatcher
            .register(registration_for(
                format!("http://{addr}/hook"),
                vec!["energy_data_created"],
            ))
            .await
            .unwrap();

        let report = dispatcher
            .test(registration.id, "energy_data_created")
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.status_code, Some(200));

        // one request went out, but statistics stayed put
        assert_eq!(received.0.lock().await.len(), 1);
        let after = dispatcher.get(registration.id).await.unwrap();
        assert_eq!(after.success_count, 0);
        assert_eq!(after.failure_count, 0);
        assert!(after.last_triggered.is_none());
    }

    #[tokio::test]
    async fn test_delivery_reports_failure_for_unreachable_url() {
        let (dispatcher, _bus) = dispatcher();
        // nothing listens on this port
        let registration = dispatcher
            .register(registration_for(
                "http://127.0.0.1:9/hook".to_string(),
                vec!["energy_data_created"],
            ))
            .await
            .unwrap();

        let report = dispatcher
            .test(registration.id, "energy_data_created")
            .await
            .unwrap();
        assert!(!report.success);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn test_delivery_unknown_id_is_not_found() {
        let (dispatcher, _bus) = dispatcher();
        let result = dispatcher.test(Uuid::now_v7(), "energy_data_created").await;
        assert!(matches!(result, Err(DispatchError::NotFound(_))));
    }

    // -------------------------------------------------------------------
    // bus listener
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn bus_listener_translates_workflow_events() {
        let (addr, received) = spawn_receiver().await;
        let (dispatcher, bus) = dispatcher();
        let registration = dispatcher
            .register(registration_for(
                format!("http://{addr}/hook"),
                vec!["workflow_completed"],
            ))
            .await
            .unwrap();

        let _listener = dispatcher.spawn_bus_listener(&bus);
        // let the listener subscribe before publishing
        tokio::time::sleep(Duration::from_millis(50)).await;

        bus.publish(EngineEvent::WorkflowCompleted {
            workflow_id: Uuid::now_v7(),
            name: "intraday-settlement".to_string(),
            result: json!({}),
            timestamp: Utc::now(),
        });
        settle().await;

        assert_eq!(received.0.lock().await.len(), 1);
        let after = dispatcher.get(registration.id).await.unwrap();
        assert_eq!(after.success_count, 1);
    }

    // -------------------------------------------------------------------
    // templates
    // -------------------------------------------------------------------

    #[test]
    fn templates_cover_known_event_types() {
        let templates = payload_templates();
        assert!(templates["energy_data_created"]["meter_id"].is_string());
        assert!(templates["workflow_failed"]["error"].is_string());
    }

    #[test]
    fn unknown_event_type_gets_generic_sample() {
        let sample = sample_payload("mystery_event");
        assert_eq!(sample["event_type"], "mystery_event");
    }
}

//! Webhook registration, test delivery, and event log handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use gridflow_infra::webhook::dispatcher::payload_templates;
use gridflow_types::webhook::{
    DeliveryReport, RegisterWebhook, WebhookEvent, WebhookRegistration, WebhookUpdate,
};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Default for GET /webhooks/events when no limit is supplied.
const DEFAULT_EVENT_LIMIT: usize = 50;

/// POST /api/v1/webhooks/{id}/test request body.
#[derive(Debug, Deserialize)]
pub struct TestRequest {
    /// Event type to synthesize; defaults to a generic sample.
    #[serde(default = "default_test_event")]
    pub event_type: String,
}

fn default_test_event() -> String {
    "energy_data_created".to_string()
}

/// GET /api/v1/webhooks/events query parameters.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// Registration view with the signing secret stripped.
///
/// The secret appears exactly once, in the register response; list and get
/// never echo it back.
fn public_view(registration: &WebhookRegistration) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(registration)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if let Some(map) = value.as_object_mut() {
        map.remove("secret");
    }
    Ok(value)
}

/// Registration view for the create response: delivery stats stripped,
/// secret kept (this is its only appearance).
fn created_view(registration: &WebhookRegistration) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(registration)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if let Some(map) = value.as_object_mut() {
        map.remove("success_count");
        map.remove("failure_count");
        map.remove("last_triggered");
    }
    Ok(value)
}

/// POST /api/v1/webhooks - Register a webhook endpoint.
///
/// The response includes the signing secret; it is not retrievable later.
pub async fn register_webhook(
    State(state): State<AppState>,
    Json(body): Json<RegisterWebhook>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let registration = state.webhooks.register(body).await?;
    let view = created_view(&registration)?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(view, request_id, elapsed)),
    ))
}

/// GET /api/v1/webhooks - List registrations (secrets omitted).
pub async fn list_webhooks(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let registrations = state.webhooks.list().await?;
    let views = registrations
        .iter()
        .map(public_view)
        .collect::<Result<Vec<_>, _>>()?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(views, request_id, elapsed)))
}

/// GET /api/v1/webhooks/{id} - Get one registration (secret omitted).
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let registration = state.webhooks.get(id).await?;
    let view = public_view(&registration)?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(view, request_id, elapsed)))
}

/// PUT /api/v1/webhooks/{id} - Update a registration.
pub async fn update_webhook(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<WebhookUpdate>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let registration = state.webhooks.update(id, body).await?;
    let view = public_view(&registration)?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(view, request_id, elapsed)))
}

/// DELETE /api/v1/webhooks/{id} - Remove a registration.
pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let existed = state.webhooks.delete(id).await?;
    if !existed {
        return Err(AppError::Dispatch(
            gridflow_infra::webhook::DispatchError::NotFound(id),
        ));
    }
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "message": format!("webhook {id} deleted") }),
        request_id,
        elapsed,
    )))
}

/// POST /api/v1/webhooks/{id}/test - One synthetic signed delivery.
///
/// Always HTTP 200 for a known id; the report's embedded `success` flag
/// carries the outcome. Counters are never touched.
pub async fn test_webhook(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<TestRequest>>,
) -> Result<Json<ApiResponse<DeliveryReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let event_type = body
        .map(|Json(b)| b.event_type)
        .unwrap_or_else(default_test_event);
    let report = state.webhooks.test(id, &event_type).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(report, request_id, elapsed)))
}

/// GET /api/v1/webhooks/templates - Sample payloads per event type.
pub async fn list_templates() -> Json<ApiResponse<Value>> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let elapsed = start.elapsed().as_millis() as u64;

    Json(ApiResponse::success(payload_templates(), request_id, elapsed))
}

/// GET /api/v1/webhooks/events?limit= - Recent fired events, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<ApiResponse<Vec<WebhookEvent>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let events = state.webhooks.recent_events(limit).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(events, request_id, elapsed)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridflow_types::webhook::WebhookStatus;

    fn sample_registration() -> WebhookRegistration {
        WebhookRegistration {
            id: Uuid::now_v7(),
            name: "settlement feed".to_string(),
            url: "https://example.com/hook".to_string(),
            event_types: vec!["workflow_completed".to_string()],
            secret: "whsec_0123456789abcdef".to_string(),
            enabled: true,
            status: WebhookStatus::Active,
            success_count: 7,
            failure_count: 2,
            last_triggered: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn created_view_strips_delivery_stats_but_keeps_secret() {
        let view = created_view(&sample_registration()).unwrap();
        let map = view.as_object().unwrap();

        assert!(!map.contains_key("success_count"));
        assert!(!map.contains_key("failure_count"));
        assert!(!map.contains_key("last_triggered"));
        assert_eq!(map["secret"], "whsec_0123456789abcdef");
        assert_eq!(map["name"], "settlement feed");
    }

    #[test]
    fn public_view_strips_secret_but_keeps_stats() {
        let view = public_view(&sample_registration()).unwrap();
        let map = view.as_object().unwrap();

        assert!(!map.contains_key("secret"));
        assert_eq!(map["success_count"], 7);
        assert_eq!(map["failure_count"], 2);
    }
}

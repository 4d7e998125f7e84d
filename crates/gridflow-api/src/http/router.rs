//! Axum router configuration with middleware.
//!
//! All routes live under `/api/v1/`; `GET /health` is unnested.
//! Middleware: permissive CORS and HTTP tracing.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Workflow CRUD
        .route("/workflows", get(handlers::workflow::list_workflows))
        .route("/workflows", post(handlers::workflow::create_workflow))
        .route("/workflows/{id}", get(handlers::workflow::get_workflow))
        .route("/workflows/{id}", put(handlers::workflow::update_workflow))
        .route("/workflows/{id}", delete(handlers::workflow::delete_workflow))
        // Execution and scheduling
        .route(
            "/workflows/{id}/execute",
            post(handlers::workflow::execute_workflow),
        )
        .route(
            "/workflows/{id}/schedule",
            post(handlers::workflow::schedule_workflow),
        )
        .route(
            "/workflows/{id}/unschedule",
            post(handlers::workflow::unschedule_workflow),
        )
        // Webhook registry
        .route("/webhooks", post(handlers::webhook::register_webhook))
        .route("/webhooks", get(handlers::webhook::list_webhooks))
        // Static segments take precedence over the {id} capture
        .route("/webhooks/templates", get(handlers::webhook::list_templates))
        .route("/webhooks/events", get(handlers::webhook::list_events))
        .route("/webhooks/{id}", get(handlers::webhook::get_webhook))
        .route("/webhooks/{id}", put(handlers::webhook::update_webhook))
        .route("/webhooks/{id}", delete(handlers::webhook::delete_webhook))
        .route("/webhooks/{id}/test", post(handlers::webhook::test_webhook));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness probe.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "service": "gridflow",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

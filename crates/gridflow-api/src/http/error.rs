//! Application error type mapping engine errors to HTTP status codes and
//! the envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use gridflow_core::engine::EngineError;
use gridflow_core::engine::scheduler::SchedulerError;
use gridflow_infra::webhook::DispatchError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Workflow engine errors.
    Engine(EngineError),
    /// Webhook registry and delivery errors.
    Dispatch(DispatchError),
    /// Request validation failure.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::Dispatch(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Engine(EngineError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Workflow {id} not found"),
            ),
            AppError::Engine(EngineError::NotActive { id, status }) => (
                StatusCode::CONFLICT,
                "WORKFLOW_NOT_ACTIVE",
                format!("Workflow {id} is not active (status: {status})"),
            ),
            AppError::Engine(EngineError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Engine(EngineError::Run(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STEP_EXECUTION_ERROR",
                e.to_string(),
            ),
            AppError::Engine(EngineError::Scheduler(e @ SchedulerError::InvalidSchedule(_))) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Engine(EngineError::Scheduler(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SCHEDULER_ERROR",
                e.to_string(),
            ),
            AppError::Engine(EngineError::Store(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                e.to_string(),
            ),
            AppError::Dispatch(DispatchError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Webhook {id} not found"),
            ),
            AppError::Dispatch(e @ DispatchError::InvalidUrl(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Dispatch(e @ DispatchError::EmptyEventTypes) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Dispatch(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                e.to_string(),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = json!({
            "success": false,
            "error": {
                "message": message,
                "code": code,
            },
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0,
            }
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridflow_core::engine::graph::GraphError;
    use gridflow_types::workflow::WorkflowStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response =
            AppError::Engine(EngineError::NotFound(Uuid::now_v7())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn not_active_maps_to_409() {
        let response = AppError::Engine(EngineError::NotActive {
            id: Uuid::now_v7(),
            status: WorkflowStatus::Draft,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn graph_validation_maps_to_400() {
        let response =
            AppError::Engine(EngineError::Validation(GraphError::EmptyWorkflow)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_schedule_maps_to_400() {
        let response = AppError::Engine(EngineError::Scheduler(
            SchedulerError::InvalidSchedule("whenever".to_string()),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_url_maps_to_400() {
        let response =
            AppError::Dispatch(DispatchError::InvalidUrl("nope".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

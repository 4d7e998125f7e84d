//! Workflow CRUD, execution, and scheduling handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use gridflow_types::workflow::{NewWorkflow, RunReport, Workflow, WorkflowUpdate};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/workflows/{id}/execute request body.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Trigger payload made available to steps as the run context.
    #[serde(default)]
    pub context: Value,
}

/// POST /api/v1/workflows/{id}/schedule request body.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// Five or six field cron expression.
    pub schedule: String,
}

/// GET /api/v1/workflows - List all workflows.
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Workflow>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflows = state.workflows.list().await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(workflows, request_id, elapsed)))
}

/// POST /api/v1/workflows - Create a workflow (starts in `draft`).
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(body): Json<NewWorkflow>,
) -> Result<(StatusCode, Json<ApiResponse<Workflow>>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflows.create(body).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(workflow, request_id, elapsed)),
    ))
}

/// GET /api/v1/workflows/{id} - Get a workflow by ID.
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflows.get(id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(workflow, request_id, elapsed)))
}

/// PUT /api/v1/workflows/{id} - Update or toggle a workflow.
pub async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<WorkflowUpdate>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflows.update(id, body).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(workflow, request_id, elapsed)))
}

/// DELETE /api/v1/workflows/{id} - Delete a workflow (unschedules first).
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let existed = state.workflows.delete(id).await?;
    if !existed {
        return Err(AppError::Engine(
            gridflow_core::engine::EngineError::NotFound(id),
        ));
    }
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "message": format!("workflow {id} deleted") }),
        request_id,
        elapsed,
    )))
}

/// POST /api/v1/workflows/{id}/execute - Run a workflow now.
///
/// The body is optional; an absent body runs with a null trigger payload.
/// Engine errors propagate: 409 when not active, 500 when a step fails.
pub async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ExecuteRequest>>,
) -> Result<Json<ApiResponse<RunReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let context = body.map(|Json(b)| b.context).unwrap_or(Value::Null);
    let report = state.workflows.execute(id, context).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(report, request_id, elapsed)))
}

/// POST /api/v1/workflows/{id}/schedule - Bind a cron expression.
pub async fn schedule_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ScheduleRequest>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.schedule.trim().is_empty() {
        return Err(AppError::Validation("schedule must not be empty".to_string()));
    }

    let workflow = state.workflows.schedule(id, &body.schedule).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(workflow, request_id, elapsed)))
}

/// POST /api/v1/workflows/{id}/unschedule - Remove the cron binding.
///
/// Idempotent: unscheduling an unscheduled workflow succeeds and leaves
/// it `paused`.
pub async fn unschedule_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflows.unschedule(id).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Ok(Json(ApiResponse::success(workflow, request_id, elapsed)))
}

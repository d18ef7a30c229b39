use crate::task::validation::{TaskRequest, ValidationLimits, validate_filter, validate_task};
use crate::task::{CreatedAtPrecision, TaskService};
use crate::web::error::AppError;
use crate::web::extract::{TaskId, TaskPayload, TaskQueryParams};
use crate::web::method_not_allowed_handler;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;
use task_model::{ErrorResponse, TaskResponse, TaskStatus};

/// Shared state of the task endpoints.
#[derive(Clone, Debug)]
pub struct TaskState {
    pub service: TaskService,
    pub limits: ValidationLimits,
    pub precision: CreatedAtPrecision,
}

/// Handler for POST /api/v1/tasks - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = TaskRequest,
    responses(
        (status = 201, description = "Operation completed successfully", body = TaskResponse),
        (status = 400, description = "Validation error for one of the request parameters", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    TaskPayload(request): TaskPayload,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    let draft = validate_task(request, &state.limits).map_err(AppError::Validation)?;
    let task = state.service.create_task(draft).await?;
    Ok((StatusCode::CREATED, Json(task.into_response(state.precision))))
}

/// Handler for GET /api/v1/tasks and /api/v1/tasks/filter - Lists tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/filter",
    params(
        ("status" = Option<TaskStatus>, Query, description = "Only return tasks with this status"),
        ("createdAt" = Option<String>, Query, description = "Only return tasks created on this date (YYYY-MM-DD) or at this instant (RFC 3339)")
    ),
    responses(
        (status = 200, description = "Operation completed successfully", body = Vec<TaskResponse>),
        (status = 400, description = "Validation error for one of the request parameters", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_tasks_handler(
    State(state): State<Arc<TaskState>>,
    TaskQueryParams(query): TaskQueryParams,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let filter = validate_filter(&query, state.precision).map_err(AppError::Validation)?;
    let tasks = state.service.get_tasks(filter).await?;
    Ok(Json(
        tasks
            .into_iter()
            .map(|task| task.into_response(state.precision))
            .collect(),
    ))
}

/// Handler for GET /api/v1/tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID, at least 1")),
    responses(
        (status = 200, description = "Operation completed successfully", body = TaskResponse),
        (status = 400, description = "Validation error for one of the request parameters", body = ErrorResponse),
        (status = 404, description = "No task with this ID", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    TaskId(id): TaskId,
) -> Result<Json<TaskResponse>, AppError> {
    let task = state.service.get_task_by_id(id).await?;
    Ok(Json(task.into_response(state.precision)))
}

/// Handler for PUT /api/v1/tasks/{id} - Overwrites a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID, at least 1")),
    request_body = TaskRequest,
    responses(
        (status = 200, description = "Operation completed successfully", body = TaskResponse),
        (status = 400, description = "Validation error for one of the request parameters", body = ErrorResponse),
        (status = 404, description = "No task with this ID", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    TaskId(id): TaskId,
    TaskPayload(request): TaskPayload,
) -> Result<Json<TaskResponse>, AppError> {
    let draft = validate_task(request, &state.limits).map_err(AppError::Validation)?;
    let task = state.service.update_task(id, draft).await?;
    Ok(Json(task.into_response(state.precision)))
}

/// Handler for DELETE /api/v1/tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID, at least 1")),
    responses(
        (status = 200, description = "Operation completed successfully"),
        (status = 400, description = "Validation error for one of the request parameters", body = ErrorResponse),
        (status = 404, description = "No task with this ID", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    TaskId(id): TaskId,
) -> Result<StatusCode, AppError> {
    state.service.delete_task(id).await?;
    Ok(StatusCode::OK)
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route(
            "/tasks",
            post(create_task_handler)
                .get(get_tasks_handler)
                .fallback(method_not_allowed_handler),
        )
        .route(
            "/tasks/filter",
            get(get_tasks_handler).fallback(method_not_allowed_handler),
        )
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler)
                .fallback(method_not_allowed_handler),
        )
        .with_state(state)
}

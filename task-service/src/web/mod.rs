pub mod error;
pub mod extract;
pub mod middleware;

use anyhow::Context;
use axum::Router;
use axum::http::{HeaderName, Uri};
use axum::middleware::from_fn_with_state;
use axum::response::Json;
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use task_model::{ApiError, ErrorKind};
use tower::ServiceBuilder;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::Config;
use crate::task::TaskService;
use crate::task::api::v1::{TaskState, create_api_router};
use crate::task::repository::SeaOrmTaskRepository;
use error::AppError;
use middleware::{FieldMasker, RequestLogger, log_request_middleware};

#[derive(OpenApi)]
#[openapi(
    info(title = "Tasks API", description = "Create, list, filter, update and delete tasks"),
    paths(
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::get_tasks_handler,
        crate::task::api::v1::get_task_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::delete_task_handler,
    ),
    components(schemas(
        crate::task::validation::TaskRequest,
        task_model::TaskResponse,
        task_model::TaskDetails,
        task_model::TaskStatus,
        task_model::CreatedAt,
        task_model::ErrorResponse,
    )),
    tags((name = "Tasks", description = "Task management endpoints"))
)]
pub struct ApiDoc;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let repository = SeaOrmTaskRepository::new(Arc::new(db));
    let service = TaskService::new(Arc::new(repository));
    let app = create_app(&config, service)?;

    axum::serve(listener, app).await?;
    Ok(())
}

/// Assembles the full application: task routes under the configured prefix,
/// health and API docs, the 404 fallback and the middleware stack.
pub fn create_app(config: &Config, service: TaskService) -> anyhow::Result<Router> {
    let state = Arc::new(TaskState {
        service,
        limits: config.validation_limits(),
        precision: config.created_at_precision,
    });
    let prefix = normalize_prefix(&config.api_prefix);

    let sensitive_headers = config
        .sensitive_headers
        .iter()
        .map(|name| {
            HeaderName::try_from(name.trim().to_ascii_lowercase())
                .with_context(|| format!("invalid sensitive header name `{name}`"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let masker = FieldMasker::new(&config.masked_fields).context("invalid masked field names")?;
    let logger = Arc::new(
        RequestLogger::new(prefix.clone(), masker, sensitive_headers.clone())
            .with_body_limit(config.log_body_limit),
    );

    let api_router = create_api_router(state);
    let router = if prefix.is_empty() {
        Router::new().merge(api_router)
    } else {
        Router::new().nest(&prefix, api_router)
    };

    let app = router
        .route("/health", get(health_check_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(SetSensitiveRequestHeadersLayer::new(sensitive_headers))
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(logger, log_request_middleware)),
        );
    Ok(app)
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Fallback for a known route called with an unsupported method.
pub async fn method_not_allowed_handler() -> AppError {
    ApiError::new(ErrorKind::NotAllowed).into()
}

/// Fallback for paths no route matches.
pub async fn not_found_handler(uri: Uri) -> AppError {
    ApiError::with_message(
        ErrorKind::ResourceNotFound,
        format!("No resource found at {}", uri.path()),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::repository::MockTaskRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use task_model::ErrorResponse;
    use tower::ServiceExt;

    fn app_with_prefix(prefix: &str) -> Router {
        let mut config = Config::with_db_url("sqlite::memory:");
        config.api_prefix = prefix.to_string();
        let service = TaskService::new(Arc::new(MockTaskRepository::new()));
        create_app(&config, service).unwrap()
    }

    async fn error_body(response: axum::response::Response) -> ErrorResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn can_normalize_prefixes() {
        assert_eq!(normalize_prefix("/api/v1"), "/api/v1");
        assert_eq!(normalize_prefix("/api/v1/"), "/api/v1");
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }

    #[tokio::test]
    async fn can_answer_health_check() {
        let response = app_with_prefix("/api/v1")
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn can_serve_openapi_document() {
        let response = app_with_prefix("/api/v1")
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let document: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(document["paths"]["/api/v1/tasks/{id}"].is_object());
        assert!(document["components"]["schemas"]["ErrorResponse"].is_object());
    }

    #[tokio::test]
    async fn can_report_unknown_routes_in_error_envelope() {
        let response = app_with_prefix("/api/v1")
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = error_body(response).await;
        assert_eq!(body.code, "resource_not_found");
        assert_eq!(body.origin.as_deref(), Some("tasks-service"));
    }

    #[tokio::test]
    async fn can_reject_unsupported_methods() {
        let response = app_with_prefix("/api/v1")
            .oneshot(
                Request::patch("/api/v1/tasks/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(error_body(response).await.code, "not_allowed");
    }

    #[tokio::test]
    async fn can_mount_routes_at_root_without_prefix() {
        let response = app_with_prefix("/")
            .oneshot(Request::delete("/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

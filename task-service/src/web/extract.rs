//! Extractors that turn framework rejections into [`AppError`]s so that no
//! request fails in a framework default shape.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use task_model::{ApiError, ErrorKind};

use super::error::AppError;
use crate::task::validation::{TaskQuery, TaskRequest, validate_task_id};

/// A task ID taken from the path, already checked to be a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub i32);

impl<S> FromRequestParts<S> for TaskId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::with_message(ErrorKind::BadResourceId, rejection.body_text())
            })?;
        Ok(TaskId(validate_task_id(&raw)?))
    }
}

/// A JSON task payload. Field level checks happen afterwards, in validation.
#[derive(Debug, Clone)]
pub struct TaskPayload(pub TaskRequest);

impl<S> FromRequest<S> for TaskPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = has_json_content_type(request.headers());
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|rejection| AppError::MalformedBody(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::new(ErrorKind::ArgumentMissing).into());
        }
        if !is_json {
            return Err(ApiError::with_message(
                ErrorKind::BadRequest,
                "Expected request with `Content-Type: application/json`",
            )
            .into());
        }

        let Json(payload) = Json::<TaskRequest>::from_bytes(&bytes)
            .map_err(|rejection| AppError::MalformedBody(rejection.body_text()))?;
        Ok(TaskPayload(payload))
    }
}

/// Raw listing parameters.
#[derive(Debug, Clone, Default)]
pub struct TaskQueryParams(pub TaskQuery);

impl<S> FromRequestParts<S> for TaskQueryParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<TaskQuery>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::with_message(ErrorKind::BadRequest, rejection.body_text()))?;
        Ok(TaskQueryParams(query))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

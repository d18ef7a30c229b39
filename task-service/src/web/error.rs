//! Translation of every failure the service can produce into one HTTP status
//! and one [`ErrorResponse`] envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use task_model::{ApiError, ErrorKind, ErrorResponse, FieldErrors, ORIGIN};

use crate::task::TaskServiceError;

const INVALID_DATA: &str = "invalid data";
const SERVER_ERROR: &str = "server error";
const JSON_DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Any failure raised while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure whose kind was decided where it was raised.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// One or more payload or parameter fields failed validation.
    #[error("invalid data: {0:?}")]
    Validation(FieldErrors),
    /// The request body could not be parsed.
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    /// Anything unanticipated. The detail is logged, never returned.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<TaskServiceError> for AppError {
    fn from(error: TaskServiceError) -> Self {
        match error {
            TaskServiceError::TaskNotFound(_) => ApiError::new(ErrorKind::ResourceNotFound).into(),
            TaskServiceError::Database(err) => AppError::Internal(err.into()),
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Api(error) => error.kind(),
            AppError::Validation(_) | AppError::MalformedBody(_) => ErrorKind::BadRequest,
            AppError::Internal(_) => ErrorKind::InternalServerError,
        }
    }
}

/// Maps a failure to its status and envelope.
pub fn normalize(error: AppError) -> (StatusCode, ErrorResponse) {
    let kind = error.kind();
    let response = match error {
        AppError::Api(error) => error.into_parts().1,
        AppError::Validation(errors) => {
            ErrorResponse::new(ErrorKind::BadRequest, INVALID_DATA).with_data(errors)
        }
        AppError::MalformedBody(message) => {
            ErrorResponse::new(ErrorKind::BadRequest, describe_malformed_body(&message))
        }
        AppError::Internal(_) => ErrorResponse::new(ErrorKind::InternalServerError, SERVER_ERROR),
    };
    let status = StatusCode::from_u16(kind.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.with_origin_if_missing(ORIGIN))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.kind().is_client_error() {
            tracing::warn!("{}", self);
        } else {
            tracing::error!("{:#}", self);
        }
        let (status, body) = normalize(self);
        (status, Json(body)).into_response()
    }
}

/// Best effort description of a body parse failure naming the offending field.
///
/// Falls back to the raw message when no field can be identified.
pub fn describe_malformed_body(message: &str) -> String {
    let detail = message
        .strip_prefix(JSON_DATA_ERROR_PREFIX)
        .unwrap_or(message);
    let Some((path, reason)) = detail.split_once(": ") else {
        return message.to_string();
    };
    if !is_field_path(path) {
        return message.to_string();
    }
    // Only enum-typed fields produce `unknown variant`. Task payloads carry
    // `status` as a string and report bad values through validation.
    match text_between(reason, "unknown variant `", "`") {
        Some(value) => format!("invalid value {value} for a field {path}"),
        None => format!("invalid value for a field: '{path}'"),
    }
}

fn is_field_path(path: &str) -> bool {
    !path.is_empty()
        && path != "."
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

fn text_between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

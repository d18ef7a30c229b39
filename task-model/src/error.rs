use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

/// Identifier written into the `origin` of every envelope this service emits.
pub const ORIGIN: &str = "tasks-service";

/// Field name (or error code) mapped to a violation message.
pub type FieldErrors = BTreeMap<String, String>;

/// Closed set of failure categories. Each kind maps to exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArgumentMissing,
    BadResourceId,
    BadRequest,
    ResourceNotFound,
    NotAllowed,
    InternalServerError,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::ArgumentMissing | ErrorKind::BadResourceId | ErrorKind::BadRequest => 400,
            ErrorKind::ResourceNotFound => 404,
            ErrorKind::NotAllowed => 405,
            ErrorKind::InternalServerError => 500,
        }
    }

    /// Returns the default human readable message for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::ArgumentMissing => "Body argument missing",
            ErrorKind::BadResourceId => "Bad task id",
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::ResourceNotFound => "No task found",
            ErrorKind::NotAllowed => "Method is not allowed",
            ErrorKind::InternalServerError => "Internal server error",
        }
    }

    /// Returns the upper snake case name, e.g. `RESOURCE_NOT_FOUND`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::ArgumentMissing => "ARGUMENT_MISSING",
            ErrorKind::BadResourceId => "BAD_RESOURCE_ID",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorKind::NotAllowed => "NOT_ALLOWED",
            ErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Returns the machine readable code used in envelopes, e.g. `resource_not_found`.
    pub fn code(self) -> String {
        self.name().to_lowercase()
    }

    /// Returns true for kinds caused by the client rather than the service.
    pub fn is_client_error(self) -> bool {
        self.status() < 500
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uniform failure envelope returned for every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// A code representing the error.
    #[schema(example = "resource_not_found")]
    pub code: String,
    /// A description of the error that occurred.
    #[schema(example = "No task found")]
    pub description: String,
    /// The service the error originated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "tasks-service")]
    pub origin: Option<String>,
    /// When the error occurred.
    pub timestamp: DateTime<Utc>,
    /// Field level details, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FieldErrors>,
}

impl ErrorResponse {
    /// Creates an envelope for `kind` with the given description, stamped with the current time.
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            code: kind.code(),
            description: description.into(),
            origin: None,
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Replaces the data map.
    pub fn with_data(mut self, data: FieldErrors) -> Self {
        self.data = Some(data);
        self
    }

    /// Adds a single entry to the data map, creating it if needed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .get_or_insert_with(FieldErrors::new)
            .insert(key.into(), value.into());
    }

    /// Sets the origin unless one was already set.
    pub fn with_origin_if_missing(mut self, origin: &str) -> Self {
        if self.origin.as_deref().is_none_or(str::is_empty) {
            self.origin = Some(origin.to_string());
        }
        self
    }
}

/// A failure whose kind is known where it is raised.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    kind: ErrorKind,
    response: ErrorResponse,
}

impl ApiError {
    /// Creates an error carrying the kind's default message.
    pub fn new(kind: ErrorKind) -> Self {
        Self::with_message(kind, kind.message())
    }

    /// Creates an error with a custom description.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            response: ErrorResponse::new(kind, message),
        }
    }

    /// Attaches a field level entry to the envelope's data map.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.insert(key, value);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn response(&self) -> &ErrorResponse {
        &self.response
    }

    pub fn into_parts(self) -> (ErrorKind, ErrorResponse) {
        (self.kind, self.response)
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        ApiError::new(kind)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.response.description)
    }
}

impl std::error::Error for ApiError {}

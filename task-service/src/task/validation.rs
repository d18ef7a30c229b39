//! Structural checks applied to task payloads and parameters before they reach
//! [`TaskService`](super::TaskService).
//!
//! Payload validation reports every violated field at once rather than
//! stopping at the first one.

use serde::Deserialize;
use task_model::{ApiError, ErrorKind, FieldErrors, TaskDetails, TaskStatus};
use utoipa::ToSchema;

use super::CreatedAtPrecision;
use super::repository::CreatedAtFilter;

const BLANK_MESSAGE: &str = "must not be blank";
const MIN_ID_MESSAGE: &str = "Task ID must be greater than or equal to 1.";

/// Candidate task payload used for task creation and update.
///
/// Every field is optional at the parsing level so that missing and invalid
/// values are reported together.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TaskRequest {
    /// The title of the task
    #[schema(example = "Task Title", max_length = 255)]
    pub title: Option<String>,
    /// A detailed description of the task
    #[schema(example = "This is a description of the task.", max_length = 1000)]
    pub description: Option<String>,
    /// The current status of the task, one of NEW, IN_PROGRESS, DONE
    #[schema(example = "IN_PROGRESS")]
    pub status: Option<String>,
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskDraft {
    /// Resolves the draft into stored fields, applying the default status if absent.
    pub fn into_details(self) -> TaskDetails {
        TaskDetails {
            title: self.title,
            description: self.description,
            status: self.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub title_max_length: usize,
    pub description_max_length: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            title_max_length: 255,
            description_max_length: 1000,
        }
    }
}

/// Raw listing query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

/// Parsed listing filters. Absent fields do not restrict the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub created_at: Option<CreatedAtFilter>,
}

pub fn invalid_value(raw: &str) -> String {
    format!("Invalid value: '{raw}'")
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    raw.parse::<TaskStatus>().map_err(|_| invalid_value(raw))
}

/// Validates a task payload against the configured limits.
///
/// Returns the validated draft, or every violation keyed by field name.
pub fn validate_task(
    request: TaskRequest,
    limits: &ValidationLimits,
) -> Result<TaskDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = match request.title {
        Some(title) if !title.trim().is_empty() => {
            if title.chars().count() > limits.title_max_length {
                errors.insert(
                    "title".to_string(),
                    format!("size must be between 1 and {}", limits.title_max_length),
                );
            }
            title
        }
        _ => {
            errors.insert("title".to_string(), BLANK_MESSAGE.to_string());
            String::new()
        }
    };

    if let Some(description) = &request.description {
        if description.chars().count() > limits.description_max_length {
            errors.insert(
                "description".to_string(),
                format!(
                    "size must be between 0 and {}",
                    limits.description_max_length
                ),
            );
        }
    }

    let status = match request.status.as_deref().map(parse_status) {
        Some(Ok(status)) => Some(status),
        Some(Err(message)) => {
            errors.insert("status".to_string(), message);
            None
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(TaskDraft {
        title,
        description: request.description,
        status,
    })
}

/// Validates a raw path segment as a task ID: an integer of at least 1.
pub fn validate_task_id(raw: &str) -> Result<i32, ApiError> {
    match raw.parse::<i32>() {
        Ok(id) if id >= 1 => Ok(id),
        Ok(_) => Err(ApiError::new(ErrorKind::BadResourceId).with_field("id", MIN_ID_MESSAGE)),
        Err(_) => Err(ApiError::new(ErrorKind::BadResourceId).with_field("id", invalid_value(raw))),
    }
}

/// Parses listing parameters. Empty values count as absent.
pub fn validate_filter(
    query: &TaskQuery,
    precision: CreatedAtPrecision,
) -> Result<TaskFilter, FieldErrors> {
    let mut errors = FieldErrors::new();

    let status = match query.status.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => match parse_status(raw) {
            Ok(status) => Some(status),
            Err(message) => {
                errors.insert("status".to_string(), message);
                None
            }
        },
        None => None,
    };

    let created_at = match query.created_at.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            let parsed = precision.parse_filter(raw);
            if parsed.is_none() {
                errors.insert("createdAt".to_string(), invalid_value(raw));
            }
            parsed
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(TaskFilter { status, created_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(title: Option<&str>, description: Option<&str>, status: Option<&str>) -> TaskRequest {
        TaskRequest {
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn can_accept_minimal_payload() {
        let draft = validate_task(request(Some("Buy milk"), None, None), &ValidationLimits::default())
            .unwrap();

        assert_eq!(draft.title, "Buy milk");
        assert_eq!(draft.status, None);
        assert_eq!(draft.into_details().status, TaskStatus::New);
    }

    #[test]
    fn can_reject_missing_and_blank_titles() {
        for title in [None, Some(""), Some("   ")] {
            let errors =
                validate_task(request(title, None, None), &ValidationLimits::default()).unwrap_err();
            assert_eq!(errors.get("title").map(String::as_str), Some(BLANK_MESSAGE));
        }
    }

    #[test]
    fn can_report_every_violation_at_once() {
        let limits = ValidationLimits {
            title_max_length: 5,
            description_max_length: 3,
        };

        let errors = validate_task(
            request(Some("too long"), Some("four"), Some("URGENT")),
            &limits,
        )
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors["title"], "size must be between 1 and 5");
        assert_eq!(errors["description"], "size must be between 0 and 3");
        assert_eq!(errors["status"], "Invalid value: 'URGENT'");
    }

    #[test]
    fn can_count_characters_rather_than_bytes() {
        let limits = ValidationLimits {
            title_max_length: 3,
            description_max_length: 3,
        };

        let draft = validate_task(request(Some("äöü"), Some("ßßß"), None), &limits);

        assert!(draft.is_ok());
    }

    #[test]
    fn can_validate_task_ids() {
        assert_eq!(validate_task_id("12"), Ok(12));

        for raw in ["0", "-3", "abc", "1.5", "99999999999"] {
            let error = validate_task_id(raw).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::BadResourceId, "{raw}");
            assert!(error.response().data.as_ref().unwrap().contains_key("id"));
        }
    }

    #[test]
    fn can_parse_listing_filters() {
        let query = TaskQuery {
            status: Some("DONE".to_string()),
            created_at: Some("2024-12-24".to_string()),
        };

        let filter = validate_filter(&query, CreatedAtPrecision::Date).unwrap();

        assert_eq!(filter.status, Some(TaskStatus::Done));
        assert_eq!(
            filter.created_at,
            Some(CreatedAtFilter::Day(
                NaiveDate::from_ymd_opt(2024, 12, 24).unwrap()
            ))
        );
    }

    #[test]
    fn can_treat_empty_parameters_as_absent() {
        let query = TaskQuery {
            status: Some(String::new()),
            created_at: Some(String::new()),
        };

        assert_eq!(
            validate_filter(&query, CreatedAtPrecision::Date),
            Ok(TaskFilter::default())
        );
    }

    #[test]
    fn can_report_both_bad_parameters() {
        let query = TaskQuery {
            status: Some("LATER".to_string()),
            created_at: Some("yesterday".to_string()),
        };

        let errors = validate_filter(&query, CreatedAtPrecision::Date).unwrap_err();

        assert_eq!(errors["status"], "Invalid value: 'LATER'");
        assert_eq!(errors["createdAt"], "Invalid value: 'yesterday'");
    }
}

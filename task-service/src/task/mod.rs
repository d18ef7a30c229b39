use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::DbErr;
use serde::Deserialize;
use std::sync::Arc;
use task_model::{CreatedAt, TaskDetails, TaskResponse};

pub mod api;
pub mod repository;
pub mod validation;

use repository::{CreatedAtFilter, TaskRepository};
use validation::{TaskDraft, TaskFilter};

/// A persisted task.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: i32,
    details: TaskDetails,
    created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: i32, details: TaskDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            details,
            created_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the title, description and status of the task.
    pub fn details(&self) -> &TaskDetails {
        &self.details
    }

    /// Returns when the store created the task.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces the caller controlled fields, leaving `id` and `created_at` untouched.
    pub fn with_details(self, details: TaskDetails) -> Self {
        Self { details, ..self }
    }

    /// Converts the task into its wire representation.
    pub fn into_response(self, precision: CreatedAtPrecision) -> TaskResponse {
        TaskResponse {
            id: self.id,
            details: self.details,
            created_at: precision.render(self.created_at),
        }
    }
}

/// Granularity at which `createdAt` is rendered and filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatedAtPrecision {
    #[default]
    Date,
    DateTime,
}

impl CreatedAtPrecision {
    pub fn render(self, created_at: DateTime<Utc>) -> CreatedAt {
        match self {
            CreatedAtPrecision::Date => CreatedAt::Date(created_at.date_naive()),
            CreatedAtPrecision::DateTime => CreatedAt::DateTime(created_at),
        }
    }

    /// Parses a `createdAt` query value: `YYYY-MM-DD` for dates, RFC 3339 for date-times.
    pub fn parse_filter(self, raw: &str) -> Option<CreatedAtFilter> {
        match self {
            CreatedAtPrecision::Date => raw
                .parse::<NaiveDate>()
                .ok()
                .map(CreatedAtFilter::Day),
            CreatedAtPrecision::DateTime => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|instant| CreatedAtFilter::Instant(instant.with_timezone(&Utc))),
        }
    }
}

/// Returns the first instant of `day` in UTC.
pub(crate) fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Represents a task not found error.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService").finish_non_exhaustive()
    }
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    /// Creates a new task, applying the default status when none was given.
    ///
    /// The store assigns the ID and creation timestamp.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, TaskServiceError> {
        tracing::info!("Creating task with title: {}", draft.title);
        let task = self.repository.save(draft.into_details()).await?;
        tracing::info!(
            "Task with title \"{}\" created with ID: {}",
            task.details().title,
            task.id()
        );
        Ok(task)
    }

    /// Lists tasks matching every supplied filter.
    ///
    /// With no filters, every task is returned. With both, only tasks matching
    /// the status and the creation date are returned.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, TaskServiceError> {
        tracing::info!(
            "Fetching tasks with status: {:?} and createdAt: {:?}",
            filter.status,
            filter.created_at
        );
        let tasks = match (filter.status, filter.created_at) {
            (None, None) => self.repository.find_all().await?,
            (Some(status), Some(created_at)) => {
                self.repository
                    .find_by_status_and_created_at(status, created_at)
                    .await?
            }
            (Some(status), None) => self.repository.find_by_status(status).await?,
            (None, Some(created_at)) => self.repository.find_by_created_at(created_at).await?,
        };
        tracing::info!("Found {} tasks", tasks.len());
        Ok(tasks)
    }

    /// Retrieves a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        tracing::info!("Fetching task with ID: {}", id);
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Overwrites title, description and status of an existing task.
    ///
    /// An absent status falls back to the default rather than being left as is.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&self, id: i32, draft: TaskDraft) -> Result<Task, TaskServiceError> {
        tracing::info!("Updating task with ID: {}", id);
        let task = self.get_task_by_id(id).await?;
        let updated = self
            .repository
            .update(task.with_details(draft.into_details()))
            .await?;
        tracing::info!("Task with ID: {} updated successfully", updated.id());
        Ok(updated)
    }

    /// Deletes a task by its ID. Fails with not found when it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: i32) -> Result<(), TaskServiceError> {
        tracing::info!("Deleting task with ID: {}", id);
        if !self.repository.exists_by_id(id).await? {
            tracing::warn!("Task with ID: {} not found", id);
            return Err(TaskServiceError::TaskNotFound(id));
        }
        self.repository.delete_by_id(id).await?;
        tracing::info!("Task with ID: {} deleted successfully", id);
        Ok(())
    }
}

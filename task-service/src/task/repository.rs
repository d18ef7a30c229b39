use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use task_model::{TaskDetails, TaskStatus};

use super::{Task, start_of_day};
use crate::entities::task;

/// Which creation timestamps a listing should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedAtFilter {
    /// Any instant within the UTC calendar day.
    Day(NaiveDate),
    /// Exactly this instant.
    Instant(DateTime<Utc>),
}

/// Persistence collaborator for tasks.
///
/// `save` is the only place an ID and a creation timestamp are assigned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn save(&self, details: TaskDetails) -> Result<Task, DbErr>;
    async fn update(&self, task: Task) -> Result<Task, DbErr>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, DbErr>;
    async fn exists_by_id(&self, id: i32) -> Result<bool, DbErr>;
    async fn delete_by_id(&self, id: i32) -> Result<(), DbErr>;
    async fn find_all(&self) -> Result<Vec<Task>, DbErr>;
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, DbErr>;
    async fn find_by_created_at(&self, created_at: CreatedAtFilter) -> Result<Vec<Task>, DbErr>;
    async fn find_by_status_and_created_at(
        &self,
        status: TaskStatus,
        created_at: CreatedAtFilter,
    ) -> Result<Vec<Task>, DbErr>;
}

impl From<TaskStatus> for task::Status {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::New => task::Status::New,
            TaskStatus::InProgress => task::Status::InProgress,
            TaskStatus::Done => task::Status::Done,
        }
    }
}

impl From<task::Status> for TaskStatus {
    fn from(status: task::Status) -> Self {
        match status {
            task::Status::New => TaskStatus::New,
            task::Status::InProgress => TaskStatus::InProgress,
            task::Status::Done => TaskStatus::Done,
        }
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            TaskDetails {
                title: model.title,
                description: model.description,
                status: model.status.into(),
            },
            model.created_at,
        )
    }
}

fn created_at_condition(filter: CreatedAtFilter) -> Condition {
    match filter {
        CreatedAtFilter::Day(day) => {
            let condition = Condition::all().add(task::Column::CreatedAt.gte(start_of_day(day)));
            match day.succ_opt() {
                Some(next_day) => condition.add(task::Column::CreatedAt.lt(start_of_day(next_day))),
                None => condition,
            }
        }
        CreatedAtFilter::Instant(instant) => {
            Condition::all().add(task::Column::CreatedAt.eq(instant))
        }
    }
}

/// SeaORM backed task store.
#[derive(Clone, Debug)]
pub struct SeaOrmTaskRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmTaskRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_matching(&self, condition: Condition) -> Result<Vec<Task>, DbErr> {
        let tasks = task::Entity::find()
            .filter(condition)
            .order_by_asc(task::Column::Id)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }
}

#[async_trait]
impl TaskRepository for SeaOrmTaskRepository {
    #[tracing::instrument(skip(self))]
    async fn save(&self, details: TaskDetails) -> Result<Task, DbErr> {
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(details.title),
            description: ActiveValue::Set(details.description),
            status: ActiveValue::Set(details.status.into()),
            created_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db.as_ref()).await?;
        Ok(Task::from(created_model))
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, task: Task) -> Result<Task, DbErr> {
        let details = task.details().clone();
        let active_model = task::ActiveModel {
            id: ActiveValue::Unchanged(task.id()),
            title: ActiveValue::Set(details.title),
            description: ActiveValue::Set(details.description),
            status: ActiveValue::Set(details.status.into()),
            created_at: ActiveValue::NotSet,
        };
        let updated_model = active_model.update(self.db.as_ref()).await?;
        Ok(Task::from(updated_model))
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, DbErr> {
        let model = task::Entity::find_by_id(id).one(self.db.as_ref()).await?;
        Ok(model.map(Task::from))
    }

    #[tracing::instrument(skip(self))]
    async fn exists_by_id(&self, id: i32) -> Result<bool, DbErr> {
        let count = task::Entity::find_by_id(id).count(self.db.as_ref()).await?;
        Ok(count > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_by_id(&self, id: i32) -> Result<(), DbErr> {
        task::Entity::delete_by_id(id).exec(self.db.as_ref()).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Task>, DbErr> {
        self.find_matching(Condition::all()).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, DbErr> {
        let status: task::Status = status.into();
        self.find_matching(Condition::all().add(task::Column::Status.eq(status)))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_created_at(&self, created_at: CreatedAtFilter) -> Result<Vec<Task>, DbErr> {
        self.find_matching(created_at_condition(created_at)).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_status_and_created_at(
        &self,
        status: TaskStatus,
        created_at: CreatedAtFilter,
    ) -> Result<Vec<Task>, DbErr> {
        let status: task::Status = status.into();
        self.find_matching(
            Condition::all()
                .add(task::Column::Status.eq(status))
                .add(created_at_condition(created_at)),
        )
        .await
    }
}

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::sync::Arc;
use task_service::config::Config;
use task_service::entities::task;
use task_service::task::TaskService;
use task_service::task::repository::SeaOrmTaskRepository;
use tower::ServiceExt;

/// Opens a fresh in-memory database with the schema applied.
///
/// The pool is pinned to a single connection because every SQLite
/// in-memory connection is its own database.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Test context for endpoint tests.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub app: Router,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(Config::with_db_url("sqlite::memory:")).await
    }

    pub async fn with_config(config: Config) -> anyhow::Result<Self> {
        let db = Arc::new(setup_db().await?);
        let service = TaskService::new(Arc::new(SeaOrmTaskRepository::new(db.clone())));
        let app = task_service::web::create_app(&config, service)?;
        Ok(Self { db, app })
    }

    /// Sends one request and returns the status and the parsed JSON body
    /// (`Null` for an empty body).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        if bytes.is_empty() {
            return (status, serde_json::Value::Null);
        }
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

/// Inserts a task row directly, with a known creation instant.
pub async fn insert_task(
    db: &DatabaseConnection,
    title: &str,
    status: task::Status,
    created_at: DateTime<Utc>,
) -> anyhow::Result<task::Model> {
    let model = task::ActiveModel {
        title: Set(title.to_string()),
        description: Set(None),
        status: Set(status),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

/// Three tasks over two statuses and two days.
pub async fn seed_fixture(db: &DatabaseConnection) -> anyhow::Result<()> {
    insert_task(db, "Buy milk", task::Status::New, at("2024-12-24T09:00:00Z")).await?;
    insert_task(db, "Wrap presents", task::Status::Done, at("2024-12-24T15:30:00Z")).await?;
    insert_task(db, "Visit family", task::Status::New, at("2024-12-25T08:00:00Z")).await?;
    Ok(())
}

pub fn ids(body: &serde_json::Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_i64().unwrap())
        .collect()
}

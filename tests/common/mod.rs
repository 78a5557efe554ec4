#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{NaiveDate, Utc};
use property_lending::{
    config::AppConfig,
    db,
    entities::{
        borrowing_record,
        item::{self, ItemStatus},
        BorrowingRecord, Item,
    },
    events::{self, EventSender},
    services::borrowing::{BorrowRequest, ReturnRequest},
    AppState,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Application state over a throwaway SQLite file with migrations applied.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_connections(1).await
    }

    /// Same as [`TestApp::new`] with a pool of `connections` connections, so
    /// concurrent operations really contend on the database.
    pub async fn with_connections(connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_file = dir.path().join("lending.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;
        cfg.txn_retry_backoff_ms = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, Arc::new(EventSender::new(event_tx)));
        let router = property_lending::app_router(state.clone());

        Self {
            state,
            router,
            _event_task: event_task,
            _dir: dir,
        }
    }

    /// Inserts an item row directly, bypassing id generation.
    pub async fn seed_item(&self, id: &str, quantity: i32, status: ItemStatus) -> item::Model {
        item::ActiveModel {
            id: Set(id.to_string()),
            name: Set(format!("Item {}", id)),
            description: Set(String::new()),
            category: Set("Electronics".to_string()),
            department: Set("IT".to_string()),
            quantity: Set(quantity),
            status: Set(status),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("failed to seed item")
    }

    pub async fn item(&self, id: &str) -> item::Model {
        Item::find_by_id(id.to_string())
            .one(self.state.db.as_ref())
            .await
            .expect("item lookup failed")
            .expect("item should exist")
    }

    pub async fn record(&self, id: i32) -> borrowing_record::Model {
        BorrowingRecord::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("record lookup failed")
            .expect("record should exist")
    }

    pub async fn records_for(&self, item_id: &str) -> Vec<borrowing_record::Model> {
        BorrowingRecord::find()
            .filter(borrowing_record::Column::ItemId.eq(item_id))
            .all(self.state.db.as_ref())
            .await
            .expect("record listing failed")
    }

    /// Sends a request through the full router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };
        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub fn borrow_request(item_id: &str, quantity: i32) -> BorrowRequest {
    BorrowRequest {
        item_id: item_id.to_string(),
        quantity,
        purpose: "Class presentation".to_string(),
        expected_return_date: NaiveDate::from_ymd_opt(2030, 6, 1).expect("valid date"),
        department: "IT".to_string(),
        borrower_name: None,
        borrower_email: None,
    }
}

pub fn return_request(item_id: &str, condition: &str) -> ReturnRequest {
    ReturnRequest {
        item_id: item_id.to_string(),
        condition: condition.to_string(),
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body should be json")
}

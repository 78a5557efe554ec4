//! Property Lending Library
//!
//! Borrowing transaction engine and JSON API for a shared pool of school
//! property: items with a quantity ledger, borrow requests with an approval
//! gate, and returns.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires the services over a shared pool and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let retry = db::RetryConfig::from(&config);
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), retry);
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }

    pub fn item_service(&self) -> Arc<services::items::ItemService> {
        self.services.items.clone()
    }

    pub fn borrowing_service(&self) -> Arc<services::borrowing::BorrowingService> {
        self.services.borrowing.clone()
    }

    pub fn query_service(&self) -> Arc<services::queries::QueryService> {
        self.services.queries.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes served under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    let items = Router::new()
        .route(
            "/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route(
            "/items/:id",
            get(handlers::items::get_item)
                .put(handlers::items::update_item)
                .delete(handlers::items::delete_item),
        );

    let borrowings = Router::new()
        .route(
            "/borrowings",
            get(handlers::borrowings::list_borrowings).post(handlers::borrowings::borrow_item),
        )
        .route(
            "/borrowings/return",
            post(handlers::borrowings::return_item),
        )
        .route("/borrowings/:id", get(handlers::borrowings::get_borrowing))
        .route(
            "/borrowings/:id/approve",
            post(handlers::borrowings::approve_borrowing),
        )
        .route(
            "/borrowings/:id/reject",
            post(handlers::borrowings::reject_borrowing),
        );

    let dashboard = Router::new()
        .route("/dashboard/stats", get(handlers::dashboard::stats))
        .route("/dashboard/activity", get(handlers::dashboard::recent_activity));

    Router::new().merge(items).merge(borrowings).merge(dashboard)
}

/// Full application router: the v1 API, health checks and the OpenAPI
/// document, wrapped in request-id and HTTP tracing layers.
pub fn app_router(state: AppState) -> Router {
    let db = state.db.clone();

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .nest("/health", health::health_routes(db))
        .merge(openapi::openapi_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}

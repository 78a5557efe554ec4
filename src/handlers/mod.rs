pub mod borrowings;
pub mod common;
pub mod dashboard;
pub mod items;

use crate::db::{DbPool, RetryConfig};
use crate::events::EventSender;
use crate::services::{borrowing::BorrowingService, items::ItemService, queries::QueryService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub items: Arc<ItemService>,
    pub borrowing: Arc<BorrowingService>,
    pub queries: Arc<QueryService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, retry: RetryConfig) -> Self {
        let items = Arc::new(ItemService::new(
            db_pool.clone(),
            event_sender.clone(),
            retry.clone(),
        ));
        let borrowing = Arc::new(BorrowingService::new(
            db_pool.clone(),
            event_sender,
            retry,
        ));
        let queries = Arc::new(QueryService::new(db_pool));

        Self {
            items,
            borrowing,
            queries,
        }
    }
}

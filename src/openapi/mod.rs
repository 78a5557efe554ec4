use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Property Lending API",
        version = "1.0.0",
        description = r#"
# Property Lending API

Borrowing and returning of shared school property.

Stock is reserved as soon as a borrow request is submitted. Approving a
request does not move stock; rejecting it or returning the item restores it.

## Error Handling

Failures use one body shape with a stable `code`:

```json
{
  "error": "Unprocessable Entity",
  "code": "insufficient_quantity",
  "message": "Insufficient quantity: item IT001 has 1 available, 2 requested",
  "request_id": "4d0c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "items", description = "Item catalogue and administration"),
        (name = "borrowings", description = "Borrow, approve, reject and return"),
        (name = "dashboard", description = "Counters and recent activity")
    ),
    paths(
        // Items
        crate::handlers::items::list_items,
        crate::handlers::items::create_item,
        crate::handlers::items::get_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,

        // Borrowings
        crate::handlers::borrowings::list_borrowings,
        crate::handlers::borrowings::get_borrowing,
        crate::handlers::borrowings::borrow_item,
        crate::handlers::borrowings::approve_borrowing,
        crate::handlers::borrowings::reject_borrowing,
        crate::handlers::borrowings::return_item,

        // Dashboard
        crate::handlers::dashboard::stats,
        crate::handlers::dashboard::recent_activity,
    ),
    components(
        schemas(
            crate::entities::item::Model,
            crate::entities::item::ItemStatus,
            crate::entities::borrowing_record::Model,
            crate::entities::borrowing_record::BorrowingStatus,
            crate::services::items::ItemInput,
            crate::services::borrowing::BorrowRequest,
            crate::services::borrowing::ReturnRequest,
            crate::services::queries::BorrowingRecordView,
            crate::services::queries::DashboardStats,
            crate::services::queries::ActivityEntry,
            crate::ResponseMeta,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Property Lending API"));
        for path in [
            "/api/v1/items",
            "/api/v1/items/{id}",
            "/api/v1/borrowings",
            "/api/v1/borrowings/{id}/approve",
            "/api/v1/borrowings/{id}/reject",
            "/api/v1/borrowings/return",
            "/api/v1/dashboard/stats",
            "/api/v1/dashboard/activity",
        ] {
            assert!(json.contains(path), "missing {}", path);
        }
    }
}

use super::common::{created_response, JsonBody};
use crate::{
    entities::item,
    errors::ServiceError,
    services::{items::ItemInput, queries::ItemFilter},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
};

#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemFilter),
    responses(
        (status = 200, description = "Items, newest first", body = ApiResponse<Vec<item::Model>>,
            headers(("X-Request-Id" = String, description = "Unique request id for tracing"))
        ),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 503, description = "Storage unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> ApiResult<Vec<item::Model>> {
    let items = state.query_service().list_items(&filter).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = ItemInput,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<item::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 503, description = "Storage unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ItemInput>,
) -> Result<Response, ServiceError> {
    let created = state.item_service().create_item(payload).await?;
    Ok(created_response(ApiResponse::with_message(
        created,
        "Item created successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item returned", body = ApiResponse<item::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<item::Model> {
    let item = state.query_service().get_item(&id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    request_body = ItemInput,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<item::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ItemInput>,
) -> ApiResult<item::Model> {
    let updated = state.item_service().update_item(&id, payload).await?;
    Ok(Json(ApiResponse::with_message(
        updated,
        "Item updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item still has pending or approved borrowings", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    state.item_service().delete_item(&id).await?;
    Ok(Json(ApiResponse::with_message(
        serde_json::json!({ "item_id": id }),
        "Item deleted successfully",
    )))
}

use super::common::{created_response, JsonBody};
use crate::{
    entities::borrowing_record,
    errors::ServiceError,
    services::{
        borrowing::{BorrowRequest, ReturnRequest},
        queries::{BorrowingFilter, BorrowingRecordView},
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
};
use tracing::info;

#[utoipa::path(
    get,
    path = "/api/v1/borrowings",
    params(BorrowingFilter),
    responses(
        (status = 200, description = "Borrowing records with item details", body = ApiResponse<Vec<BorrowingRecordView>>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "borrowings"
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    Query(filter): Query<BorrowingFilter>,
) -> ApiResult<Vec<BorrowingRecordView>> {
    let records = state
        .query_service()
        .list_borrowing_records(&filter)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

#[utoipa::path(
    get,
    path = "/api/v1/borrowings/{id}",
    params(("id" = i32, Path, description = "Borrowing record id")),
    responses(
        (status = 200, description = "Borrowing record", body = ApiResponse<BorrowingRecordView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "borrowings"
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<BorrowingRecordView> {
    let record = state.query_service().get_record(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// Submits a borrow request. Stock is reserved immediately; the record
/// starts out pending.
#[utoipa::path(
    post,
    path = "/api/v1/borrowings",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Borrow request recorded", body = ApiResponse<borrowing_record::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Item unavailable or insufficient quantity", body = crate::errors::ErrorResponse)
    ),
    tag = "borrowings"
)]
pub async fn borrow_item(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<BorrowRequest>,
) -> Result<Response, ServiceError> {
    let record = state.borrowing_service().borrow(payload).await?;
    Ok(created_response(ApiResponse::with_message(
        record,
        "Borrowing request submitted successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/borrowings/{id}/approve",
    params(("id" = i32, Path, description = "Borrowing record id")),
    responses(
        (status = 200, description = "Request approved", body = ApiResponse<borrowing_record::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Record is not pending", body = crate::errors::ErrorResponse)
    ),
    tag = "borrowings"
)]
pub async fn approve_borrowing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<borrowing_record::Model> {
    let record = state.borrowing_service().approve(id).await?;
    info!(record_id = id, "Borrowing approved via API");
    Ok(Json(ApiResponse::with_message(
        record,
        "Borrowing request approved",
    )))
}

/// Rejects a pending request and releases its reserved quantity.
#[utoipa::path(
    post,
    path = "/api/v1/borrowings/{id}/reject",
    params(("id" = i32, Path, description = "Borrowing record id")),
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<borrowing_record::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Record is not pending", body = crate::errors::ErrorResponse)
    ),
    tag = "borrowings"
)]
pub async fn reject_borrowing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<borrowing_record::Model> {
    let record = state.borrowing_service().reject(id).await?;
    info!(record_id = id, "Borrowing rejected via API");
    Ok(Json(ApiResponse::with_message(
        record,
        "Borrowing request rejected",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/borrowings/return",
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Item returned", body = ApiResponse<borrowing_record::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "No approved loan to return", body = crate::errors::ErrorResponse)
    ),
    tag = "borrowings"
)]
pub async fn return_item(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ReturnRequest>,
) -> ApiResult<borrowing_record::Model> {
    let record = state.borrowing_service().return_item(payload).await?;
    Ok(Json(ApiResponse::with_message(
        record,
        "Item returned successfully",
    )))
}

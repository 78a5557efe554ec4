use crate::{
    services::queries::{ActivityEntry, DashboardStats},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_ACTIVITY_LIMIT: u64 = 10;
const MAX_ACTIVITY_LIMIT: u64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityParams {
    /// Number of entries, 1 to 100 (default 10)
    pub limit: Option<u64>,
}

impl ActivityParams {
    fn effective_limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT)
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<DashboardStats>),
        (status = 503, description = "Storage unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.query_service().dashboard_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/activity",
    params(ActivityParams),
    responses(
        (status = 200, description = "Recently touched borrowing records", body = ApiResponse<Vec<ActivityEntry>>)
    ),
    tag = "dashboard"
)]
pub async fn recent_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> ApiResult<Vec<ActivityEntry>> {
    let entries = state
        .query_service()
        .recent_activity(params.effective_limit())
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

//! Read side over items and borrowing records. Nothing here writes.

use crate::{
    db::DbPool,
    entities::{
        borrowing_record::{self, BorrowingStatus},
        item::{self, ItemStatus},
        BorrowingRecord, Item,
    },
    errors::ServiceError,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveEnum, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

/// Filters for the item list. `status=all` or an empty value disables the
/// status filter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemFilter {
    /// `available`, `unavailable`, `borrowed` or `all`
    #[serde(default, alias = "type")]
    pub status: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Substring of the item name or id
    #[serde(default)]
    pub search: Option<String>,
}

/// Filters for the borrowing record list.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BorrowingFilter {
    /// `pending`, `approved`, `rejected`, `returned` or `all`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// A borrowing record joined with the name and category of its item.
///
/// The item columns are empty when the item has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct BorrowingRecordView {
    pub id: i32,
    pub item_id: String,
    pub item_name: Option<String>,
    pub item_category: Option<String>,
    pub borrower_name: String,
    pub borrower_email: String,
    pub quantity: i32,
    pub purpose: String,
    pub expected_return_date: NaiveDate,
    pub department: String,
    pub status: BorrowingStatus,
    pub return_date: Option<DateTime<Utc>>,
    pub return_condition: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Dashboard counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_items: u64,
    pub available_items: u64,
    pub borrowed_items: u64,
    pub pending_requests: u64,
}

/// One line of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActivityEntry {
    pub record_id: i32,
    pub action: String,
    pub item_id: String,
    pub item_name: Option<String>,
    pub borrower_name: String,
    pub department: String,
    pub at: DateTime<Utc>,
}

impl From<BorrowingRecordView> for ActivityEntry {
    fn from(view: BorrowingRecordView) -> Self {
        let action = match view.status {
            BorrowingStatus::Pending => "Borrow Requested",
            BorrowingStatus::Approved => "Request Approved",
            BorrowingStatus::Rejected => "Request Rejected",
            BorrowingStatus::Returned => "Item Returned",
        };
        Self {
            record_id: view.id,
            action: action.to_string(),
            at: view.updated_at.unwrap_or(view.created_at),
            item_id: view.item_id,
            item_name: view.item_name,
            borrower_name: view.borrower_name,
            department: view.department,
        }
    }
}

/// Parses an optional status filter; `None`, empty and `all` mean "any".
fn parse_status_filter<S>(raw: Option<&str>) -> Result<Option<S>, ServiceError>
where
    S: FromStr,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => S::from_str(value)
            .map(Some)
            .map_err(|_| ServiceError::ValidationError(format!("unknown status '{}'", value))),
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct QueryService {
    db_pool: Arc<DbPool>,
}

impl QueryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<item::Model>, ServiceError> {
        let status = parse_status_filter::<ItemStatus>(filter.status.as_deref())?;
        let mut query = Item::find();

        if let Some(status) = status {
            query = query.filter(item::Column::Status.eq(status.to_value()));
        }
        if let Some(department) = non_empty(filter.department.as_deref()) {
            query = query.filter(item::Column::Department.eq(department));
        }
        if let Some(search) = non_empty(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(item::Column::Name.contains(search))
                    .add(item::Column::Id.contains(search)),
            );
        }

        query
            .order_by_desc(item::Column::CreatedAt)
            .order_by_desc(item::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: &str) -> Result<item::Model, ServiceError> {
        Item::find_by_id(item_id.to_string())
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_borrowing_records(
        &self,
        filter: &BorrowingFilter,
    ) -> Result<Vec<BorrowingRecordView>, ServiceError> {
        let status = parse_status_filter::<BorrowingStatus>(filter.status.as_deref())?;
        let mut query = joined_records();

        if let Some(status) = status {
            query = query.filter(borrowing_record::Column::Status.eq(status.to_value()));
        }
        if let Some(department) = non_empty(filter.department.as_deref()) {
            query = query.filter(borrowing_record::Column::Department.eq(department));
        }

        query
            .order_by_desc(borrowing_record::Column::CreatedAt)
            .order_by_desc(borrowing_record::Column::Id)
            .into_model::<BorrowingRecordView>()
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_record(&self, record_id: i32) -> Result<BorrowingRecordView, ServiceError> {
        joined_records()
            .filter(borrowing_record::Column::Id.eq(record_id))
            .into_model::<BorrowingRecordView>()
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Borrowing record {} not found", record_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = self.db_pool.as_ref();

        let total_items = Item::find().count(db).await.map_err(ServiceError::db_error)?;
        let available_items = Item::find()
            .filter(item::Column::Status.eq(ItemStatus::Available.to_value()))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let borrowed_items = Item::find()
            .filter(item::Column::Status.eq(ItemStatus::Borrowed.to_value()))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let pending_requests = BorrowingRecord::find()
            .filter(borrowing_record::Column::Status.eq(BorrowingStatus::Pending.to_value()))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(DashboardStats {
            total_items,
            available_items,
            borrowed_items,
            pending_requests,
        })
    }

    /// Most recently touched borrowing records, newest first.
    #[instrument(skip(self))]
    pub async fn recent_activity(&self, limit: u64) -> Result<Vec<ActivityEntry>, ServiceError> {
        let views = joined_records()
            .order_by_desc(borrowing_record::Column::UpdatedAt)
            .order_by_desc(borrowing_record::Column::Id)
            .limit(limit)
            .into_model::<BorrowingRecordView>()
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(views.into_iter().map(ActivityEntry::from).collect())
    }
}

fn joined_records() -> Select<BorrowingRecord> {
    BorrowingRecord::find()
        .column_as(item::Column::Name, "item_name")
        .column_as(item::Column::Category, "item_category")
        .join(JoinType::LeftJoin, borrowing_record::Relation::Item.def())
}

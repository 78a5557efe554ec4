//! Borrowing transaction engine.
//!
//! Every public operation runs as one database transaction and is re-run from
//! scratch while it fails with a retryable error. Each transaction takes the
//! write lock before its first read, then the item row, then the record.

use crate::{
    db::{self, with_retry, DbPool, RetryConfig},
    entities::{
        borrowing_record::{self, BorrowingStatus},
        item::{self, ItemStatus},
        BorrowingRecord,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::ledger,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    NotSet, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

const DEFAULT_BORROWER_NAME: &str = "Unknown";

/// Borrow request as submitted by a borrower.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[validate(length(min = 1, max = 64))]
    pub item_id: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 1))]
    pub purpose: String,
    #[serde(alias = "returnDate")]
    pub expected_return_date: NaiveDate,
    #[validate(length(min = 1, max = 255))]
    pub department: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub borrower_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub borrower_email: Option<String>,
}

impl BorrowRequest {
    fn normalized(mut self) -> Self {
        self.item_id = self.item_id.trim().to_string();
        self.department = self.department.trim().to_string();
        self.purpose = self.purpose.trim().to_string();
        self.borrower_name = Some(
            self.borrower_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_BORROWER_NAME)
                .to_string(),
        );
        self.borrower_email = Some(
            self.borrower_email
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
        );
        self
    }
}

/// Return of the most recent approved loan of an item.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[validate(length(min = 1, max = 64))]
    pub item_id: String,
    #[validate(length(min = 1, max = 255))]
    pub condition: String,
}

/// Service owning every write to borrowing records and, through
/// [`ledger`], to item quantities.
#[derive(Clone)]
pub struct BorrowingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    retry: RetryConfig,
}

impl BorrowingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, retry: RetryConfig) -> Self {
        Self {
            db_pool,
            event_sender,
            retry,
        }
    }

    /// Creates a pending record and reserves its quantity immediately.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, quantity = request.quantity))]
    pub async fn borrow(
        &self,
        request: BorrowRequest,
    ) -> Result<borrowing_record::Model, ServiceError> {
        let request = request.normalized();
        request.validate()?;

        let record = with_retry(&self.retry, "borrow", || self.try_borrow(request.clone())).await?;

        info!(record_id = record.id, "Borrow request recorded");
        self.event_sender
            .publish(Event::BorrowRequested {
                record_id: record.id,
                item_id: record.item_id.clone(),
                quantity: record.quantity,
                department: record.department.clone(),
            })
            .await;

        Ok(record)
    }

    async fn try_borrow(
        &self,
        request: BorrowRequest,
    ) -> Result<borrowing_record::Model, ServiceError> {
        self.db_pool
            .transaction::<_, borrowing_record::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    db::acquire_write_lock(txn).await?;
                    let item = ledger::get_for_update(txn, &request.item_id).await?;
                    ensure_loanable(&item, request.quantity)?;

                    let now = Utc::now();
                    let record = borrowing_record::ActiveModel {
                        id: NotSet,
                        item_id: Set(item.id.clone()),
                        borrower_name: Set(request.borrower_name.unwrap_or_default()),
                        borrower_email: Set(request.borrower_email.unwrap_or_default()),
                        quantity: Set(request.quantity),
                        purpose: Set(request.purpose),
                        expected_return_date: Set(request.expected_return_date),
                        department: Set(request.department),
                        status: Set(BorrowingStatus::Pending),
                        return_date: Set(None),
                        return_condition: Set(None),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    ledger::adjust_quantity(txn, &item, -request.quantity).await?;
                    Ok(record)
                })
            })
            .await
            .map_err(ServiceError::from)
    }

    /// `pending → approved`. The ledger is not touched.
    #[instrument(skip(self))]
    pub async fn approve(&self, record_id: i32) -> Result<borrowing_record::Model, ServiceError> {
        let record = with_retry(&self.retry, "approve", || self.try_approve(record_id)).await?;

        info!(item_id = %record.item_id, "Borrow request approved");
        self.event_sender
            .publish(Event::BorrowApproved {
                record_id: record.id,
                item_id: record.item_id.clone(),
            })
            .await;

        Ok(record)
    }

    async fn try_approve(&self, record_id: i32) -> Result<borrowing_record::Model, ServiceError> {
        self.db_pool
            .transaction::<_, borrowing_record::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    db::acquire_write_lock(txn).await?;
                    let record = find_record(txn, record_id).await?;
                    transition(txn, &record, BorrowingStatus::Approved, None).await
                })
            })
            .await
            .map_err(ServiceError::from)
    }

    /// `pending → rejected`, restocking the reserved quantity.
    #[instrument(skip(self))]
    pub async fn reject(&self, record_id: i32) -> Result<borrowing_record::Model, ServiceError> {
        let record = with_retry(&self.retry, "reject", || self.try_reject(record_id)).await?;

        info!(item_id = %record.item_id, quantity = record.quantity, "Borrow request rejected");
        self.event_sender
            .publish(Event::BorrowRejected {
                record_id: record.id,
                item_id: record.item_id.clone(),
                quantity: record.quantity,
            })
            .await;

        Ok(record)
    }

    async fn try_reject(&self, record_id: i32) -> Result<borrowing_record::Model, ServiceError> {
        self.db_pool
            .transaction::<_, borrowing_record::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    db::acquire_write_lock(txn).await?;
                    let record = find_record(txn, record_id).await?;
                    ensure_transition(&record, BorrowingStatus::Rejected)?;

                    let item = ledger::get_for_update(txn, &record.item_id).await?;
                    let rejected =
                        transition(txn, &record, BorrowingStatus::Rejected, None).await?;
                    ledger::adjust_quantity(txn, &item, record.quantity).await?;
                    Ok(rejected)
                })
            })
            .await
            .map_err(ServiceError::from)
    }

    /// Returns the newest approved loan of the item and restocks it.
    #[instrument(skip(self, request), fields(item_id = %request.item_id))]
    pub async fn return_item(
        &self,
        request: ReturnRequest,
    ) -> Result<borrowing_record::Model, ServiceError> {
        let request = ReturnRequest {
            item_id: request.item_id.trim().to_string(),
            condition: request.condition.trim().to_string(),
        };
        request.validate()?;

        let record =
            with_retry(&self.retry, "return", || self.try_return(request.clone())).await?;

        info!(record_id = record.id, quantity = record.quantity, "Item returned");
        self.event_sender
            .publish(Event::ItemReturned {
                record_id: record.id,
                item_id: record.item_id.clone(),
                quantity: record.quantity,
                condition: request.condition,
            })
            .await;

        Ok(record)
    }

    async fn try_return(
        &self,
        request: ReturnRequest,
    ) -> Result<borrowing_record::Model, ServiceError> {
        self.db_pool
            .transaction::<_, borrowing_record::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    db::acquire_write_lock(txn).await?;
                    let item = ledger::get_for_update(txn, &request.item_id).await?;

                    let record = BorrowingRecord::find()
                        .filter(borrowing_record::Column::ItemId.eq(item.id.as_str()))
                        .filter(
                            borrowing_record::Column::Status
                                .eq(BorrowingStatus::Approved.to_value()),
                        )
                        .order_by_desc(borrowing_record::Column::CreatedAt)
                        .order_by_desc(borrowing_record::Column::Id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NoActiveLoan(format!(
                                "no approved borrowing of item {}",
                                item.id
                            ))
                        })?;

                    let returned = transition(
                        txn,
                        &record,
                        BorrowingStatus::Returned,
                        Some(&request.condition),
                    )
                    .await?;
                    ledger::adjust_quantity(txn, &item, record.quantity).await?;
                    Ok(returned)
                })
            })
            .await
            .map_err(ServiceError::from)
    }
}

/// Business preconditions for reserving `quantity` units of `item`.
fn ensure_loanable(item: &item::Model, quantity: i32) -> Result<(), ServiceError> {
    if item.status == ItemStatus::Unavailable {
        return Err(ServiceError::ItemUnavailable(format!(
            "item {} is not available for borrowing",
            item.id
        )));
    }
    if item.quantity < quantity {
        return Err(ServiceError::InsufficientQuantity(format!(
            "item {} has {} available, {} requested",
            item.id, item.quantity, quantity
        )));
    }
    Ok(())
}

fn ensure_transition(
    record: &borrowing_record::Model,
    next: BorrowingStatus,
) -> Result<(), ServiceError> {
    if record.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(format!(
            "borrowing record {} is {}, cannot become {}",
            record.id, record.status, next
        )))
    }
}

async fn find_record<C>(conn: &C, record_id: i32) -> Result<borrowing_record::Model, ServiceError>
where
    C: ConnectionTrait,
{
    BorrowingRecord::find_by_id(record_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Borrowing record {} not found", record_id)))
}

/// Moves `record` to `next` with an update guarded on its current status.
async fn transition<C>(
    conn: &C,
    record: &borrowing_record::Model,
    next: BorrowingStatus,
    condition: Option<&str>,
) -> Result<borrowing_record::Model, ServiceError>
where
    C: ConnectionTrait,
{
    ensure_transition(record, next)?;

    let now = Utc::now();
    let mut updated = borrowing_record::Model {
        status: next,
        updated_at: Some(now),
        ..record.clone()
    };

    let mut update = BorrowingRecord::update_many()
        .col_expr(borrowing_record::Column::Status, Expr::value(next.to_value()))
        .col_expr(borrowing_record::Column::UpdatedAt, Expr::value(now));

    if next == BorrowingStatus::Returned {
        let condition = condition.unwrap_or_default().to_string();
        update = update
            .col_expr(borrowing_record::Column::ReturnDate, Expr::value(now))
            .col_expr(
                borrowing_record::Column::ReturnCondition,
                Expr::value(condition.clone()),
            );
        updated.return_date = Some(now);
        updated.return_condition = Some(condition);
    }

    let result = update
        .filter(borrowing_record::Column::Id.eq(record.id))
        .filter(borrowing_record::Column::Status.eq(record.status.to_value()))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(format!(
            "borrowing record {} changed while being updated",
            record.id
        )));
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn item(status: ItemStatus, quantity: i32) -> item::Model {
        item::Model {
            id: "IT001".into(),
            name: "Dell Laptop XPS 15".into(),
            description: String::new(),
            category: "Electronics".into(),
            department: "IT".into(),
            quantity,
            status,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn unavailable_override_blocks_borrowing() {
        assert_matches!(
            ensure_loanable(&item(ItemStatus::Unavailable, 5), 1),
            Err(ServiceError::ItemUnavailable(_))
        );
    }

    #[test]
    fn empty_shelf_is_insufficient_not_unavailable() {
        assert_matches!(
            ensure_loanable(&item(ItemStatus::Borrowed, 0), 1),
            Err(ServiceError::InsufficientQuantity(_))
        );
        assert_matches!(
            ensure_loanable(&item(ItemStatus::Available, 1), 2),
            Err(ServiceError::InsufficientQuantity(_))
        );
        assert!(ensure_loanable(&item(ItemStatus::Available, 2), 2).is_ok());
    }

    #[test]
    fn borrow_request_defaults_borrower_fields() {
        let request: BorrowRequest = serde_json::from_value(serde_json::json!({
            "itemId": " IT001 ",
            "quantity": 2,
            "purpose": "Lab session",
            "returnDate": "2024-06-01",
            "department": "IT"
        }))
        .unwrap();
        let request = request.normalized();
        assert_eq!(request.item_id, "IT001");
        assert_eq!(request.borrower_name.as_deref(), Some("Unknown"));
        assert_eq!(request.borrower_email.as_deref(), Some(""));
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let request = BorrowRequest {
            item_id: "IT001".into(),
            quantity: 0,
            purpose: "Lab session".into(),
            expected_return_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            department: "IT".into(),
            borrower_name: None,
            borrower_email: None,
        };
        let err: ServiceError = request.validate().unwrap_err().into();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[test]
    fn blank_fields_fail_validation_after_trimming() {
        let request = BorrowRequest {
            item_id: "IT001".into(),
            quantity: 1,
            purpose: "Lab session".into(),
            expected_return_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            department: "   ".into(),
            borrower_name: None,
            borrower_email: None,
        }
        .normalized();
        assert_eq!(request.department, "");
        assert!(request.validate().is_err());
    }
}

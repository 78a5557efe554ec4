//! Item ledger: the authoritative quantity and status of every item.
//!
//! Both operations take the caller's open transaction. Reads lock the row
//! (`SELECT ... FOR UPDATE`, a no-op on SQLite) and writes are guarded by a
//! compare-and-swap on the quantity observed by that read, so a writer that
//! raced past the lock loses cleanly instead of overwriting.

use crate::entities::{
    borrowing_record::{self, BorrowingStatus},
    item::{self, ItemStatus},
    BorrowingRecord, Item,
};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect,
};
use tracing::{debug, error, instrument};

/// `observed + delta`, or `None` when the result would be negative or overflow.
pub fn apply_delta(observed: i32, delta: i32) -> Option<i32> {
    observed.checked_add(delta).filter(|q| *q >= 0)
}

/// Reads an item under a write lock scoped to `conn`'s transaction.
#[instrument(skip(conn))]
pub async fn get_for_update<C>(conn: &C, item_id: &str) -> Result<item::Model, ServiceError>
where
    C: ConnectionTrait,
{
    Item::find_by_id(item_id.to_string())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
}

/// Number of pending or approved records still holding stock of `item_id`.
pub async fn active_loan_count<C>(conn: &C, item_id: &str) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    BorrowingRecord::find()
        .filter(borrowing_record::Column::ItemId.eq(item_id))
        .filter(
            borrowing_record::Column::Status
                .is_in(BorrowingStatus::ACTIVE.iter().map(ActiveEnum::to_value)),
        )
        .count(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Applies `delta` to the quantity read by [`get_for_update`] and recomputes
/// the status. Returns the item as written.
///
/// Fails with `ConcurrentModification` when the row no longer holds the
/// observed quantity.
#[instrument(skip(conn, observed), fields(item_id = %observed.id, observed = observed.quantity))]
pub async fn adjust_quantity<C>(
    conn: &C,
    observed: &item::Model,
    delta: i32,
) -> Result<item::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let Some(quantity) = apply_delta(observed.quantity, delta) else {
        // Callers check stock before adjusting; reaching this is a ledger bug.
        error!(
            item_id = %observed.id,
            observed = observed.quantity,
            delta,
            "Ledger adjustment would drive quantity negative"
        );
        return Err(ServiceError::InsufficientQuantity(format!(
            "item {} has {} available, {} requested",
            observed.id, observed.quantity, -delta
        )));
    };

    let has_active_loans = if quantity == 0 {
        active_loan_count(conn, &observed.id).await? > 0
    } else {
        false
    };
    let status = ItemStatus::derive(observed.status, quantity, has_active_loans);
    let now = Utc::now();

    let result = Item::update_many()
        .col_expr(item::Column::Quantity, Expr::value(quantity))
        .col_expr(item::Column::Status, Expr::value(status.to_value()))
        .col_expr(item::Column::UpdatedAt, Expr::value(now))
        .filter(item::Column::Id.eq(observed.id.as_str()))
        .filter(item::Column::Quantity.eq(observed.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(format!(
            "item {} changed while being adjusted",
            observed.id
        )));
    }

    debug!(quantity, %status, "Ledger adjusted");

    Ok(item::Model {
        quantity,
        status,
        updated_at: Some(now),
        ..observed.clone()
    })
}

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a borrowing request.
///
/// `pending → approved | rejected`, `approved → returned`. `rejected` and
/// `returned` are terminal.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BorrowingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "returned")]
    Returned,
}

impl BorrowingStatus {
    /// Statuses whose quantity is still held out of the item's stock.
    pub const ACTIVE: [BorrowingStatus; 2] = [BorrowingStatus::Pending, BorrowingStatus::Approved];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BorrowingStatus::Rejected | BorrowingStatus::Returned)
    }

    pub fn can_transition_to(&self, next: BorrowingStatus) -> bool {
        matches!(
            (self, next),
            (BorrowingStatus::Pending, BorrowingStatus::Approved)
                | (BorrowingStatus::Pending, BorrowingStatus::Rejected)
                | (BorrowingStatus::Approved, BorrowingStatus::Returned)
        )
    }
}

/// The `borrowing_records` table. Rows are never deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = BorrowingRecord)]
#[sea_orm(table_name = "borrowing_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub item_id: String,
    pub borrower_name: String,
    pub borrower_email: String,
    pub quantity: i32,
    #[sea_orm(column_type = "Text")]
    pub purpose: String,
    pub expected_return_date: NaiveDate,
    pub department: String,
    pub status: BorrowingStatus,
    pub return_date: Option<DateTime<Utc>>,
    pub return_condition: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

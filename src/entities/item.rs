use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Availability status cached on the item row.
///
/// `Unavailable` is an administrative override and is never written by the
/// borrowing engine; the other two follow the available quantity.
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
pub enum ItemStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "unavailable")]
    Unavailable,
    #[sea_orm(string_value = "borrowed")]
    Borrowed,
}

impl ItemStatus {
    /// Status an item should carry after its quantity changes to `quantity`.
    ///
    /// `has_active_loans` only matters when the quantity reaches zero: an item
    /// with nothing on the shelf and nothing out on loan is not "borrowed".
    pub fn derive(current: ItemStatus, quantity: i32, has_active_loans: bool) -> ItemStatus {
        if current == ItemStatus::Unavailable {
            return ItemStatus::Unavailable;
        }
        if quantity > 0 {
            ItemStatus::Available
        } else if has_active_loans {
            ItemStatus::Borrowed
        } else {
            ItemStatus::Unavailable
        }
    }
}

/// The `items` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Item)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    pub department: String,
    /// Units currently on the shelf (not reserved by a pending/approved record).
    pub quantity: i32,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::borrowing_record::Entity")]
    BorrowingRecords,
}

impl Related<super::borrowing_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BorrowingRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use crate::{
    db::{self, with_retry, DbPool, RetryConfig},
    entities::{
        item::{self, ItemStatus},
        Item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::ledger,
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Payload for creating an item or replacing its administrative fields.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ItemInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub category: String,
    #[validate(length(min = 1, max = 255))]
    pub department: String,
    /// Units on the shelf after this write (the new set-point).
    #[validate(range(min = 0))]
    pub quantity: i32,
    /// `false` puts the item under the `unavailable` override.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl ItemInput {
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self.department = self.department.trim().to_string();
        self.description = self.description.map(|d| d.trim().to_string());
        self
    }
}

/// Builds an item id: department prefix, unix time and a 3-digit suffix.
pub fn generate_item_id(department: &str) -> String {
    let prefix: String = department
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let suffix = rand::thread_rng().gen_range(100..=999);
    format!("{}{}{}", prefix, Utc::now().timestamp(), suffix)
}

/// Status written by an administrator. Without the override, an empty shelf
/// reads as `borrowed` only while loans are outstanding.
fn administrative_status(available: bool, quantity: i32, has_active_loans: bool) -> ItemStatus {
    if available {
        ItemStatus::derive(ItemStatus::Available, quantity, has_active_loans)
    } else {
        ItemStatus::Unavailable
    }
}

/// Item administration: create, edit and delete catalogue entries.
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    retry: RetryConfig,
}

impl ItemService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, retry: RetryConfig) -> Self {
        Self {
            db_pool,
            event_sender,
            retry,
        }
    }

    #[instrument(skip(self, input), fields(department = %input.department))]
    pub async fn create_item(&self, input: ItemInput) -> Result<item::Model, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "a new item needs a quantity of at least 1".to_string(),
            ));
        }

        // A generated id can collide within the same second; a retry draws a new one.
        let created =
            with_retry(&self.retry, "create_item", || self.try_create(input.clone())).await?;

        info!(item_id = %created.id, quantity = created.quantity, "Item created");
        self.event_sender
            .publish(Event::ItemCreated {
                item_id: created.id.clone(),
            })
            .await;

        Ok(created)
    }

    async fn try_create(&self, input: ItemInput) -> Result<item::Model, ServiceError> {
        let now = Utc::now();
        item::ActiveModel {
            id: Set(generate_item_id(&input.department)),
            name: Set(input.name),
            description: Set(input.description.unwrap_or_default()),
            category: Set(input.category),
            department: Set(input.department),
            quantity: Set(input.quantity),
            status: Set(administrative_status(input.available, input.quantity, false)),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    /// Replaces the administrative fields of an item. The quantity written
    /// here becomes the new set-point.
    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        item_id: &str,
        input: ItemInput,
    ) -> Result<item::Model, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        let item_id = item_id.to_string();

        let updated = self
            .db_pool
            .transaction::<_, item::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    db::acquire_write_lock(txn).await?;
                    let current = ledger::get_for_update(txn, &item_id).await?;
                    let has_active_loans = ledger::active_loan_count(txn, &item_id).await? > 0;

                    let mut model: item::ActiveModel = current.into();
                    model.name = Set(input.name);
                    model.description = Set(input.description.unwrap_or_default());
                    model.category = Set(input.category);
                    model.department = Set(input.department);
                    model.quantity = Set(input.quantity);
                    model.status = Set(administrative_status(
                        input.available,
                        input.quantity,
                        has_active_loans,
                    ));
                    model.updated_at = Set(Some(Utc::now()));

                    model.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(quantity = updated.quantity, status = %updated.status, "Item updated");
        self.event_sender
            .publish(Event::ItemUpdated {
                item_id: updated.id.clone(),
            })
            .await;

        Ok(updated)
    }

    /// Deletes an item that no pending or approved record still references.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: &str) -> Result<(), ServiceError> {
        let id = item_id.to_string();

        self.db_pool
            .transaction::<_, (), ServiceError>(|txn| {
                Box::pin(async move {
                    db::acquire_write_lock(txn).await?;
                    let item = ledger::get_for_update(txn, &id).await?;
                    let active = ledger::active_loan_count(txn, &id).await?;
                    if active > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "item {} has {} pending or approved borrowing records",
                            item.id, active
                        )));
                    }

                    Item::delete_by_id(item.id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    Ok(())
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!("Item deleted");
        self.event_sender
            .publish(Event::ItemDeleted {
                item_id: item_id.to_string(),
            })
            .await;

        Ok(())
    }
}

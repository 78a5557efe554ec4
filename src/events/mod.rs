use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Facts emitted after a lending transaction commits.
///
/// Notification or audit consumers subscribe to these instead of being
/// called from inside the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ItemCreated {
        item_id: String,
    },
    ItemUpdated {
        item_id: String,
    },
    ItemDeleted {
        item_id: String,
    },
    BorrowRequested {
        record_id: i32,
        item_id: String,
        quantity: i32,
        department: String,
    },
    BorrowApproved {
        record_id: i32,
        item_id: String,
    },
    BorrowRejected {
        record_id: i32,
        item_id: String,
        quantity: i32,
    },
    ItemReturned {
        record_id: i32,
        item_id: String,
        quantity: i32,
        condition: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ItemCreated { .. } => "item_created",
            Event::ItemUpdated { .. } => "item_updated",
            Event::ItemDeleted { .. } => "item_deleted",
            Event::BorrowRequested { .. } => "borrow_requested",
            Event::BorrowApproved { .. } => "borrow_approved",
            Event::BorrowRejected { .. } => "borrow_rejected",
            Event::ItemReturned { .. } => "item_returned",
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            Event::ItemCreated { item_id }
            | Event::ItemUpdated { item_id }
            | Event::ItemDeleted { item_id }
            | Event::BorrowRequested { item_id, .. }
            | Event::BorrowApproved { item_id, .. }
            | Event::BorrowRejected { item_id, .. }
            | Event::ItemReturned { item_id, .. } => item_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event for a change that is already committed. A closed
    /// channel is logged and otherwise ignored.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropping domain event");
        }
    }
}

/// Drains the event channel until every sender is gone.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(
                event = event.name(),
                item_id = event.item_id(),
                payload = %payload,
                "Domain event"
            ),
            Err(e) => warn!(event = event.name(), error = %e, "Unserializable domain event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .publish(Event::ItemCreated {
                item_id: "SCI1700000000123".into(),
            })
            .await;
        sender
            .publish(Event::BorrowApproved {
                record_id: 1,
                item_id: "SCI1700000000123".into(),
            })
            .await;

        assert_eq!(rx.recv().await.map(|e| e.name()), Some("item_created"));
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("borrow_approved"));
    }

    #[tokio::test]
    async fn publish_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender
            .send(Event::ItemDeleted {
                item_id: "IT001".into()
            })
            .await
            .is_err());
        sender
            .publish(Event::ItemDeleted {
                item_id: "IT001".into(),
            })
            .await;
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(Event::ItemReturned {
            record_id: 3,
            item_id: "IT001".into(),
            quantity: 2,
            condition: "good".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "item_returned");
        assert_eq!(json["condition"], "good");
    }
}

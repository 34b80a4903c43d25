//! In-process domain events.
//!
//! Services publish onto a bounded channel; a background task drains it and
//! logs each event. Publishing never waits: when the channel is full or closed
//! the event is dropped with a warning and the request carries on.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::movement::MovementType;

/// Default capacity of the event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    MaterialCreated {
        material_id: Uuid,
        sku: String,
        quantity: i32,
    },
    MaterialUpdated {
        material_id: Uuid,
    },
    MaterialDeleted {
        material_id: Uuid,
        movements_removed: u64,
    },
    MovementRecorded {
        movement_id: Uuid,
        material_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        new_balance: i32,
        user_id: Uuid,
    },
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

    /// Creates a sender/receiver pair with the given capacity
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Publishes an event without waiting for channel capacity
    pub fn publish(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Event channel full; dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(?event, "Event channel closed; dropping event");
            }
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::MaterialCreated {
                material_id,
                sku,
                quantity,
            } => {
                info!(%material_id, %sku, quantity, "Material created");
            }
            Event::MaterialUpdated { material_id } => {
                info!(%material_id, "Material updated");
            }
            Event::MaterialDeleted {
                material_id,
                movements_removed,
            } => {
                info!(%material_id, movements_removed, "Material deleted");
            }
            Event::MovementRecorded {
                movement_id,
                material_id,
                movement_type,
                quantity,
                new_balance,
                user_id,
            } => {
                info!(
                    %movement_id,
                    %material_id,
                    movement_type = %movement_type,
                    quantity,
                    new_balance,
                    %user_id,
                    "Movement recorded"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who triggered a lifecycle operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    Customer,
    Admin,
    Driver,
    System,
}

/// Lifecycle events handed to the notification collaborator.
///
/// Delivery mechanics live outside the core; these carry just enough for a
/// consumer to render a message or refetch the entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    BookingCreated {
        booking_id: Uuid,
        trip_id: Uuid,
        actor: Actor,
        timestamp: i64,
    },
    BookingConfirmed {
        booking_id: Uuid,
        trip_id: Uuid,
        actor: Actor,
        timestamp: i64,
    },
    BookingCancelled {
        booking_id: Uuid,
        trip_id: Uuid,
        actor: Actor,
        timestamp: i64,
    },
    TripCompleted {
        trip_id: Uuid,
        actor: Actor,
        timestamp: i64,
    },
}

impl LifecycleEvent {
    pub fn trip_id(&self) -> Uuid {
        match self {
            Self::BookingCreated { trip_id, .. }
            | Self::BookingConfirmed { trip_id, .. }
            | Self::BookingCancelled { trip_id, .. }
            | Self::TripCompleted { trip_id, .. } => *trip_id,
        }
    }
}

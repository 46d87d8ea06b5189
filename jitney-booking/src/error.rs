use jitney_catalog::ComposeError;
use jitney_domain::{BookingStatus, IllegalTransition, StoreError, TripStatus};
use uuid::Uuid;

/// Unified error taxonomy for every coordinator, ledger, and scheduler
/// operation.
///
/// Everything except `StoreUnavailable` is terminal for the request and meant
/// to be shown to the end user as-is; `Busy` asks the caller to retry with
/// backoff, never the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Trip {trip_id}: requested {requested} seats, only {available} available")]
    CapacityExceeded {
        trip_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("Trip {trip_id} does not accept bookings in status {status:?}")]
    TripNotBookable { trip_id: Uuid, status: TripStatus },

    #[error("Trip {trip_id} cannot change status from {from:?}")]
    IllegalTripTransition { trip_id: Uuid, from: TripStatus },

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error("Booking {booking_id} cannot be edited in status {status:?}")]
    BookingNotEditable {
        booking_id: Uuid,
        status: BookingStatus,
    },

    #[error("Unknown menu item: {0}")]
    InvalidMenuItem(Uuid),

    #[error("Menu item not available: {0}")]
    ItemUnavailable(String),

    #[error("Invalid quantity {quantity} for menu item {menu_item_id}")]
    InvalidQuantity { menu_item_id: Uuid, quantity: i32 },

    #[error("Invalid party size {0}: must be between 1 and 15")]
    InvalidPartySize(i32),

    #[error("Invalid trip capacity {0}: must be between 1 and 15")]
    InvalidCapacity(i32),

    #[error("Trip {0} still has active bookings")]
    TripHasActiveBookings(Uuid),

    #[error("Trip {0} is contended, retry later")]
    Busy(Uuid),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<ComposeError> for BookingError {
    fn from(err: ComposeError) -> Self {
        match err {
            ComposeError::InvalidMenuItem(id) => Self::InvalidMenuItem(id),
            ComposeError::ItemUnavailable(name) => Self::ItemUnavailable(name),
            ComposeError::InvalidQuantity {
                menu_item_id,
                quantity,
            } => Self::InvalidQuantity {
                menu_item_id,
                quantity,
            },
            ComposeError::Store(err) => Self::StoreUnavailable(err.to_string()),
        }
    }
}

impl BookingError {
    /// Whether a caller-side retry can help. Everything else must surface.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Busy(_))
    }
}

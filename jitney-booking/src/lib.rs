pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod scheduler;

pub use coordinator::{BookingPatch, PaymentOutcome, ReservationCoordinator};
pub use error::BookingError;
pub use ledger::CapacityLedger;
pub use scheduler::{TripDraft, TripPatch, TripScheduler};

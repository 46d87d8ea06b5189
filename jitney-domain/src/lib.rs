pub mod booking;
pub mod events;
pub mod repository;
pub mod trip;

pub use booking::{Booking, BookingEvent, BookingStatus, IllegalTransition, PaymentStatus};
pub use events::{Actor, LifecycleEvent};
pub use repository::{BookingRepository, StoreError, TripRepository};
pub use trip::{Trip, TripStatus, MAX_PARTY_SIZE, MAX_TRIP_CAPACITY};

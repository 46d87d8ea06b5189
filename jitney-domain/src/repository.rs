use crate::booking::{Booking, BookingStatus};
use crate::trip::{Trip, TripStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence failure. The only error class callers may retry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Repository trait for trip data access.
///
/// The guarded update methods are the store-side half of the per-trip
/// serialization contract: they only apply when `reserved_capacity` still has
/// the value the caller read, so concurrent mutations of the same trip resolve
/// to exactly one winner per round.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError>;

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError>;

    async fn list_trips(&self) -> Result<Vec<Trip>, StoreError>;

    /// Full-row update applied only while `reserved_capacity == expected_reserved`.
    /// Returns false when the guard failed and nothing was written.
    async fn update_trip_checked(
        &self,
        trip: &Trip,
        expected_reserved: i32,
    ) -> Result<bool, StoreError>;

    /// Compare-and-swap on `reserved_capacity` alone. Returns false when the
    /// expected value no longer matches and nothing was written.
    async fn compare_and_swap_reserved(
        &self,
        trip_id: Uuid,
        expected: i32,
        new: i32,
    ) -> Result<bool, StoreError>;

    /// Status-only transition applied while the stored status still equals
    /// `from`. Returns false when another transition won and nothing was
    /// written.
    async fn advance_trip_status(
        &self,
        trip_id: Uuid,
        from: TripStatus,
        to: TripStatus,
    ) -> Result<bool, StoreError>;

    async fn delete_trip(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Repository trait for booking data access.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Full-row update applied only while the stored row still carries
    /// `expected_status` AND `expected_updated_at`. The timestamp guard is
    /// what serializes same-status writers: two edits of one PENDING booking
    /// both match on status, but only the first matches the timestamp it
    /// read. Returns false when either guard failed and nothing was written.
    async fn update_booking_checked(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    /// Purge all bookings (and their lines) for a trip being deleted.
    async fn delete_for_trip(&self, trip_id: Uuid) -> Result<(), StoreError>;
}

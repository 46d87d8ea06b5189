use crate::error::BookingError;
use jitney_domain::{Trip, TripRepository};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Per-trip seat accounting. The only component that mutates a trip's
/// `reserved_capacity`.
///
/// Mutations go through a bounded compare-and-swap loop on the repository:
/// two concurrent reservations against the same trip can never both succeed
/// on the last seat, because exactly one swap per round applies. A loop that
/// keeps losing gives up with `Busy` instead of spinning forever; callers
/// retry with backoff.
#[derive(Clone)]
pub struct CapacityLedger {
    trips: Arc<dyn TripRepository>,
    cas_retry_limit: u32,
}

impl CapacityLedger {
    pub fn new(trips: Arc<dyn TripRepository>, cas_retry_limit: u32) -> Self {
        Self {
            trips,
            cas_retry_limit,
        }
    }

    /// Atomically take `seats` from the trip's remaining capacity.
    ///
    /// Returns the trip as of the successful swap, with `reserved_capacity`
    /// already incremented.
    pub async fn reserve(&self, trip_id: Uuid, seats: i32) -> Result<Trip, BookingError> {
        if seats < 1 {
            return Err(BookingError::InvalidPartySize(seats));
        }

        for _ in 0..self.cas_retry_limit {
            let mut trip = self
                .trips
                .get_trip(trip_id)
                .await?
                .ok_or(BookingError::TripNotFound(trip_id))?;

            if !trip.is_bookable() {
                return Err(BookingError::TripNotBookable {
                    trip_id,
                    status: trip.status,
                });
            }

            let available = trip.remaining_capacity();
            if seats > available {
                return Err(BookingError::CapacityExceeded {
                    trip_id,
                    requested: seats,
                    available,
                });
            }

            let expected = trip.reserved_capacity;
            if self
                .trips
                .compare_and_swap_reserved(trip_id, expected, expected + seats)
                .await?
            {
                trip.reserved_capacity = expected + seats;
                debug!(%trip_id, seats, reserved = trip.reserved_capacity, "seats reserved");
                return Ok(trip);
            }
            // Lost the swap to a concurrent mutation; re-read and try again.
        }

        Err(BookingError::Busy(trip_id))
    }

    /// Hand `seats` back to the trip, clamped at zero.
    pub async fn release(&self, trip_id: Uuid, seats: i32) -> Result<Trip, BookingError> {
        for _ in 0..self.cas_retry_limit {
            let mut trip = self
                .trips
                .get_trip(trip_id)
                .await?
                .ok_or(BookingError::TripNotFound(trip_id))?;

            let expected = trip.reserved_capacity;
            let new = (expected - seats).max(0);
            if self
                .trips
                .compare_and_swap_reserved(trip_id, expected, new)
                .await?
            {
                trip.reserved_capacity = new;
                debug!(%trip_id, seats, reserved = new, "seats released");
                return Ok(trip);
            }
        }

        Err(BookingError::Busy(trip_id))
    }

    /// Read-only view for listings: (reserved, max). May lag the mutating
    /// path; never used to decide a reservation.
    pub async fn capacity_snapshot(&self, trip_id: Uuid) -> Result<(i32, i32), BookingError> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await?
            .ok_or(BookingError::TripNotFound(trip_id))?;
        Ok((trip.reserved_capacity, trip.max_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jitney_domain::{Trip, TripStatus};
    use jitney_store::MemoryStore;

    async fn seeded_trip(store: &Arc<MemoryStore>, max_capacity: i32) -> Trip {
        let trip = Trip::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), max_capacity, 5000);
        store.insert_trip(&trip).await.unwrap();
        trip
    }

    fn ledger(store: &Arc<MemoryStore>) -> CapacityLedger {
        CapacityLedger::new(store.clone(), 8)
    }

    #[tokio::test]
    async fn reserve_and_release_round_trip() {
        let store = MemoryStore::new();
        let trip = seeded_trip(&store, 10).await;
        let ledger = ledger(&store);

        let after = ledger.reserve(trip.id, 4).await.unwrap();
        assert_eq!(after.reserved_capacity, 4);

        let after = ledger.release(trip.id, 4).await.unwrap();
        assert_eq!(after.reserved_capacity, 0);
    }

    #[tokio::test]
    async fn reserve_rejects_overbooking() {
        let store = MemoryStore::new();
        let trip = seeded_trip(&store, 2).await;
        let ledger = ledger(&store);

        ledger.reserve(trip.id, 2).await.unwrap();
        let err = ledger.reserve(trip.id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::CapacityExceeded {
                requested: 1,
                available: 0,
                ..
            }
        ));

        let (reserved, max) = ledger.capacity_snapshot(trip.id).await.unwrap();
        assert_eq!((reserved, max), (2, 2));
    }

    #[tokio::test]
    async fn reserve_rejects_unknown_and_unbookable_trips() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);

        let missing = Uuid::new_v4();
        assert!(matches!(
            ledger.reserve(missing, 1).await.unwrap_err(),
            BookingError::TripNotFound(id) if id == missing
        ));

        let trip = seeded_trip(&store, 5).await;
        store
            .advance_trip_status(trip.id, TripStatus::Scheduled, TripStatus::Cancelled)
            .await
            .unwrap();
        assert!(matches!(
            ledger.reserve(trip.id, 1).await.unwrap_err(),
            BookingError::TripNotBookable { .. }
        ));
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let store = MemoryStore::new();
        let trip = seeded_trip(&store, 5).await;
        let ledger = ledger(&store);

        ledger.reserve(trip.id, 2).await.unwrap();
        let after = ledger.release(trip.id, 10).await.unwrap();
        assert_eq!(after.reserved_capacity, 0);
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversell_the_last_seat() {
        let store = MemoryStore::new();
        let trip = seeded_trip(&store, 5).await;
        let ledger = ledger(&store);

        // Fill to one seat short of capacity.
        ledger.reserve(trip.id, 4).await.unwrap();

        let a = {
            let ledger = ledger.clone();
            let trip_id = trip.id;
            tokio::spawn(async move { ledger.reserve(trip_id, 1).await })
        };
        let b = {
            let ledger = ledger.clone();
            let trip_id = trip.id;
            tokio::spawn(async move { ledger.reserve(trip_id, 1).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let rejections = results
            .iter()
            .filter(|r| matches!(r, Err(BookingError::CapacityExceeded { .. })))
            .count();

        assert_eq!(wins, 1);
        assert_eq!(rejections, 1);

        let (reserved, max) = ledger.capacity_snapshot(trip.id).await.unwrap();
        assert_eq!((reserved, max), (5, 5));
    }
}

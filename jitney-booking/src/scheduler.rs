use crate::coordinator::ReservationCoordinator;
use crate::error::BookingError;
use chrono::{DateTime, Utc};
use jitney_domain::{
    Actor, BookingEvent, BookingRepository, BookingStatus, LifecycleEvent, Trip, TripRepository,
    TripStatus, MAX_TRIP_CAPACITY,
};
use jitney_store::app_config::BusinessRules;
use jitney_store::EventPublisher;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Admin request to create a trip.
#[derive(Debug, Clone, Deserialize)]
pub struct TripDraft {
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub departs_at: DateTime<Utc>,
    pub max_capacity: i32,
    pub base_fare: i32,
    pub notes: Option<String>,
}

/// Admin edit; absent fields keep their current value. `reserved_capacity`
/// is deliberately not here: only the capacity ledger may touch it.
#[derive(Debug, Default, Deserialize)]
pub struct TripPatch {
    pub route_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub departs_at: Option<DateTime<Utc>>,
    pub max_capacity: Option<i32>,
    pub base_fare: Option<i32>,
    pub notes: Option<String>,
}

/// Admin-facing trip management: creation, edits, and status advancement.
/// Booking cascades on completion/cancellation run through the coordinator
/// so the state machine and seat accounting stay authoritative.
pub struct TripScheduler {
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    coordinator: Arc<ReservationCoordinator>,
    events: EventPublisher,
    cas_retry_limit: u32,
}

impl TripScheduler {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        coordinator: Arc<ReservationCoordinator>,
        events: EventPublisher,
        rules: &BusinessRules,
    ) -> Self {
        Self {
            trips,
            bookings,
            coordinator,
            events,
            cas_retry_limit: rules.cas_retry_limit,
        }
    }

    pub async fn get_trip(&self, trip_id: Uuid) -> Result<Trip, BookingError> {
        self.trips
            .get_trip(trip_id)
            .await?
            .ok_or(BookingError::TripNotFound(trip_id))
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>, BookingError> {
        Ok(self.trips.list_trips().await?)
    }

    pub async fn create_trip(&self, draft: TripDraft) -> Result<Trip, BookingError> {
        if !(1..=MAX_TRIP_CAPACITY).contains(&draft.max_capacity) {
            return Err(BookingError::InvalidCapacity(draft.max_capacity));
        }

        let mut trip = Trip::new(
            draft.route_id,
            draft.driver_id,
            draft.departs_at,
            draft.max_capacity,
            draft.base_fare,
        );
        trip.notes = draft.notes;

        self.trips.insert_trip(&trip).await?;
        info!(trip_id = %trip.id, max_capacity = trip.max_capacity, "trip created");
        Ok(trip)
    }

    /// Apply an admin edit. Shrinking `max_capacity` below the seats already
    /// reserved is refused: existing bookings may never be silently orphaned
    /// past capacity.
    pub async fn edit_trip(&self, trip_id: Uuid, patch: TripPatch) -> Result<Trip, BookingError> {
        for _ in 0..self.cas_retry_limit {
            let mut trip = self.get_trip(trip_id).await?;
            let expected_reserved = trip.reserved_capacity;

            if let Some(route_id) = patch.route_id {
                trip.route_id = route_id;
            }
            if let Some(driver_id) = patch.driver_id {
                trip.driver_id = driver_id;
            }
            if let Some(departs_at) = patch.departs_at {
                trip.departs_at = departs_at;
            }
            if let Some(base_fare) = patch.base_fare {
                trip.base_fare = base_fare;
            }
            if let Some(notes) = &patch.notes {
                trip.notes = Some(notes.clone());
            }
            if let Some(max_capacity) = patch.max_capacity {
                if !(1..=MAX_TRIP_CAPACITY).contains(&max_capacity) {
                    return Err(BookingError::InvalidCapacity(max_capacity));
                }
                if max_capacity < trip.reserved_capacity {
                    return Err(BookingError::CapacityExceeded {
                        trip_id,
                        requested: max_capacity,
                        available: trip.reserved_capacity,
                    });
                }
                trip.max_capacity = max_capacity;
            }

            // Guarded on reserved_capacity so a reservation racing this edit
            // cannot slip past a shrunken maximum.
            if self
                .trips
                .update_trip_checked(&trip, expected_reserved)
                .await?
            {
                return Ok(trip);
            }
        }

        Err(BookingError::Busy(trip_id))
    }

    pub async fn start_trip(&self, trip_id: Uuid) -> Result<Trip, BookingError> {
        self.advance_status(trip_id, TripStatus::InProgress, &[TripStatus::Scheduled])
            .await
    }

    /// Mark the trip completed and complete every confirmed booking on it.
    /// Seats stay reserved: they were used, not freed.
    pub async fn complete_trip(&self, trip_id: Uuid, actor: Actor) -> Result<Trip, BookingError> {
        let trip = self
            .advance_status(
                trip_id,
                TripStatus::Completed,
                &[TripStatus::Scheduled, TripStatus::InProgress],
            )
            .await?;

        let bookings = self.bookings.list_for_trip(trip_id).await?;
        let mut pending = 0usize;
        for booking in &bookings {
            match booking.status {
                BookingStatus::Confirmed => {
                    self.coordinator
                        .drive_event(booking.id, BookingEvent::TripCompleted, actor)
                        .await?;
                }
                BookingStatus::Pending => pending += 1,
                _ => {}
            }
        }
        if pending > 0 {
            warn!(%trip_id, pending, "trip completed with unpaid pending bookings");
        }

        self.events.publish(LifecycleEvent::TripCompleted {
            trip_id,
            actor,
            timestamp: Utc::now().timestamp(),
        });

        Ok(trip)
    }

    /// Cancel the trip and cancel every booking still holding seats on it.
    pub async fn cancel_trip(&self, trip_id: Uuid, actor: Actor) -> Result<Trip, BookingError> {
        let trip = self
            .advance_status(
                trip_id,
                TripStatus::Cancelled,
                &[TripStatus::Scheduled, TripStatus::InProgress],
            )
            .await?;

        let bookings = self.bookings.list_for_trip(trip_id).await?;
        for booking in bookings.iter().filter(|b| b.is_active()) {
            self.coordinator.cancel_booking(booking.id, actor).await?;
        }

        info!(%trip_id, "trip cancelled");
        Ok(trip)
    }

    /// Guarded on the status read, so two racing admins (say complete and
    /// cancel) resolve to one winner; the loser re-reads and gets
    /// `IllegalTripTransition` for the state the trip is actually in.
    async fn advance_status(
        &self,
        trip_id: Uuid,
        to: TripStatus,
        allowed_from: &[TripStatus],
    ) -> Result<Trip, BookingError> {
        for _ in 0..self.cas_retry_limit {
            let mut trip = self.get_trip(trip_id).await?;
            if !allowed_from.contains(&trip.status) {
                return Err(BookingError::IllegalTripTransition {
                    trip_id,
                    from: trip.status,
                });
            }

            if self
                .trips
                .advance_trip_status(trip_id, trip.status, to)
                .await?
            {
                trip.status = to;
                trip.updated_at = Utc::now();
                return Ok(trip);
            }
        }

        Err(BookingError::Busy(trip_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitney_store::MemoryStore;

    struct Harness {
        scheduler: TripScheduler,
        coordinator: Arc<ReservationCoordinator>,
    }

    fn draft(max_capacity: i32) -> TripDraft {
        TripDraft {
            route_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            departs_at: Utc::now(),
            max_capacity,
            base_fare: 5000,
            notes: None,
        }
    }

    async fn harness() -> Harness {
        let store = MemoryStore::new();
        let events = EventPublisher::default();
        let rules = BusinessRules::default();
        let coordinator = Arc::new(ReservationCoordinator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            events.clone(),
            &rules,
        ));
        let scheduler = TripScheduler::new(
            store.clone(),
            store.clone(),
            coordinator.clone(),
            events,
            &rules,
        );
        Harness {
            scheduler,
            coordinator,
        }
    }

    #[tokio::test]
    async fn create_trip_validates_capacity() {
        let h = harness().await;
        for capacity in [0, -2, 16] {
            let err = h.scheduler.create_trip(draft(capacity)).await.unwrap_err();
            assert!(matches!(err, BookingError::InvalidCapacity(c) if c == capacity));
        }

        let trip = h.scheduler.create_trip(draft(15)).await.unwrap();
        assert_eq!(trip.status, TripStatus::Scheduled);
        assert_eq!(trip.reserved_capacity, 0);
    }

    #[tokio::test]
    async fn shrinking_capacity_below_reserved_is_refused() {
        let h = harness().await;
        let trip = h.scheduler.create_trip(draft(10)).await.unwrap();

        h.coordinator
            .create_booking(trip.id, Uuid::new_v4(), 6, &[], None, Actor::Customer)
            .await
            .unwrap();

        let err = h
            .scheduler
            .edit_trip(
                trip.id,
                TripPatch {
                    max_capacity: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::CapacityExceeded {
                requested: 5,
                available: 6,
                ..
            }
        ));

        // Shrinking to exactly the reserved count is fine.
        let edited = h
            .scheduler
            .edit_trip(
                trip.id,
                TripPatch {
                    max_capacity: Some(6),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.max_capacity, 6);
    }

    #[tokio::test]
    async fn status_advances_along_the_schedule() {
        let h = harness().await;
        let trip = h.scheduler.create_trip(draft(8)).await.unwrap();

        let started = h.scheduler.start_trip(trip.id).await.unwrap();
        assert_eq!(started.status, TripStatus::InProgress);

        // Starting twice is an error.
        assert!(matches!(
            h.scheduler.start_trip(trip.id).await.unwrap_err(),
            BookingError::IllegalTripTransition { .. }
        ));

        let completed = h
            .scheduler
            .complete_trip(trip.id, Actor::Driver)
            .await
            .unwrap();
        assert_eq!(completed.status, TripStatus::Completed);
    }

    #[tokio::test]
    async fn completed_trip_cannot_also_be_cancelled() {
        let h = harness().await;
        let trip = h.scheduler.create_trip(draft(8)).await.unwrap();

        h.scheduler
            .complete_trip(trip.id, Actor::Driver)
            .await
            .unwrap();

        // The cancel arrives second and must lose against the completed state.
        let err = h
            .scheduler
            .cancel_trip(trip.id, Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::IllegalTripTransition {
                from: TripStatus::Completed,
                ..
            }
        ));

        let stored = h.scheduler.get_trip(trip.id).await.unwrap();
        assert_eq!(stored.status, TripStatus::Completed);
    }

    #[tokio::test]
    async fn completing_a_trip_completes_confirmed_bookings_without_release() {
        let h = harness().await;
        let trip = h.scheduler.create_trip(draft(10)).await.unwrap();

        let booking = h
            .coordinator
            .create_booking(trip.id, Uuid::new_v4(), 3, &[], None, Actor::Customer)
            .await
            .unwrap();
        h.coordinator
            .apply_payment_outcome(booking.id, crate::PaymentOutcome::Succeeded)
            .await
            .unwrap();

        h.scheduler
            .complete_trip(trip.id, Actor::Driver)
            .await
            .unwrap();

        let completed = h.coordinator.get_booking(booking.id).await.unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);

        // Historical usage stays on the ledger.
        let stored = h.scheduler.get_trip(trip.id).await.unwrap();
        assert_eq!(stored.reserved_capacity, 3);
    }

    #[tokio::test]
    async fn cancelling_a_trip_cancels_active_bookings_and_frees_seats() {
        let h = harness().await;
        let trip = h.scheduler.create_trip(draft(10)).await.unwrap();

        let booking = h
            .coordinator
            .create_booking(trip.id, Uuid::new_v4(), 4, &[], None, Actor::Customer)
            .await
            .unwrap();

        h.scheduler
            .cancel_trip(trip.id, Actor::Admin)
            .await
            .unwrap();

        let cancelled = h.coordinator.get_booking(booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let stored = h.scheduler.get_trip(trip.id).await.unwrap();
        assert_eq!(stored.status, TripStatus::Cancelled);
        assert_eq!(stored.reserved_capacity, 0);
    }

    #[tokio::test]
    async fn reserved_capacity_is_not_admin_editable() {
        let h = harness().await;
        let trip = h.scheduler.create_trip(draft(10)).await.unwrap();
        h.coordinator
            .create_booking(trip.id, Uuid::new_v4(), 2, &[], None, Actor::Customer)
            .await
            .unwrap();

        // A full edit of every editable field leaves reserved seats intact.
        let edited = h
            .scheduler
            .edit_trip(
                trip.id,
                TripPatch {
                    route_id: Some(Uuid::new_v4()),
                    driver_id: Some(Uuid::new_v4()),
                    departs_at: Some(Utc::now()),
                    max_capacity: Some(12),
                    base_fare: Some(4500),
                    notes: Some("charter".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.reserved_capacity, 2);
    }
}

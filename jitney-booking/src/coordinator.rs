use crate::error::BookingError;
use crate::ledger::CapacityLedger;
use chrono::Utc;
use jitney_catalog::{MenuRepository, OrderComposer, OrderLineRequest};
use jitney_domain::{
    Actor, Booking, BookingEvent, BookingRepository, BookingStatus, LifecycleEvent, Trip,
    TripRepository, MAX_PARTY_SIZE,
};
use jitney_store::app_config::BusinessRules;
use jitney_store::EventPublisher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result reported by the external payment collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// Changes an edit may apply to a booking. Absent fields are left untouched;
/// a present `order` fully replaces the existing line set.
#[derive(Debug, Default, Deserialize)]
pub struct BookingPatch {
    pub party_size: Option<i32>,
    pub order: Option<Vec<OrderLineRequest>>,
    pub special_requests: Option<String>,
    /// Administrative status overrides still run through the state machine.
    pub status_override: Option<BookingEvent>,
}

impl BookingPatch {
    fn touches_fields(&self) -> bool {
        self.party_size.is_some() || self.order.is_some() || self.special_requests.is_some()
    }
}

/// Orchestrates booking creation, edits, and cancellation as atomic units of
/// work across the capacity ledger, order composer, and state machine.
///
/// Every operation is all-or-nothing: a failure after the capacity
/// reservation triggers a compensating release before the error surfaces, so
/// no interleaving leaves orphaned seats.
pub struct ReservationCoordinator {
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    ledger: CapacityLedger,
    composer: OrderComposer,
    events: EventPublisher,
    cas_retry_limit: u32,
}

impl ReservationCoordinator {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        menu: Arc<dyn MenuRepository>,
        events: EventPublisher,
        rules: &BusinessRules,
    ) -> Self {
        Self {
            ledger: CapacityLedger::new(trips.clone(), rules.cas_retry_limit),
            composer: OrderComposer::new(menu),
            trips,
            bookings,
            events,
            cas_retry_limit: rules.cas_retry_limit,
        }
    }

    pub fn ledger(&self) -> &CapacityLedger {
        &self.ledger
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// Create a booking: reserve seats, compose the food order, persist
    /// PENDING, emit `BookingCreated`.
    pub async fn create_booking(
        &self,
        trip_id: Uuid,
        customer_id: Uuid,
        party_size: i32,
        order: &[OrderLineRequest],
        special_requests: Option<String>,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        if !(1..=MAX_PARTY_SIZE).contains(&party_size) {
            return Err(BookingError::InvalidPartySize(party_size));
        }

        let trip = self.ledger.reserve(trip_id, party_size).await?;

        let lines = match self.composer.compose(order).await {
            Ok(lines) => lines,
            Err(err) => {
                self.compensate_release(trip_id, party_size).await;
                return Err(err.into());
            }
        };

        let total_amount = Self::total_amount(&trip, party_size, &lines);
        let booking = Booking::new(
            trip_id,
            customer_id,
            party_size,
            lines,
            total_amount,
            special_requests,
        );

        if let Err(err) = self.bookings.insert_booking(&booking).await {
            self.compensate_release(trip_id, party_size).await;
            return Err(err.into());
        }

        info!(booking_id = %booking.id, %trip_id, party_size, "booking created");
        self.events.publish(LifecycleEvent::BookingCreated {
            booking_id: booking.id,
            trip_id,
            actor,
            timestamp: Utc::now().timestamp(),
        });

        Ok(booking)
    }

    /// Edit a booking: optional status override through the state machine,
    /// party-size delta against the ledger, full order recomposition.
    ///
    /// A growth that no longer fits aborts with no change applied.
    pub async fn edit_booking(
        &self,
        booking_id: Uuid,
        patch: BookingPatch,
    ) -> Result<Booking, BookingError> {
        if let Some(event) = patch.status_override {
            self.drive_event(booking_id, event, Actor::Admin).await?;
        }

        let booking = self.get_booking(booking_id).await?;
        if !patch.touches_fields() {
            return Ok(booking);
        }
        if !booking.is_active() {
            return Err(BookingError::BookingNotEditable {
                booking_id,
                status: booking.status,
            });
        }

        let new_party = patch.party_size.unwrap_or(booking.party_size);
        if !(1..=MAX_PARTY_SIZE).contains(&new_party) {
            return Err(BookingError::InvalidPartySize(new_party));
        }

        // Compose before touching the ledger; compose has no side effects.
        let new_lines = match &patch.order {
            Some(order) => Some(self.composer.compose(order).await?),
            None => None,
        };

        // Adjust the seat delta on the same trip. Growth may fail with
        // CapacityExceeded, in which case nothing has changed yet.
        let delta = new_party - booking.party_size;
        let trip = if delta > 0 {
            self.ledger.reserve(booking.trip_id, delta).await?
        } else if delta < 0 {
            self.ledger.release(booking.trip_id, -delta).await?
        } else {
            self.trips
                .get_trip(booking.trip_id)
                .await?
                .ok_or(BookingError::TripNotFound(booking.trip_id))?
        };

        for _ in 0..self.cas_retry_limit {
            let mut fresh = self.get_booking(booking_id).await?;
            if !fresh.is_active() || fresh.party_size != booking.party_size {
                // A concurrent transition or edit won; undo our seat delta.
                self.compensate_delta(booking.trip_id, delta).await;
                return Err(BookingError::BookingNotEditable {
                    booking_id,
                    status: fresh.status,
                });
            }

            let was = fresh.status;
            let read_at = fresh.updated_at;
            fresh.party_size = new_party;
            if let Some(lines) = &new_lines {
                fresh.lines = lines.clone();
            }
            if let Some(requests) = &patch.special_requests {
                fresh.special_requests = Some(requests.clone());
            }
            fresh.total_amount = Self::total_amount(&trip, new_party, &fresh.lines);
            fresh.updated_at = Utc::now();

            if self
                .bookings
                .update_booking_checked(&fresh, was, read_at)
                .await?
            {
                info!(%booking_id, new_party, "booking edited");
                return Ok(fresh);
            }
        }

        self.compensate_delta(booking.trip_id, delta).await;
        Err(BookingError::Busy(booking.trip_id))
    }

    /// Cancel a booking on behalf of `actor` and release its seats.
    ///
    /// Under the no-refund policy the payment status stays PAID; an explicit
    /// administrative refund is a separate operation.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        let event = match actor {
            Actor::Customer => BookingEvent::CustomerCancel,
            _ => BookingEvent::AdminCancel,
        };
        self.drive_event(booking_id, event, actor).await
    }

    /// Feed a payment collaborator result into the state machine. Success
    /// confirms the booking and issues its boarding token; failure cancels it
    /// and releases the seats.
    pub async fn apply_payment_outcome(
        &self,
        booking_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<Booking, BookingError> {
        let event = match outcome {
            PaymentOutcome::Succeeded => BookingEvent::PaymentSucceeded,
            PaymentOutcome::Failed => BookingEvent::PaymentFailed,
        };
        self.drive_event(booking_id, event, Actor::System).await
    }

    /// Administrative refund override; only legal on a cancelled, paid
    /// booking, and always logged.
    pub async fn refund_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.drive_event(booking_id, BookingEvent::AdminRefund, Actor::Admin)
            .await
    }

    /// Delete a trip and purge its bookings. Refused while any booking still
    /// holds seats, so the UI can never silently orphan active bookings.
    pub async fn delete_trip_cascade(&self, trip_id: Uuid) -> Result<(), BookingError> {
        self.trips
            .get_trip(trip_id)
            .await?
            .ok_or(BookingError::TripNotFound(trip_id))?;

        let bookings = self.bookings.list_for_trip(trip_id).await?;
        if bookings.iter().any(Booking::is_active) {
            return Err(BookingError::TripHasActiveBookings(trip_id));
        }

        self.bookings.delete_for_trip(trip_id).await?;
        self.trips.delete_trip(trip_id).await?;
        // A create racing the active-check can land a booking before the trip
        // row is gone; sweep once more now that inserts are refused.
        self.bookings.delete_for_trip(trip_id).await?;
        info!(%trip_id, purged = bookings.len(), "trip deleted");
        Ok(())
    }

    /// Apply one lifecycle event to a booking, serialized per booking via a
    /// status-guarded update, then perform the capacity/event side effects
    /// the transition implies.
    pub(crate) async fn drive_event(
        &self,
        booking_id: Uuid,
        event: BookingEvent,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        let mut last_trip_id = None;

        for _ in 0..self.cas_retry_limit {
            let mut booking = self.get_booking(booking_id).await?;
            last_trip_id = Some(booking.trip_id);

            let was = booking.status;
            let read_at = booking.updated_at;
            booking.apply(event)?;

            if !self
                .bookings
                .update_booking_checked(&booking, was, read_at)
                .await?
            {
                // Another transition landed first; re-read and re-judge.
                continue;
            }

            if booking.status == BookingStatus::Cancelled && was != BookingStatus::Cancelled {
                // The release must be durably recorded before the cancel is
                // reported back to the caller.
                self.ledger
                    .release(booking.trip_id, booking.party_size)
                    .await?;
                self.events.publish(LifecycleEvent::BookingCancelled {
                    booking_id,
                    trip_id: booking.trip_id,
                    actor,
                    timestamp: Utc::now().timestamp(),
                });
            } else if booking.status == BookingStatus::Confirmed && was == BookingStatus::Pending {
                self.events.publish(LifecycleEvent::BookingConfirmed {
                    booking_id,
                    trip_id: booking.trip_id,
                    actor,
                    timestamp: Utc::now().timestamp(),
                });
            }

            if event == BookingEvent::AdminRefund {
                warn!(%booking_id, "administrative refund override applied");
            }

            return Ok(booking);
        }

        Err(BookingError::Busy(last_trip_id.unwrap_or(booking_id)))
    }

    fn total_amount(trip: &Trip, party_size: i32, lines: &[jitney_catalog::OrderLine]) -> i32 {
        trip.base_fare * party_size + OrderComposer::total(lines)
    }

    async fn compensate_release(&self, trip_id: Uuid, seats: i32) {
        if let Err(err) = self.ledger.release(trip_id, seats).await {
            // Nothing sane to do mid-compensation; surface loudly for ops.
            error!(%trip_id, seats, %err, "compensating release failed");
        }
    }

    async fn compensate_delta(&self, trip_id: Uuid, delta: i32) {
        let result = if delta > 0 {
            self.ledger.release(trip_id, delta).await.map(|_| ())
        } else if delta < 0 {
            self.ledger.reserve(trip_id, -delta).await.map(|_| ())
        } else {
            Ok(())
        };
        if let Err(err) = result {
            error!(%trip_id, delta, %err, "compensating seat adjustment failed");
        }
    }
}

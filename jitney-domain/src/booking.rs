use chrono::{DateTime, Utc};
use jitney_catalog::OrderLine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

/// Events that may advance a booking's lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    PaymentSucceeded,
    PaymentFailed,
    AdminConfirm,
    AdminCancel,
    CustomerCancel,
    TripCompleted,
    /// Administrative override only; legal on a cancelled, paid booking.
    AdminRefund,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Illegal transition: {event:?} on booking in {status:?}/{payment_status:?}")]
pub struct IllegalTransition {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub event: BookingEvent,
}

/// A customer's reservation of seats (and optional food order) on a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub customer_id: Uuid,
    pub party_size: i32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Base fare for the party plus the sum of all order lines, minor units.
    pub total_amount: i32,
    pub lines: Vec<OrderLine>,
    pub special_requests: Option<String>,
    /// Opaque token for driver-side boarding checks, issued on confirmation.
    pub boarding_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        trip_id: Uuid,
        customer_id: Uuid,
        party_size: i32,
        lines: Vec<OrderLine>,
        total_amount: i32,
        special_requests: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip_id,
            customer_id,
            party_size,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount,
            lines,
            special_requests,
            boarding_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A booking holds seats on its trip exactly while it is active.
    pub fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Apply a lifecycle event, advancing status and payment status together.
    ///
    /// Every pairing not listed here is an error; the machine never silently
    /// ignores an unexpected event. Seat release on cancellation is the
    /// coordinator's responsibility, not the machine's.
    pub fn apply(&mut self, event: BookingEvent) -> Result<(), IllegalTransition> {
        use BookingEvent::*;
        use BookingStatus::*;

        match (self.status, event) {
            (Pending, PaymentSucceeded) => {
                self.status = Confirmed;
                self.payment_status = PaymentStatus::Paid;
                self.issue_boarding_token();
            }
            (Pending, PaymentFailed) => {
                self.status = Cancelled;
            }
            (Pending, AdminConfirm) => {
                self.status = Confirmed;
                self.issue_boarding_token();
            }
            (Pending | Confirmed, AdminCancel | CustomerCancel) => {
                self.status = Cancelled;
            }
            (Confirmed, TripCompleted) => {
                self.status = Completed;
            }
            (Cancelled, AdminRefund) if self.payment_status == PaymentStatus::Paid => {
                self.payment_status = PaymentStatus::Refunded;
            }
            _ => {
                return Err(IllegalTransition {
                    status: self.status,
                    payment_status: self.payment_status,
                    event,
                });
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    fn issue_boarding_token(&mut self) {
        self.boarding_token = Some(format!("BT-{}", Uuid::new_v4().simple()));
    }
}

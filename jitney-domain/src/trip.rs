use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product rule: no vehicle in the fleet seats more than 15.
pub const MAX_TRIP_CAPACITY: i32 = 15;

/// Product rule: a single booking never exceeds one full vehicle.
pub const MAX_PARTY_SIZE: i32 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// A single scheduled vehicle run with a seat limit.
///
/// `reserved_capacity` is only ever mutated through the capacity ledger's
/// compare-and-swap path; everything else treats it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub departs_at: DateTime<Utc>,
    pub max_capacity: i32,
    pub reserved_capacity: i32,
    /// Fare per seat in minor currency units.
    pub base_fare: i32,
    pub status: TripStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(
        route_id: Uuid,
        driver_id: Uuid,
        departs_at: DateTime<Utc>,
        max_capacity: i32,
        base_fare: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            route_id,
            driver_id,
            departs_at,
            max_capacity,
            reserved_capacity: 0,
            base_fare,
            status: TripStatus::Scheduled,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_capacity(&self) -> i32 {
        self.max_capacity - self.reserved_capacity
    }

    /// New reservations are only accepted while the trip is still scheduled.
    pub fn is_bookable(&self) -> bool {
        self.status == TripStatus::Scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(max_capacity: i32) -> Trip {
        Trip::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), max_capacity, 5000)
    }

    #[test]
    fn new_trip_starts_empty_and_scheduled() {
        let t = trip(12);
        assert_eq!(t.reserved_capacity, 0);
        assert_eq!(t.remaining_capacity(), 12);
        assert!(t.is_bookable());
    }

    #[test]
    fn only_scheduled_trips_are_bookable() {
        let mut t = trip(12);
        for status in [
            TripStatus::InProgress,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            t.status = status;
            assert!(!t.is_bookable());
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jitney_catalog::{MenuItem, MenuRepository};
use jitney_domain::{
    Booking, BookingRepository, BookingStatus, StoreError, Trip, TripRepository, TripStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store used by tests and single-node development runs.
///
/// The guarded updates are atomic because they run under the map's write
/// lock, which is exactly the linearizability the capacity ledger needs.
#[derive(Default)]
pub struct MemoryStore {
    trips: RwLock<HashMap<Uuid, Trip>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
    menu: RwLock<HashMap<Uuid, MenuItem>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        self.trips.write().await.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        Ok(self.trips.read().await.get(&id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, StoreError> {
        Ok(self.trips.read().await.values().cloned().collect())
    }

    async fn update_trip_checked(
        &self,
        trip: &Trip,
        expected_reserved: i32,
    ) -> Result<bool, StoreError> {
        let mut trips = self.trips.write().await;
        match trips.get_mut(&trip.id) {
            Some(stored) if stored.reserved_capacity == expected_reserved => {
                let mut updated = trip.clone();
                updated.updated_at = Utc::now();
                *stored = updated;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn compare_and_swap_reserved(
        &self,
        trip_id: Uuid,
        expected: i32,
        new: i32,
    ) -> Result<bool, StoreError> {
        let mut trips = self.trips.write().await;
        match trips.get_mut(&trip_id) {
            Some(trip) if trip.reserved_capacity == expected => {
                trip.reserved_capacity = new;
                trip.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn advance_trip_status(
        &self,
        trip_id: Uuid,
        from: TripStatus,
        to: TripStatus,
    ) -> Result<bool, StoreError> {
        let mut trips = self.trips.write().await;
        match trips.get_mut(&trip_id) {
            Some(trip) if trip.status == from => {
                trip.status = to;
                trip.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_trip(&self, id: Uuid) -> Result<(), StoreError> {
        self.trips.write().await.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        // Same referential rule the relational schema enforces: a booking may
        // not land on a trip that no longer exists. The trip lock is held
        // across the insert so a concurrent trip delete cannot slip between
        // the check and the write.
        let trips = self.trips.read().await;
        if !trips.contains_key(&booking.trip_id) {
            return Err(StoreError::Unavailable(format!(
                "trip {} does not exist",
                booking.trip_id
            )));
        }
        self.bookings
            .write()
            .await
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn update_booking_checked(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(stored)
                if stored.status == expected_status
                    && stored.updated_at == expected_updated_at =>
            {
                *stored = booking.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.trip_id == trip_id)
            .cloned()
            .collect())
    }

    async fn delete_for_trip(&self, trip_id: Uuid) -> Result<(), StoreError> {
        self.bookings.write().await.retain(|_, b| b.trip_id != trip_id);
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn get_item(
        &self,
        id: Uuid,
    ) -> Result<Option<MenuItem>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.menu.read().await.get(&id).cloned())
    }

    async fn list_items(
        &self,
    ) -> Result<Vec<MenuItem>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.menu.read().await.values().cloned().collect())
    }

    async fn upsert_item(
        &self,
        item: &MenuItem,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.menu.write().await.insert(item.id, item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cas_applies_only_on_matching_reserved() {
        let store = MemoryStore::new();
        let trip = Trip::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), 10, 5000);
        store.insert_trip(&trip).await.unwrap();

        assert!(store
            .compare_and_swap_reserved(trip.id, 0, 4)
            .await
            .unwrap());
        // Stale expectation loses.
        assert!(!store
            .compare_and_swap_reserved(trip.id, 0, 7)
            .await
            .unwrap());

        let stored = store.get_trip(trip.id).await.unwrap().unwrap();
        assert_eq!(stored.reserved_capacity, 4);
    }

    #[tokio::test]
    async fn cas_on_unknown_trip_fails() {
        let store = MemoryStore::new();
        assert!(!store
            .compare_and_swap_reserved(Uuid::new_v4(), 0, 1)
            .await
            .unwrap());
    }

    async fn seeded_booking(store: &Arc<MemoryStore>, party_size: i32) -> Booking {
        let trip = Trip::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), 10, 5000);
        store.insert_trip(&trip).await.unwrap();
        let booking = Booking::new(trip.id, Uuid::new_v4(), party_size, vec![], 10000, None);
        store.insert_booking(&booking).await.unwrap();
        booking
    }

    #[tokio::test]
    async fn guarded_booking_update_detects_lost_race() {
        let store = MemoryStore::new();
        let mut booking = seeded_booking(&store, 2).await;
        let read_at = booking.updated_at;

        booking.status = BookingStatus::Confirmed;
        booking.updated_at = Utc::now();
        assert!(store
            .update_booking_checked(&booking, BookingStatus::Pending, read_at)
            .await
            .unwrap());
        // Second writer still expects PENDING and must lose.
        assert!(!store
            .update_booking_checked(&booking, BookingStatus::Pending, read_at)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn guarded_booking_update_serializes_same_status_writers() {
        let store = MemoryStore::new();
        let booking = seeded_booking(&store, 2).await;
        let read_at = booking.updated_at;

        // Two editors read the same PENDING booking. The first lands a
        // party-size change that leaves the status PENDING.
        let mut first = booking.clone();
        first.party_size = 4;
        first.updated_at = Utc::now();
        assert!(store
            .update_booking_checked(&first, BookingStatus::Pending, read_at)
            .await
            .unwrap());

        // The second still matches on status but not on the timestamp it
        // read, so it must lose instead of silently overwriting the first.
        let mut second = booking.clone();
        second.party_size = 5;
        second.updated_at = Utc::now();
        assert!(!store
            .update_booking_checked(&second, BookingStatus::Pending, read_at)
            .await
            .unwrap());

        let stored = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.party_size, 4);
    }

    #[tokio::test]
    async fn trip_status_advance_detects_lost_race() {
        let store = MemoryStore::new();
        let trip = Trip::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), 10, 5000);
        store.insert_trip(&trip).await.unwrap();

        assert!(store
            .advance_trip_status(trip.id, TripStatus::Scheduled, TripStatus::Completed)
            .await
            .unwrap());
        // A racing admin still expects SCHEDULED and must lose.
        assert!(!store
            .advance_trip_status(trip.id, TripStatus::Scheduled, TripStatus::Cancelled)
            .await
            .unwrap());

        let stored = store.get_trip(trip.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TripStatus::Completed);
    }

    #[tokio::test]
    async fn insert_booking_requires_existing_trip() {
        let store = MemoryStore::new();
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), 2, vec![], 10000, None);
        assert!(store.insert_booking(&booking).await.is_err());
    }
}

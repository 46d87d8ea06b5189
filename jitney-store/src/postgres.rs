use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jitney_catalog::{MenuItem, MenuRepository, OrderLine};
use jitney_domain::{
    Booking, BookingRepository, BookingStatus, PaymentStatus, StoreError, Trip, TripRepository,
    TripStatus,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed store. The compare-and-swap paths rely on single-statement
/// `UPDATE ... WHERE` guards, so every mutation of a trip's reserved seats is
/// serialized by the database row itself.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unavailable(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn trip_status_str(status: TripStatus) -> &'static str {
    match status {
        TripStatus::Scheduled => "SCHEDULED",
        TripStatus::InProgress => "IN_PROGRESS",
        TripStatus::Completed => "COMPLETED",
        TripStatus::Cancelled => "CANCELLED",
    }
}

fn parse_trip_status(s: &str) -> Result<TripStatus, StoreError> {
    match s {
        "SCHEDULED" => Ok(TripStatus::Scheduled),
        "IN_PROGRESS" => Ok(TripStatus::InProgress),
        "COMPLETED" => Ok(TripStatus::Completed),
        "CANCELLED" => Ok(TripStatus::Cancelled),
        other => Err(StoreError::Unavailable(format!(
            "corrupt trip status: {other}"
        ))),
    }
}

fn booking_status_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "PENDING",
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Completed => "COMPLETED",
    }
}

fn parse_booking_status(s: &str) -> Result<BookingStatus, StoreError> {
    match s {
        "PENDING" => Ok(BookingStatus::Pending),
        "CONFIRMED" => Ok(BookingStatus::Confirmed),
        "CANCELLED" => Ok(BookingStatus::Cancelled),
        "COMPLETED" => Ok(BookingStatus::Completed),
        other => Err(StoreError::Unavailable(format!(
            "corrupt booking status: {other}"
        ))),
    }
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "PENDING",
        PaymentStatus::Paid => "PAID",
        PaymentStatus::Refunded => "REFUNDED",
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, StoreError> {
    match s {
        "PENDING" => Ok(PaymentStatus::Pending),
        "PAID" => Ok(PaymentStatus::Paid),
        "REFUNDED" => Ok(PaymentStatus::Refunded),
        other => Err(StoreError::Unavailable(format!(
            "corrupt payment status: {other}"
        ))),
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    route_id: Uuid,
    driver_id: Uuid,
    departs_at: DateTime<Utc>,
    max_capacity: i32,
    reserved_capacity: i32,
    base_fare: i32,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TripRow {
    fn into_trip(self) -> Result<Trip, StoreError> {
        Ok(Trip {
            id: self.id,
            route_id: self.route_id,
            driver_id: self.driver_id,
            departs_at: self.departs_at,
            max_capacity: self.max_capacity,
            reserved_capacity: self.reserved_capacity,
            base_fare: self.base_fare,
            status: parse_trip_status(&self.status)?,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    customer_id: Uuid,
    party_size: i32,
    status: String,
    payment_status: String,
    total_amount: i32,
    lines: Json<Vec<OrderLine>>,
    special_requests: Option<String>,
    boarding_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        Ok(Booking {
            id: self.id,
            trip_id: self.trip_id,
            customer_id: self.customer_id,
            party_size: self.party_size,
            status: parse_booking_status(&self.status)?,
            payment_status: parse_payment_status(&self.payment_status)?,
            total_amount: self.total_amount,
            lines: self.lines.0,
            special_requests: self.special_requests,
            boarding_token: self.boarding_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    unit_price: i32,
    is_available: bool,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        MenuItem {
            id: row.id,
            name: row.name,
            description: row.description,
            unit_price: row.unit_price,
            is_available: row.is_available,
        }
    }
}

const TRIP_COLUMNS: &str = "id, route_id, driver_id, departs_at, max_capacity, reserved_capacity, base_fare, status, notes, created_at, updated_at";
const BOOKING_COLUMNS: &str = "id, trip_id, customer_id, party_size, status, payment_status, total_amount, lines, special_requests, boarding_token, created_at, updated_at";

#[async_trait]
impl TripRepository for PgStore {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO trips (id, route_id, driver_id, departs_at, max_capacity, reserved_capacity, base_fare, status, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(trip.id)
        .bind(trip.route_id)
        .bind(trip.driver_id)
        .bind(trip.departs_at)
        .bind(trip.max_capacity)
        .bind(trip.reserved_capacity)
        .bind(trip.base_fare)
        .bind(trip_status_str(trip.status))
        .bind(&trip.notes)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(TripRow::into_trip).transpose()
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, StoreError> {
        let rows = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips ORDER BY departs_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(TripRow::into_trip).collect()
    }

    async fn update_trip_checked(
        &self,
        trip: &Trip,
        expected_reserved: i32,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE trips SET route_id = $2, driver_id = $3, departs_at = $4, max_capacity = $5,
             base_fare = $6, status = $7, notes = $8, updated_at = NOW()
             WHERE id = $1 AND reserved_capacity = $9",
        )
        .bind(trip.id)
        .bind(trip.route_id)
        .bind(trip.driver_id)
        .bind(trip.departs_at)
        .bind(trip.max_capacity)
        .bind(trip.base_fare)
        .bind(trip_status_str(trip.status))
        .bind(&trip.notes)
        .bind(expected_reserved)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() == 1)
    }

    async fn compare_and_swap_reserved(
        &self,
        trip_id: Uuid,
        expected: i32,
        new: i32,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE trips SET reserved_capacity = $3, updated_at = NOW()
             WHERE id = $1 AND reserved_capacity = $2",
        )
        .bind(trip_id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() == 1)
    }

    async fn advance_trip_status(
        &self,
        trip_id: Uuid,
        from: TripStatus,
        to: TripStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE trips SET status = $3, updated_at = NOW()
             WHERE id = $1 AND status = $2",
        )
        .bind(trip_id)
        .bind(trip_status_str(from))
        .bind(trip_status_str(to))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_trip(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bookings (id, trip_id, customer_id, party_size, status, payment_status, total_amount, lines, special_requests, boarding_token, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(booking.customer_id)
        .bind(booking.party_size)
        .bind(booking_status_str(booking.status))
        .bind(payment_status_str(booking.payment_status))
        .bind(booking.total_amount)
        .bind(Json(&booking.lines))
        .bind(&booking.special_requests)
        .bind(&booking.boarding_token)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn update_booking_checked(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE bookings SET party_size = $2, status = $3, payment_status = $4,
             total_amount = $5, lines = $6, special_requests = $7, boarding_token = $8,
             updated_at = NOW()
             WHERE id = $1 AND status = $9 AND updated_at = $10",
        )
        .bind(booking.id)
        .bind(booking.party_size)
        .bind(booking_status_str(booking.status))
        .bind(payment_status_str(booking.payment_status))
        .bind(booking.total_amount)
        .bind(Json(&booking.lines))
        .bind(&booking.special_requests)
        .bind(&booking.boarding_token)
        .bind(booking_status_str(expected_status))
        .bind(expected_updated_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE trip_id = $1 ORDER BY created_at"
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn delete_for_trip(&self, trip_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM bookings WHERE trip_id = $1")
            .bind(trip_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for PgStore {
    async fn get_item(
        &self,
        id: Uuid,
    ) -> Result<Option<MenuItem>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, description, unit_price, is_available FROM menu_items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MenuItem::from))
    }

    async fn list_items(
        &self,
    ) -> Result<Vec<MenuItem>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, description, unit_price, is_available FROM menu_items ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MenuItem::from).collect())
    }

    async fn upsert_item(
        &self,
        item: &MenuItem,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO menu_items (id, name, description, unit_price, is_available)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE
             SET name = $2, description = $3, unit_price = $4, is_available = $5",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.unit_price)
        .bind(item.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use jitney_booking::BookingPatch;
use jitney_catalog::OrderLineRequest;
use jitney_domain::{Actor, Booking};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub customer_id: Uuid,
    pub party_size: i32,
    #[serde(default)]
    pub order: Vec<OrderLineRequest>,
    pub special_requests: Option<String>,
    #[serde(default = "default_actor")]
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    #[serde(default = "default_actor")]
    pub actor: Actor,
}

fn default_actor() -> Actor {
    Actor::Customer
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking).patch(edit_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/refund", post(refund_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .coordinator
        .create_booking(
            req.trip_id,
            req.customer_id,
            req.party_size,
            &req.order,
            req.special_requests,
            req.actor,
        )
        .await?;
    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.coordinator.get_booking(booking_id).await?))
}

async fn edit_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.coordinator.edit_booking(booking_id, patch).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(
        state.coordinator.cancel_booking(booking_id, req.actor).await?,
    ))
}

/// Administrative override outside the normal no-refund policy.
async fn refund_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.coordinator.refund_booking(booking_id).await?))
}

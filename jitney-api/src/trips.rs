use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use jitney_booking::{TripDraft, TripPatch};
use jitney_domain::{Actor, Trip};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TripStatusRequest {
    pub action: TripAction,
    #[serde(default = "default_actor")]
    pub actor: Actor,
}

fn default_actor() -> Actor {
    Actor::Admin
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripAction {
    Start,
    Complete,
    Cancel,
}

#[derive(Debug, Serialize)]
pub struct CapacitySnapshotResponse {
    pub trip_id: Uuid,
    pub reserved: i32,
    pub max: i32,
    pub available: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", get(list_trips).post(create_trip))
        .route(
            "/v1/trips/{id}",
            get(get_trip).patch(edit_trip).delete(delete_trip),
        )
        .route("/v1/trips/{id}/status", post(set_trip_status))
        .route("/v1/trips/{id}/capacity", get(capacity_snapshot))
}

async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, ApiError> {
    Ok(Json(state.scheduler.list_trips().await?))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, ApiError> {
    Ok(Json(state.scheduler.get_trip(trip_id).await?))
}

async fn create_trip(
    State(state): State<AppState>,
    Json(draft): Json<TripDraft>,
) -> Result<Json<Trip>, ApiError> {
    Ok(Json(state.scheduler.create_trip(draft).await?))
}

async fn edit_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(patch): Json<TripPatch>,
) -> Result<Json<Trip>, ApiError> {
    Ok(Json(state.scheduler.edit_trip(trip_id, patch).await?))
}

async fn set_trip_status(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<TripStatusRequest>,
) -> Result<Json<Trip>, ApiError> {
    let trip = match req.action {
        TripAction::Start => state.scheduler.start_trip(trip_id).await?,
        TripAction::Complete => state.scheduler.complete_trip(trip_id, req.actor).await?,
        TripAction::Cancel => state.scheduler.cancel_trip(trip_id, req.actor).await?,
    };
    Ok(Json(trip))
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.coordinator.delete_trip_cascade(trip_id).await?;
    Ok(Json(serde_json::json!({ "deleted": trip_id })))
}

async fn capacity_snapshot(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<CapacitySnapshotResponse>, ApiError> {
    let (reserved, max) = state.coordinator.ledger().capacity_snapshot(trip_id).await?;
    Ok(Json(CapacitySnapshotResponse {
        trip_id,
        reserved,
        max,
        available: max - reserved,
    }))
}

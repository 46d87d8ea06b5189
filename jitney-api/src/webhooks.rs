use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use jitney_booking::PaymentOutcome;
use jitney_domain::Booking;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhookRequest {
    pub booking_id: Uuid,
    pub outcome: PaymentOutcome,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/webhooks/payment", post(payment_webhook))
        .route("/v1/events/stream", get(event_stream))
}

/// Payment collaborator callback. The engine never initiates payment; it
/// only reacts to the reported outcome.
async fn payment_webhook(
    State(state): State<AppState>,
    Json(req): Json<PaymentWebhookRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .coordinator
        .apply_payment_outcome(req.booking_id, req.outcome)
        .await?;
    Ok(Json(booking))
}

/// Lifecycle events as SSE, for the notification collaborator and live
/// admin/driver screens.
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(Event::default().event("lifecycle").data(data)))
            }
            // Lagged receivers skip missed events rather than erroring out.
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default())
}

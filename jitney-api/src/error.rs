use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jitney_booking::BookingError;
use serde_json::json;

pub enum ApiError {
    Booking(BookingError),
    Internal(anyhow::Error),
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Booking(err) => (status_for(&err), err.to_string()),
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Capacity and transition conflicts are expected, user-recoverable
/// conditions; only store failures map to a 5xx the caller may retry.
fn status_for(err: &BookingError) -> StatusCode {
    match err {
        BookingError::CapacityExceeded { .. }
        | BookingError::TripNotBookable { .. }
        | BookingError::IllegalTripTransition { .. }
        | BookingError::IllegalTransition(_)
        | BookingError::BookingNotEditable { .. }
        | BookingError::TripHasActiveBookings(_) => StatusCode::CONFLICT,

        BookingError::TripNotFound(_) | BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,

        BookingError::InvalidMenuItem(_)
        | BookingError::ItemUnavailable(_)
        | BookingError::InvalidQuantity { .. }
        | BookingError::InvalidPartySize(_)
        | BookingError::InvalidCapacity(_) => StatusCode::BAD_REQUEST,

        BookingError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,

        BookingError::StoreUnavailable(msg) => {
            tracing::error!("store unavailable: {}", msg);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

use jitney_booking::{ReservationCoordinator, TripScheduler};
use jitney_catalog::MenuRepository;
use jitney_store::EventPublisher;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ReservationCoordinator>,
    pub scheduler: Arc<TripScheduler>,
    pub menu: Arc<dyn MenuRepository>,
    pub events: EventPublisher,
}

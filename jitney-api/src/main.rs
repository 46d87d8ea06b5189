use std::net::SocketAddr;
use std::sync::Arc;

use jitney_api::{app, AppState};
use jitney_booking::{ReservationCoordinator, TripScheduler};
use jitney_catalog::MenuRepository;
use jitney_domain::{BookingRepository, TripRepository};
use jitney_store::{app_config::Config, EventPublisher, MemoryStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jitney_api=debug,jitney_booking=debug,tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Jitney API on port {}", config.server.port);

    let events = EventPublisher::default();

    let (trips, bookings, menu): (
        Arc<dyn TripRepository>,
        Arc<dyn BookingRepository>,
        Arc<dyn MenuRepository>,
    ) = if config.database.url == "memory" {
        tracing::warn!("Using in-memory store; state will not survive restarts");
        let store = MemoryStore::new();
        (store.clone(), store.clone(), store)
    } else {
        let store = PgStore::connect(&config.database.url)
            .await
            .expect("Failed to connect to Postgres");
        store
            .run_migrations()
            .await
            .expect("Failed to run migrations");
        let store = Arc::new(store);
        (store.clone(), store.clone(), store)
    };

    let coordinator = Arc::new(ReservationCoordinator::new(
        trips.clone(),
        bookings.clone(),
        menu.clone(),
        events.clone(),
        &config.business_rules,
    ));
    let scheduler = Arc::new(TripScheduler::new(
        trips,
        bookings,
        coordinator.clone(),
        events.clone(),
        &config.business_rules,
    ));

    let app_state = AppState {
        coordinator,
        scheduler,
        menu,
        events,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

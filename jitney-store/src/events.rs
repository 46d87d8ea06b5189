use jitney_domain::LifecycleEvent;
use tokio::sync::broadcast;
use tracing::info;

/// Fan-out point for lifecycle events.
///
/// Consumers (notification collaborator, SSE streams) subscribe to the
/// broadcast channel; the engine never waits on them. Every event is also
/// logged so a lost subscriber does not mean a lost audit trail.
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: LifecycleEvent) {
        info!(trip_id = %event.trip_id(), event = ?event, "lifecycle event");
        // A send error only means there are no subscribers right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(128)
    }
}

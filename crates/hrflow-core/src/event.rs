use tokio::sync::broadcast;

use crate::types::SimulationEvent;

/// Live feed of a simulation run.
///
/// A run publishes `Started`, then one `Step` per log entry, then exactly one
/// of `Finished` (with the summary) or `Failed` (with the error text).
/// Subscribers only see events sent after they subscribed, and a subscriber
/// that falls more than `capacity` events behind gets `Lagged`.
pub struct EventBus {
    tx: broadcast::Sender<SimulationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Send to every current subscriber. Runs without listeners are normal.
    pub fn publish(&self, event: SimulationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    /// Room for the steps of a long walk before a slow printer lags.
    fn default() -> Self {
        Self::new(256)
    }
}

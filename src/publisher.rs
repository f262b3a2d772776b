//! Publishes order events to NATS when a client is configured.

use tracing::{debug, warn};

use crate::domain::events::OrderEvent;

#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Best effort; a failed publish is logged and dropped.
    pub async fn publish(&self, events: Vec<OrderEvent>) {
        let Some(nats) = &self.nats else { return };
        for event in events {
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => { warn!(error = %e, "unserializable order event"); continue; }
            };
            match nats.publish(event.subject().to_string(), payload.into()).await {
                Ok(()) => debug!(subject = event.subject(), "order event published"),
                Err(e) => warn!(subject = event.subject(), error = %e, "order event publish failed"),
            }
        }
    }
}

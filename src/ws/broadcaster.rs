use tracing::{debug, error, warn};

use super::registry::ConnectionRegistry;
use crate::models::NotificationEvent;

/// Fans notifications out to every registered client.
///
/// Delivery is best effort and at most once per client per event: a client
/// whose queue rejects the frame, or whose writer later fails to send it, is
/// closed and dropped. Nothing is retried.
#[derive(Clone)]
pub struct Broadcaster {
    registry: ConnectionRegistry,
}

impl Broadcaster {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Serialize `event` once and queue it on every connection.
    ///
    /// Returns the number of connections that accepted it. Queueing never
    /// waits on a socket; each client's writer sends in queue order.
    pub fn broadcast(&self, event: &NotificationEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!(
                    "Failed to serialize {} notification for list {}: {}",
                    event.kind(),
                    event.list_id(),
                    e
                );
                return 0;
            }
        };

        let targets = self.registry.snapshot();
        debug!(
            "Broadcasting {} for list {} to {} client(s)",
            event.kind(),
            event.list_id(),
            targets.len()
        );

        let mut queued = 0;
        for conn in &targets {
            match conn.enqueue_text(&payload) {
                Ok(()) => queued += 1,
                Err(e) => {
                    warn!("Dropping client {} after failed delivery: {}", conn.id(), e);
                    self.registry.close(conn);
                }
            }
        }
        queued
    }
}

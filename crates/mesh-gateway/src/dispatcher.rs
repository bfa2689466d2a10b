use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use mesh_feed::FeedError;
use mesh_types::events::ServerEvent;

use crate::registry::{Frame, SessionId, SessionRegistry};

/// Serializes events and pushes them to sessions.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn register(&self) -> (SessionId, mpsc::UnboundedReceiver<Frame>) {
        self.registry.register().await
    }

    pub async fn unregister(&self, session_id: SessionId) -> bool {
        self.registry.unregister(session_id).await
    }

    /// Deliver one event to every open session. Every recipient gets the same
    /// bytes. A dead session is logged and skipped; the rest still get the
    /// event. Returns the number of sessions the frame was handed to.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        for (session_id, tx) in self.registry.snapshot().await {
            if tx.is_closed() {
                continue;
            }
            match tx.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    let err = FeedError::TransportFailure(session_id.to_string());
                    warn!("Broadcast {}: {}", event.kind(), err);
                }
            }
        }

        debug!("Broadcast {} delivered to {} sessions", event.kind(), delivered);
        delivered
    }

    /// Unicast to one session. Returns false if it is gone.
    pub async fn send_to(&self, session_id: SessionId, event: &ServerEvent) -> bool {
        let Some(tx) = self.registry.sender(session_id).await else {
            return false;
        };
        let Some(frame) = encode(event) else {
            return false;
        };
        tx.send(frame).is_ok()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(event: &ServerEvent) -> Option<Frame> {
    match event.to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!("Failed to encode {} event: {}", event.kind(), e);
            None
        }
    }
}

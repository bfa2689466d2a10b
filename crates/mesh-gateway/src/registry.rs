use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

pub type SessionId = Uuid;

/// A serialized event, shared between every session it is delivered to.
pub type Frame = Arc<str>;

/// Live realtime connections, keyed by session id. Holds only the outbound
/// sender of each session; no feed state lives here.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, mpsc::UnboundedSender<Frame>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. The receiver yields every frame addressed to it.
    pub async fn register(&self) -> (SessionId, mpsc::UnboundedReceiver<Frame>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.write().await.insert(session_id, tx);
        (session_id, rx)
    }

    /// Returns false if the session was already gone.
    pub async fn unregister(&self, session_id: SessionId) -> bool {
        self.sessions.write().await.remove(&session_id).is_some()
    }

    pub async fn sender(&self, session_id: SessionId) -> Option<mpsc::UnboundedSender<Frame>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Copy of the live set. Broadcasting iterates this copy so sessions can
    /// come and go while a fan-out is in flight.
    pub async fn snapshot(&self) -> Vec<(SessionId, mpsc::UnboundedSender<Frame>)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_unregister() {
        let registry = SessionRegistry::new();
        let (a, _rx_a) = registry.register().await;
        let (b, _rx_b) = registry.register().await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);

        assert!(registry.unregister(a).await);
        assert!(!registry.unregister(a).await);
        assert_eq!(registry.len().await, 1);
        assert!(registry.sender(a).await.is_none());
        assert!(registry.sender(b).await.is_some());
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_the_live_set() {
        let registry = SessionRegistry::new();
        let (a, _rx) = registry.register().await;
        let snapshot = registry.snapshot().await;

        registry.unregister(a).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len().await, 0);
    }
}

//! Connection registry (spec.md §4.D).
//!
//! A process-wide map from user-id to a live session handle. `DashMap`
//! shards its internal locking per-bucket, so lookups and fan-out reads
//! never contend with each other the way a single `RwLock<HashMap<_>>`
//! would under the teacher's coarser scheme; insert still displaces and
//! closes any prior session for the same user-id (spec.md §9 open question,
//! resolved here rather than left as a silent overwrite).

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::wire::EgressEnvelope;

/// Bounded outbound queue to a single connected session (spec.md §4.E).
pub struct SessionHandle {
    pub user_id: String,
    sender: mpsc::Sender<EgressEnvelope>,
}

impl SessionHandle {
    pub fn new(user_id: String, capacity: usize) -> (Arc<Self>, mpsc::Receiver<EgressEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Arc::new(Self { user_id, sender }), receiver)
    }

    /// Enqueue an envelope for delivery. Blocks if the queue is full
    /// (spec.md §4.F back-pressure policy); returns an error if the
    /// session's write loop has already closed the channel.
    pub async fn enqueue(&self, envelope: EgressEnvelope) -> Result<(), ()> {
        self.sender.send(envelope).await.map_err(|_| ())
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, displacing and closing any prior one for the
    /// same user-id.
    pub fn insert(&self, handle: Arc<SessionHandle>) {
        if let Some((_, prior)) = self.sessions.remove(&handle.user_id) {
            warn!(user_id = %prior.user_id, "displacing prior session for new login");
            // Dropping the sender closes the channel; the prior write loop
            // observes a closed channel on its next recv and exits.
            drop(prior);
        }
        self.sessions.insert(handle.user_id.clone(), handle);
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(user_id).map(|entry| entry.clone())
    }

    pub fn remove(&self, user_id: &str) {
        self.sessions.remove(user_id);
    }

    /// Remove `user_id`'s entry only if it still points at `handle`. Used by
    /// a session's own close path so a displaced (and already-closed)
    /// session cannot race the ejection of a newer login under the same
    /// user-id (spec.md §9 double-login open question).
    pub fn remove_if_current(&self, user_id: &str, handle: &Arc<SessionHandle>) {
        self.sessions
            .remove_if(user_id, |_, current| Arc::ptr_eq(current, handle));
    }

    pub fn connected_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_displaces_prior_session() {
        let registry = ConnectionRegistry::new();
        let (first, mut first_rx) = SessionHandle::new("Uaaa".to_string(), 4);
        registry.insert(first);
        let (second, _second_rx) = SessionHandle::new("Uaaa".to_string(), 4);
        registry.insert(second);

        // The registry held the only strong reference to the first handle;
        // displacing it drops the sender, which closes the channel.
        assert!(first_rx.recv().await.is_none());
        assert_eq!(registry.connected_count(), 1);
    }

    #[test]
    fn lookup_returns_none_for_unknown_user() {
        let registry = ConnectionRegistry::new();
        assert!(registry.get("Uabc").is_none());
    }
}

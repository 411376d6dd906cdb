//! Session hub: live document groups and content relay.
//!
//! The hub owns the only shared mutable state on the real-time path, a table
//! mapping document ids to per-group broadcast channels. Joining subscribes a
//! connection to its document's channel, changes fan out over the channel to
//! every current subscriber, and persistence of the latest content runs as a
//! detached task so a storage outage never stalls live collaboration.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};

use super::store::ContentStore;
use crate::models::BroadcastMessage;

/// Capacity of each document group's broadcast channel. A subscriber that
/// falls further behind than this lags and resumes with newer messages,
/// which is acceptable for whole-content frames where the newest supersedes
/// everything missed.
const GROUP_BUFFER_SIZE: usize = 100;

pub struct SessionHub {
    store: Arc<dyn ContentStore>,
    /// Document id -> fan-out channel for the group's live connections
    groups: RwLock<HashMap<String, broadcast::Sender<BroadcastMessage>>>,
}

impl SessionHub {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Join a connection to a document's group and return the subscription
    /// together with the last persisted content as the baseline.
    ///
    /// A missing document is not an error at join time, it simply has no
    /// content yet; a failing store read degrades the same way. Joining never
    /// creates a document record. The caller is responsible for releasing any
    /// previous subscription before joining a new document.
    pub async fn join(
        &self,
        connection_id: &str,
        document_id: &str,
    ) -> (broadcast::Receiver<BroadcastMessage>, String) {
        let receiver = {
            let mut groups = self.groups.write().await;
            groups
                .entry(document_id.to_string())
                .or_insert_with(|| broadcast::channel(GROUP_BUFFER_SIZE).0)
                .subscribe()
        };
        info!("Connection {} joined document {}", connection_id, document_id);

        let baseline = match self.store.read(document_id).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!("No stored content for document {}, starting empty", document_id);
                String::new()
            }
            Err(e) => {
                error!("Failed to load baseline for document {}: {}", document_id, e);
                String::new()
            }
        };

        (receiver, baseline)
    }

    /// Relay a content change to the members of a document's group and kick
    /// off a persistence write for it.
    ///
    /// The relay is keyed by document id alone; whether the sender currently
    /// belongs to the group is not checked. Echo suppression happens on the
    /// receiving side via the envelope's sender id. The persistence write is
    /// fire-and-forget: the relay never waits on it, and a failure is logged
    /// and swallowed, never retried.
    pub async fn propagate_change(&self, connection_id: &str, document_id: &str, content: String) {
        let group = {
            let groups = self.groups.read().await;
            groups.get(document_id).cloned()
        };

        if let Some(tx) = group {
            let msg = BroadcastMessage {
                sender_id: connection_id.to_string(),
                content: content.clone(),
            };
            // Send only errors when no receiver is subscribed; nothing to deliver then.
            if tx.send(msg).is_err() {
                debug!("No live members for document {}, relay skipped", document_id);
            }
        }

        let store = Arc::clone(&self.store);
        let document_id = document_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.write(&document_id, &content).await {
                error!("Failed to persist content for document {}: {}", document_id, e);
            }
        });
    }

    /// Release a connection's membership in a document's group.
    ///
    /// Called after the connection dropped its receiver, on disconnect or on
    /// re-join. An emptied group's channel is discarded; the next join
    /// recreates it. No persistence happens here, the last propagated change
    /// already wrote the latest content.
    pub async fn leave(&self, connection_id: &str, document_id: &str) {
        let mut groups = self.groups.write().await;
        if let Some(tx) = groups.get(document_id) {
            if tx.receiver_count() == 0 {
                groups.remove(document_id);
                debug!("Document group {} emptied, dropping it", document_id);
            }
        }
        info!("Connection {} left document {}", connection_id, document_id);
    }

    /// Live document groups.
    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }

    /// Live connections across all groups.
    pub async fn connection_count(&self) -> usize {
        self.groups
            .read()
            .await
            .values()
            .map(|tx| tx.receiver_count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::handler::should_deliver;
    use crate::ws::store::testing::{FailingStore, MemoryStore};
    use std::time::Duration;
    use tokio::sync::broadcast::Receiver;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(50);

    fn hub_with(store: Arc<dyn ContentStore>) -> SessionHub {
        SessionHub::new(store)
    }

    /// Receive the next message addressed to `connection_id`, skipping its
    /// own echoes the way the connection task does.
    async fn recv_for(rx: &mut Receiver<BroadcastMessage>, connection_id: &str) -> Option<String> {
        loop {
            match timeout(TICK, rx.recv()).await {
                Ok(Ok(msg)) if should_deliver(&msg, connection_id) => return Some(msg.content),
                Ok(Ok(_)) => continue,
                _ => return None,
            }
        }
    }

    #[tokio::test]
    async fn join_returns_persisted_baseline() {
        let store = Arc::new(MemoryStore::with_content("doc-1", "stored text"));
        let hub = hub_with(store);
        let (_rx, baseline) = hub.join("a", "doc-1").await;
        assert_eq!(baseline, "stored text");
    }

    #[tokio::test]
    async fn join_missing_document_returns_empty_baseline() {
        let hub = hub_with(Arc::new(MemoryStore::new()));
        let (_rx, baseline) = hub.join("a", "never-created").await;
        assert_eq!(baseline, "");
    }

    #[tokio::test]
    async fn join_degrades_to_empty_baseline_on_store_failure() {
        let hub = hub_with(Arc::new(FailingStore));
        let (_rx, baseline) = hub.join("a", "doc-1").await;
        assert_eq!(baseline, "");
    }

    #[tokio::test]
    async fn change_reaches_everyone_but_the_sender() {
        let hub = hub_with(Arc::new(MemoryStore::new()));
        let (mut rx_a, _) = hub.join("a", "doc-1").await;
        let (mut rx_b, _) = hub.join("b", "doc-1").await;
        let (mut rx_c, _) = hub.join("c", "doc-1").await;

        hub.propagate_change("b", "doc-1", "hello".to_string()).await;

        assert_eq!(recv_for(&mut rx_a, "a").await.as_deref(), Some("hello"));
        assert_eq!(recv_for(&mut rx_c, "c").await.as_deref(), Some("hello"));
        // B's own copy is filtered out, so nothing is left for B.
        assert_eq!(recv_for(&mut rx_b, "b").await, None);
    }

    #[tokio::test]
    async fn change_is_scoped_to_its_document_group() {
        let hub = hub_with(Arc::new(MemoryStore::new()));
        let (mut rx_a, _) = hub.join("a", "doc-1").await;
        let (mut rx_b, _) = hub.join("b", "doc-2").await;

        hub.propagate_change("a", "doc-1", "only doc-1".to_string()).await;

        assert_eq!(recv_for(&mut rx_b, "b").await, None);
        // Sanity: the group itself did relay.
        hub.propagate_change("b", "doc-2", "only doc-2".to_string()).await;
        assert_eq!(recv_for(&mut rx_a, "a").await, None);
    }

    #[tokio::test]
    async fn left_connection_receives_nothing_further() {
        let hub = hub_with(Arc::new(MemoryStore::new()));
        let (mut rx_a, _) = hub.join("a", "doc-1").await;
        let (rx_b, _) = hub.join("b", "doc-1").await;

        drop(rx_b);
        hub.leave("b", "doc-1").await;

        hub.propagate_change("a", "doc-1", "after leave".to_string()).await;
        // A still in the group but is the sender, so nothing arrives anywhere.
        assert_eq!(recv_for(&mut rx_a, "a").await, None);
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn rejoin_moves_delivery_to_the_new_document() {
        let hub = hub_with(Arc::new(MemoryStore::new()));
        let (mut rx_b, _) = hub.join("b", "doc-a").await;

        // Connection i joins document A, then re-joins document B.
        let (rx_old, _) = hub.join("i", "doc-a").await;
        drop(rx_old);
        hub.leave("i", "doc-a").await;
        let (mut rx_i, _) = hub.join("i", "doc-b").await;

        hub.propagate_change("b", "doc-a", "change on A".to_string()).await;
        assert_eq!(recv_for(&mut rx_i, "i").await, None);

        let (_rx_c, _) = hub.join("c", "doc-b").await;
        hub.propagate_change("c", "doc-b", "change on B".to_string()).await;
        assert_eq!(recv_for(&mut rx_i, "i").await.as_deref(), Some("change on B"));
        // The old group still works for its remaining member.
        hub.propagate_change("x", "doc-a", "still on A".to_string()).await;
        assert_eq!(recv_for(&mut rx_b, "b").await.as_deref(), Some("still on A"));
    }

    #[tokio::test]
    async fn empty_group_is_garbage_collected() {
        let hub = hub_with(Arc::new(MemoryStore::new()));
        let (rx, _) = hub.join("a", "doc-1").await;
        assert_eq!(hub.group_count().await, 1);

        drop(rx);
        hub.leave("a", "doc-1").await;
        assert_eq!(hub.group_count().await, 0);
    }

    #[tokio::test]
    async fn change_without_any_member_still_persists() {
        let store = Arc::new(MemoryStore::new());
        let hub = hub_with(store.clone());

        // No join ever happened for this document.
        hub.propagate_change("ghost", "doc-1", "unseen".to_string()).await;
        tokio::time::sleep(TICK).await;

        assert_eq!(store.stored("doc-1").as_deref(), Some("unseen"));
    }

    #[tokio::test]
    async fn persistence_failure_does_not_break_the_relay() {
        let hub = hub_with(Arc::new(FailingStore));
        let (mut rx_a, _) = hub.join("a", "doc-1").await;
        let (_rx_b, _) = hub.join("b", "doc-1").await;

        hub.propagate_change("b", "doc-1", "kept live".to_string()).await;
        assert_eq!(recv_for(&mut rx_a, "a").await.as_deref(), Some("kept live"));
    }

    #[tokio::test]
    async fn last_completed_write_wins() {
        let store = Arc::new(MemoryStore::new());
        let hub = hub_with(store.clone());
        let (_rx_a, _) = hub.join("a", "doc-1").await;
        let (_rx_b, _) = hub.join("b", "doc-1").await;

        // C1 is sent first but its write is slower, so it commits after C2.
        store.delay_write_of("C1", Duration::from_millis(100));
        hub.propagate_change("a", "doc-1", "C1".to_string()).await;
        hub.propagate_change("b", "doc-1", "C2".to_string()).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (_rx_d, baseline) = hub.join("d", "doc-1").await;
        assert_eq!(baseline, "C1");
        assert_eq!(store.stored("doc-1").as_deref(), Some("C1"));
    }

    #[tokio::test]
    async fn concrete_three_editor_scenario() {
        let store = Arc::new(MemoryStore::new());
        let hub = hub_with(store.clone());

        // A, B, C join doc-1, which starts empty.
        let (mut rx_a, base_a) = hub.join("A", "doc-1").await;
        let (mut rx_b, base_b) = hub.join("B", "doc-1").await;
        let (mut rx_c, base_c) = hub.join("C", "doc-1").await;
        assert_eq!((base_a.as_str(), base_b.as_str(), base_c.as_str()), ("", "", ""));

        // B sends "hello": A and C receive it, B does not.
        hub.propagate_change("B", "doc-1", "hello".to_string()).await;
        assert_eq!(recv_for(&mut rx_a, "A").await.as_deref(), Some("hello"));
        assert_eq!(recv_for(&mut rx_c, "C").await.as_deref(), Some("hello"));
        assert_eq!(recv_for(&mut rx_b, "B").await, None);

        // A fresh join by D sees the persisted "hello".
        tokio::time::sleep(TICK).await;
        let (rx_d, base_d) = hub.join("D", "doc-1").await;
        assert_eq!(base_d, "hello");
        drop(rx_d);
        hub.leave("D", "doc-1").await;

        // C disconnects; B sends "hello world" and only A receives it.
        drop(rx_c);
        hub.leave("C", "doc-1").await;
        hub.propagate_change("B", "doc-1", "hello world".to_string()).await;
        assert_eq!(recv_for(&mut rx_a, "A").await.as_deref(), Some("hello world"));

        // A later join sees the newest content.
        tokio::time::sleep(TICK).await;
        let (_rx_e, base_e) = hub.join("E", "doc-1").await;
        assert_eq!(base_e, "hello world");
    }
}

//! Durable delivery queue between webhook ingestion and dispatch.
//!
//! Entries are JSON-encoded `QueuedDelivery` values on a shared list:
//! enqueue pushes to the front, dequeue pops from the back, so entries
//! enqueued once are served oldest-first. A failed entry is requeued at the
//! front with its attempt count bumped, which places it behind everything
//! already waiting — a poison item cannot starve the queue by retrying in a
//! tight loop. Once an entry has failed `RETRY_CAP` times it is dropped.

pub mod store;

use thiserror::Error;

use herald_common::types::QueuedDelivery;

use crate::store::ListStore;

/// Number of failed attempts at which an entry stops being requeued.
pub const RETRY_CAP: u32 = 3;

/// Errors surfaced by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The enqueue/dequeue/requeue protocol over a list store.
#[derive(Clone)]
pub struct DeliveryQueue<S: ListStore> {
    store: S,
}

impl<S: ListStore> DeliveryQueue<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Encode and push an entry. Returns whether the entry reached the store;
    /// an unreachable store is reported as `false`, never an error, so
    /// callers decide how tolerant to be.
    pub async fn enqueue(&mut self, entry: &QueuedDelivery) -> bool {
        let encoded = match serde_json::to_string(entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode delivery entry");
                return false;
            }
        };

        match self.store.push_front(encoded).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    payload_id = %entry.payload_id,
                    error = %e,
                    "Failed to enqueue delivery"
                );
                false
            }
        }
    }

    /// Pop the oldest waiting entry, or `None` when the queue is empty.
    ///
    /// Entries missing the `attempts` field decode with `attempts == 0`, so
    /// a consumer can drain lists written by older producers.
    pub async fn dequeue(&mut self) -> Result<Option<QueuedDelivery>, QueueError> {
        let Some(raw) = self.store.pop_back().await? else {
            return Ok(None);
        };

        let entry = serde_json::from_str(&raw)?;
        Ok(Some(entry))
    }

    /// Put a failed entry back on the queue with its attempt count bumped,
    /// unless the retry budget is spent. Returns whether the entry was
    /// requeued; `false` means it has been dropped from the pipeline.
    pub async fn requeue_if_failed(&mut self, entry: &QueuedDelivery) -> bool {
        if entry.attempts >= RETRY_CAP {
            return false;
        }

        let retry = QueuedDelivery {
            attempts: entry.attempts + 1,
            ..entry.clone()
        };
        self.enqueue(&retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::store::MemoryListStore;

    fn make_entry(attempts: u32) -> QueuedDelivery {
        QueuedDelivery {
            board_id: Uuid::new_v4(),
            webhook_id: Uuid::new_v4(),
            payload_id: Uuid::new_v4(),
            received_at: Utc::now(),
            attempts,
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ListStore for FailingStore {
        async fn push_front(&mut self, _value: String) -> Result<(), QueueError> {
            Err(QueueError::Store("connection refused".to_string()))
        }

        async fn pop_back(&mut self) -> Result<Option<String>, QueueError> {
            Err(QueueError::Store("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_entry() {
        for attempts in [0, 1, 2] {
            let mut queue = DeliveryQueue::new(MemoryListStore::new());
            let entry = make_entry(attempts);

            assert!(queue.enqueue(&entry).await);
            let dequeued = queue.dequeue().await.unwrap();
            assert_eq!(dequeued, Some(entry));
        }
    }

    #[tokio::test]
    async fn test_dequeue_empty_returns_none() {
        let mut queue = DeliveryQueue::new(MemoryListStore::new());
        assert_eq!(queue.dequeue().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fresh_entries_dequeue_in_fifo_order() {
        let mut queue = DeliveryQueue::new(MemoryListStore::new());
        let first = make_entry(0);
        let second = make_entry(0);

        assert!(queue.enqueue(&first).await);
        assert!(queue.enqueue(&second).await);

        assert_eq!(queue.dequeue().await.unwrap(), Some(first));
        assert_eq!(queue.dequeue().await.unwrap(), Some(second));
        assert_eq!(queue.dequeue().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_requeue_bumps_attempts_below_cap() {
        for attempts in [0, 1, 2] {
            let mut queue = DeliveryQueue::new(MemoryListStore::new());
            let entry = make_entry(attempts);

            assert!(queue.requeue_if_failed(&entry).await);

            let requeued = queue.dequeue().await.unwrap().unwrap();
            assert_eq!(requeued.attempts, attempts + 1);
            assert_eq!(requeued.board_id, entry.board_id);
            assert_eq!(requeued.webhook_id, entry.webhook_id);
            assert_eq!(requeued.payload_id, entry.payload_id);
        }
    }

    #[tokio::test]
    async fn test_requeue_drops_entry_at_cap() {
        for attempts in [RETRY_CAP, RETRY_CAP + 1] {
            let store = MemoryListStore::new();
            let mut queue = DeliveryQueue::new(store.clone());
            let entry = make_entry(attempts);

            assert!(!queue.requeue_if_failed(&entry).await);
            assert!(store.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_requeue_reports_false_when_store_push_fails() {
        // Indistinguishable from the cap by return value alone; callers that
        // need the cause must check the entry's attempts themselves.
        let mut queue = DeliveryQueue::new(FailingStore);
        assert!(!queue.requeue_if_failed(&make_entry(0)).await);
    }

    #[tokio::test]
    async fn test_requeued_entry_waits_behind_existing_entries() {
        let mut queue = DeliveryQueue::new(MemoryListStore::new());
        let waiting = make_entry(0);
        let failed = make_entry(1);

        assert!(queue.enqueue(&waiting).await);
        assert!(queue.requeue_if_failed(&failed).await);

        // The entry that was already waiting is served first.
        assert_eq!(queue.dequeue().await.unwrap(), Some(waiting));
        let retried = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(retried.payload_id, failed.payload_id);
        assert_eq!(retried.attempts, 2);
    }

    #[tokio::test]
    async fn test_legacy_entry_without_attempts_decodes_as_zero() {
        let mut store = MemoryListStore::new();
        let board_id = Uuid::new_v4();
        let webhook_id = Uuid::new_v4();
        let payload_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"board_id":"{board_id}","webhook_id":"{webhook_id}","payload_id":"{payload_id}","received_at":"2024-11-05T08:30:00Z"}}"#
        );
        store.push_front(raw).await.unwrap();

        let mut queue = DeliveryQueue::new(store);
        let entry = queue.dequeue().await.unwrap().unwrap();

        assert_eq!(entry.board_id, board_id);
        assert_eq!(entry.webhook_id, webhook_id);
        assert_eq!(entry.payload_id, payload_id);
        assert_eq!(entry.attempts, 0);
    }

    #[tokio::test]
    async fn test_dequeue_surfaces_decode_error() {
        let mut store = MemoryListStore::new();
        store.push_front("not json".to_string()).await.unwrap();

        let mut queue = DeliveryQueue::new(store);
        assert!(matches!(
            queue.dequeue().await,
            Err(QueueError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_enqueue_reports_false_on_store_failure() {
        let mut queue = DeliveryQueue::new(FailingStore);
        assert!(!queue.enqueue(&make_entry(0)).await);
    }

    #[tokio::test]
    async fn test_wire_format_field_names() {
        let store = MemoryListStore::new();
        let mut inspect = store.clone();
        let mut queue = DeliveryQueue::new(store);
        let entry = make_entry(1);

        assert!(queue.enqueue(&entry).await);

        let raw = inspect.pop_back().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["board_id"], entry.board_id.to_string());
        assert_eq!(value["webhook_id"], entry.webhook_id.to_string());
        assert_eq!(value["payload_id"], entry.payload_id.to_string());
        assert_eq!(value["attempts"], 1);
        assert!(value["received_at"].is_string());
    }
}

//! List store backends for the delivery queue.
//!
//! The queue only ever needs two primitives — push an encoded entry onto the
//! front of a list, pop one off the back — so the backend hides behind the
//! `ListStore` trait. `RedisListStore` is the production backend; every
//! process that enqueues or drains shares the same Redis list.
//! `MemoryListStore` mirrors the same semantics for tests and local runs.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;

use crate::QueueError;

/// Redis list key holding pending webhook deliveries.
pub const DELIVERY_QUEUE_KEY: &str = "board-herald:dispatch-queue";

/// A shared list reachable by every producer and consumer process.
///
/// Both operations must be atomic on the backend; the queue protocol never
/// spans multiple store calls.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Push an encoded entry onto the front of the list.
    async fn push_front(&mut self, value: String) -> Result<(), QueueError>;

    /// Pop one encoded entry off the back of the list.
    /// Returns `None` when the list is empty.
    async fn pop_back(&mut self) -> Result<Option<String>, QueueError>;
}

/// Redis-backed list store (LPUSH / RPOP on a single key).
#[derive(Clone)]
pub struct RedisListStore {
    conn: ConnectionManager,
    key: String,
}

impl RedisListStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self::with_key(conn, DELIVERY_QUEUE_KEY)
    }

    /// Use a non-default list key. Integration tests use this to isolate
    /// queues on a shared Redis instance.
    pub fn with_key(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    async fn push_front(&mut self, value: String) -> Result<(), QueueError> {
        self.conn
            .lpush::<_, _, ()>(&self.key, value)
            .await
            .map_err(|e| QueueError::Store(e.to_string()))
    }

    async fn pop_back(&mut self) -> Result<Option<String>, QueueError> {
        self.conn
            .rpop::<_, Option<String>>(&self.key, None)
            .await
            .map_err(|e| QueueError::Store(e.to_string()))
    }
}

/// In-memory list store with the same push-front/pop-back semantics.
///
/// Clones share the underlying list, so a test can hold one handle while the
/// queue under test holds another.
#[derive(Clone, Default)]
pub struct MemoryListStore {
    items: Arc<Mutex<VecDeque<String>>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently waiting.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn push_front(&mut self, value: String) -> Result<(), QueueError> {
        self.items.lock().await.push_front(value);
        Ok(())
    }

    async fn pop_back(&mut self) -> Result<Option<String>, QueueError> {
        Ok(self.items.lock().await.pop_back())
    }
}

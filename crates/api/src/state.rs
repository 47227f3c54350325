//! Shared application state for the Axum API server.

use sqlx::PgPool;

use herald_queue::DeliveryQueue;
use herald_queue::store::ListStore;

/// Application state shared across all route handlers via Axum `State`.
///
/// Generic over the queue's list store; the binary wires in Redis, tests can
/// wire in an in-memory or failing store.
#[derive(Clone)]
pub struct AppState<S: ListStore> {
    pub pool: PgPool,
    pub queue: DeliveryQueue<S>,
}

impl<S: ListStore> AppState<S> {
    pub fn new(pool: PgPool, queue: DeliveryQueue<S>) -> Self {
        Self { pool, queue }
    }
}

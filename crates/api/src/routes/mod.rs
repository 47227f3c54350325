pub mod health;
pub mod webhooks;

use axum::Router;

use herald_queue::store::ListStore;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: ListStore + Clone + 'static,
{
    Router::new()
        .merge(health::router())
        .merge(webhooks::router())
        .with_state(state)
}

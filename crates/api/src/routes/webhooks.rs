//! Board webhook ingestion.
//!
//! Accepts arbitrary JSON deliveries addressed to a board's webhook, persists
//! the raw payload and a board-memory record, and enqueues the delivery for
//! the dispatch worker. The endpoint never talks to a gateway itself.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Board, BoardWebhook, QueuedDelivery};
use herald_queue::store::ListStore;

use crate::state::AppState;

pub fn router<S>() -> Router<AppState<S>>
where
    S: ListStore + Clone + 'static,
{
    Router::new().route(
        "/boards/{board_id}/webhooks/{webhook_id}",
        post(ingest_webhook::<S>),
    )
}

/// POST /boards/:board_id/webhooks/:webhook_id — Accept one webhook delivery.
///
/// Responds `202 Accepted` once the payload is durably stored and enqueued.
/// A disabled webhook is rejected with `410 Gone` before anything is written.
async fn ingest_webhook<S>(
    State(state): State<AppState<S>>,
    Path((board_id, webhook_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError>
where
    S: ListStore + Clone + 'static,
{
    let board: Board = sqlx::query_as("SELECT * FROM boards WHERE id = $1")
        .bind(board_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Board {} not found", board_id)))?;

    let webhook: BoardWebhook =
        sqlx::query_as("SELECT * FROM board_webhooks WHERE id = $1 AND board_id = $2")
            .bind(webhook_id)
            .bind(board_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Webhook {} not found", webhook_id)))?;

    if !webhook.enabled {
        return Err(AppError::WebhookDisabled);
    }

    let payload_id = Uuid::new_v4();
    let received_at = Utc::now();

    // The payload row and its memory record commit together.
    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "INSERT INTO board_webhook_payloads (id, board_id, webhook_id, payload, headers, received_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(payload_id)
    .bind(board_id)
    .bind(webhook_id)
    .bind(&payload)
    .bind(headers_to_json(&headers))
    .bind(received_at)
    .execute(&mut *tx)
    .await?;

    let content = format!(
        "Webhook event stored for dispatch.\n\nWebhook: {}\nPayload ID: {}",
        webhook.description, payload_id
    );
    let tags = json!([
        format!("webhook:{}", webhook_id),
        format!("payload:{}", payload_id),
    ]);

    sqlx::query(
        "INSERT INTO board_memory (id, board_id, source, content, tags)
         VALUES ($1, $2, 'webhook', $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(board_id)
    .bind(&content)
    .bind(&tags)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let entry = QueuedDelivery {
        board_id,
        webhook_id,
        payload_id,
        received_at,
        attempts: 0,
    };

    // The payload is already durable; a queue outage must not turn the
    // delivery into a sender-visible failure.
    let mut queue = state.queue.clone();
    if !queue.enqueue(&entry).await {
        tracing::warn!(
            payload_id = %payload_id,
            "Payload stored but not enqueued for dispatch"
        );
    }

    tracing::info!(
        board = %board.name,
        webhook_id = %webhook_id,
        payload_id = %payload_id,
        "Webhook delivery accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "board_id": board_id,
            "webhook_id": webhook_id,
            "payload_id": payload_id,
        })),
    ))
}

/// Flatten request headers into a JSON object with lowercased keys.
///
/// Duplicate names keep the last value; values that are not valid UTF-8 are
/// skipped.
fn headers_to_json(headers: &HeaderMap) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        if let Ok(text) = value.to_str() {
            map.insert(
                name.as_str().to_string(),
                serde_json::Value::String(text.to_string()),
            );
        }
    }
    serde_json::Value::Object(map)
}

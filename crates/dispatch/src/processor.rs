//! Delivery processing.
//!
//! For each queued entry:
//! 1. Resolve the referenced webhook, board, and stored payload
//! 2. Resolve the board's gateway and lead agent session
//! 3. Compose the notification text and deliver it via the gateway
//!
//! Resolution and delivery failures propagate so the worker can requeue.
//! A board with no reachable recipient — no gateway, no lead agent, or a
//! lead without a session key — is logged and treated as done; retrying
//! cannot make a recipient appear, and the payload row stays stored.

use async_trait::async_trait;
use sqlx::PgPool;

use herald_common::types::{
    Agent, Board, BoardWebhook, BoardWebhookPayload, Gateway, QueuedDelivery,
};

use crate::gateway::AgentMessenger;

/// Handling of one dequeued delivery. The worker loop treats any error as
/// retryable.
#[async_trait]
pub trait ProcessDelivery: Send + Sync {
    async fn process(&self, entry: &QueuedDelivery) -> anyhow::Result<()>;
}

/// Resolves queue entries against Postgres and notifies the board lead.
pub struct ItemProcessor<M: AgentMessenger> {
    pool: PgPool,
    messenger: M,
}

impl<M: AgentMessenger> ItemProcessor<M> {
    pub fn new(pool: PgPool, messenger: M) -> Self {
        Self { pool, messenger }
    }

    /// Resolve the gateway and lead session for a board.
    ///
    /// `None` means the board has no reachable recipient. That condition is
    /// permanent, not retryable.
    async fn resolve_recipient(&self, board: &Board) -> anyhow::Result<Option<(Gateway, String)>> {
        let gateway_id = match board.gateway_id {
            Some(id) => id,
            None => {
                tracing::info!(
                    board_id = %board.id,
                    "Board has no gateway configured, skipping notification"
                );
                return Ok(None);
            }
        };

        let gateway: Option<Gateway> = sqlx::query_as("SELECT * FROM gateways WHERE id = $1")
            .bind(gateway_id)
            .fetch_optional(&self.pool)
            .await?;

        let gateway = match gateway {
            Some(gateway) => gateway,
            None => {
                tracing::warn!(
                    board_id = %board.id,
                    gateway_id = %gateway_id,
                    "Gateway record missing, skipping notification"
                );
                return Ok(None);
            }
        };

        let lead: Option<Agent> = sqlx::query_as(
            "SELECT * FROM agents WHERE board_id = $1 AND is_board_lead = true LIMIT 1",
        )
        .bind(board.id)
        .fetch_optional(&self.pool)
        .await?;

        let lead = match lead {
            Some(lead) => lead,
            None => {
                tracing::info!(
                    board_id = %board.id,
                    "Board has no lead agent, skipping notification"
                );
                return Ok(None);
            }
        };

        match lead.session_key {
            Some(session_key) => Ok(Some((gateway, session_key))),
            None => {
                tracing::info!(
                    board_id = %board.id,
                    agent = %lead.name,
                    "Lead agent has no session key, skipping notification"
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl<M: AgentMessenger> ProcessDelivery for ItemProcessor<M> {
    async fn process(&self, entry: &QueuedDelivery) -> anyhow::Result<()> {
        let webhook: BoardWebhook =
            sqlx::query_as("SELECT * FROM board_webhooks WHERE id = $1 AND board_id = $2")
                .bind(entry.webhook_id)
                .bind(entry.board_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Webhook {} not found", entry.webhook_id))?;

        let board: Board = sqlx::query_as("SELECT * FROM boards WHERE id = $1")
            .bind(entry.board_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Board {} not found", entry.board_id))?;

        let payload: BoardWebhookPayload =
            sqlx::query_as("SELECT * FROM board_webhook_payloads WHERE id = $1")
                .bind(entry.payload_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Payload {} not found", entry.payload_id))?;

        let Some((gateway, session_key)) = self.resolve_recipient(&board).await? else {
            return Ok(());
        };

        let message = compose_notification(&board, &webhook, &payload);
        self.messenger
            .send_message(&gateway, &session_key, &message)
            .await?;

        tracing::info!(
            board_id = %board.id,
            payload_id = %entry.payload_id,
            attempts = entry.attempts,
            "Board lead notified of webhook delivery"
        );

        Ok(())
    }
}

/// Build the notification text delivered to a board's lead session.
///
/// The webhook's description is quoted verbatim; the payload id ties the
/// message back to the stored payload and the board-memory tags.
pub fn compose_notification(
    board: &Board,
    webhook: &BoardWebhook,
    payload: &BoardWebhookPayload,
) -> String {
    format!(
        "WEBHOOK EVENT RECEIVED\n\n\
         Board: {}\n\
         Webhook: {}\n\
         Payload ID: {}\n\
         Received at: {}\n\n\
         The raw payload is stored on the board and tagged payload:{}.",
        board.name,
        webhook.description,
        payload.id,
        payload.received_at.to_rfc3339(),
        payload.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_board() -> Board {
        Board {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            gateway_id: Some(Uuid::new_v4()),
            name: "Launch board".to_string(),
            slug: "launch-board".to_string(),
            description: Some("Board for launch automation.".to_string()),
            created_at: Utc::now(),
        }
    }

    fn make_webhook(board_id: Uuid, description: &str) -> BoardWebhook {
        BoardWebhook {
            id: Uuid::new_v4(),
            board_id,
            description: description.to_string(),
            enabled: true,
            created_at: Utc::now(),
        }
    }

    fn make_payload(board_id: Uuid, webhook_id: Uuid) -> BoardWebhookPayload {
        BoardWebhookPayload {
            id: Uuid::new_v4(),
            board_id,
            webhook_id,
            payload: serde_json::json!({"event": "deploy"}),
            headers: serde_json::json!({"content-type": "application/json"}),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_compose_notification_carries_marker_and_payload_id() {
        let board = make_board();
        let webhook = make_webhook(board.id, "Triage payload and create tasks.");
        let payload = make_payload(board.id, webhook.id);

        let message = compose_notification(&board, &webhook, &payload);

        assert!(message.starts_with("WEBHOOK EVENT RECEIVED"));
        assert!(message.contains(&format!("Payload ID: {}", payload.id)));
        assert!(message.contains("Launch board"));
    }

    #[test]
    fn test_compose_notification_quotes_description_verbatim() {
        let board = make_board();
        let description = "Escalate only if status != \"resolved\"; page the on-call.";
        let webhook = make_webhook(board.id, description);
        let payload = make_payload(board.id, webhook.id);

        let message = compose_notification(&board, &webhook, &payload);

        assert!(message.contains(description));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Liveness of an agent as reported by its gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Online => write!(f, "online"),
            AgentStatus::Offline => write!(f, "offline"),
        }
    }
}

/// A single webhook invocation awaiting lead notification.
///
/// Lives only inside the delivery queue — it is never a database row. The
/// referenced payload, webhook, and board records are owned by Postgres.
/// Requeueing after a failed attempt produces a fresh entry with `attempts`
/// bumped by one; entries are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedDelivery {
    pub board_id: Uuid,
    pub webhook_id: Uuid,
    pub payload_id: Uuid,
    /// When the ingestion endpoint accepted the webhook.
    pub received_at: DateTime<Utc>,
    /// Count of prior failed processing attempts. Entries written before this
    /// field existed decode as zero.
    #[serde(default)]
    pub attempts: u32,
}

/// A messaging gateway through which a board's agent sessions are reached.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Gateway {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub url: String,
    pub workspace_root: String,
    pub created_at: DateTime<Utc>,
}

/// A board that inbound webhooks target.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Gateway used to reach this board's agents. A board without one has no
    /// notification recipient.
    pub gateway_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An agent attached to a board. The lead agent's session is the delivery
/// target for webhook notifications.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub board_id: Uuid,
    pub gateway_id: Option<Uuid>,
    pub name: String,
    pub status: AgentStatus,
    pub session_key: Option<String>,
    pub is_board_lead: bool,
    pub created_at: DateTime<Utc>,
}

/// An inbound webhook endpoint registered on a board.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardWebhook {
    pub id: Uuid,
    pub board_id: Uuid,
    /// Operator-facing note on what the webhook is for; quoted verbatim in
    /// lead notifications.
    pub description: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// A raw webhook payload exactly as received.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardWebhookPayload {
    pub id: Uuid,
    pub board_id: Uuid,
    pub webhook_id: Uuid,
    pub payload: serde_json::Value,
    /// Request headers with lowercased names.
    pub headers: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// One entry in a board's memory log.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardMemory {
    pub id: Uuid,
    pub board_id: Uuid,
    pub source: String,
    pub content: String,
    pub tags: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

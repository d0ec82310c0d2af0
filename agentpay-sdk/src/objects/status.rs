//! Agent status and payment status responses.

use serde::{Deserialize, Serialize};

/// Response of `GET /api/agent/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub watcher: WatcherStatus,
    pub executor: ExecutorStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStatus {
    pub status: String,
    /// RFC 3339 time of the last completed poll cycle.
    pub last_poll: Option<String>,
    pub poll_cycles: u64,
    pub feed_failures: u64,
    pub events_forwarded: u64,
    pub publish_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorStatus {
    pub status: String,
    /// RFC 3339 time of the last received topic message.
    pub last_message: Option<String>,
    pub messages_received: u64,
    pub messages_discarded: u64,
    pub settlements_completed: u64,
    pub settlements_rejected: u64,
    pub duplicates_skipped: u64,
}

/// Response of `GET /api/payments/{tx_hash}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_tx_id: Option<String>,
    /// `pending`, `settled` or `failed`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

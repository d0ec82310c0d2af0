//! Ledger network, operator account and topic configuration.

use agentpay_sdk::objects::{AccountId, TopicId};
use std::fmt;
use url::Url;

/// Which ledger the agents talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerNetwork {
    /// In-process sandbox ledger, also served over HTTP by this server.
    Local,
    /// A remote ledger gateway speaking the `/api/ledger` protocol.
    Gateway { url: Url },
}

impl fmt::Display for LedgerNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerNetwork::Local => write!(f, "local"),
            LedgerNetwork::Gateway { url } => write!(f, "gateway({url})"),
        }
    }
}

/// The operating (treasury) account that pays settlements.
#[derive(Clone)]
pub struct OperatorConfig {
    pub account_id: AccountId,
    /// Key used to sign ledger gateway writes.
    pub private_key: Box<[u8]>,
    /// Sandbox only: tiny units credited to the operator at startup.
    pub initial_balance: i64,
}

impl OperatorConfig {
    pub fn private_key_bytes(&self) -> &[u8] {
        &self.private_key
    }
}

impl fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("account_id", &self.account_id)
            .field("private_key", &"<redacted>")
            .field("initial_balance", &self.initial_balance)
            .finish()
    }
}

/// Topic ids of the two settlement channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicsConfig {
    /// Watcher → executor.
    pub trigger: TopicId,
    /// Executor → downstream consumers.
    pub confirmation: TopicId,
}

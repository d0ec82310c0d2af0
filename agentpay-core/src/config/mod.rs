//! Validated runtime configuration.
//!
//! These types are what the processors and ledger adapters are built from.
//! Loading and parsing (TOML file, environment, CLI) is handled by the
//! server crate, which converts its file structs into these.

mod agents;
mod ledger;

pub use agents::{ExecutorConfig, WatcherConfig};
pub use ledger::{LedgerNetwork, OperatorConfig, TopicsConfig};

use crate::units::UnitConverter;
use agentpay_sdk::objects::Merchant;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Everything needed to assemble the pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub network: LedgerNetwork,
    pub operator: OperatorConfig,
    pub topics: TopicsConfig,
    /// Root URL of the deposit feed.
    pub feed_url: Url,
    pub poll_interval: Duration,
    /// Path of the append-only settlement audit log.
    pub audit_log: PathBuf,
    /// Timeout applied to every outgoing HTTP request.
    pub http_timeout: Duration,
    pub units: UnitConverter,
    /// Initial contents of the merchant registry.
    pub merchants: Vec<Merchant>,
}

impl AgentConfig {
    pub fn watcher(&self) -> WatcherConfig {
        WatcherConfig {
            feed_url: self.feed_url.clone(),
            poll_interval: self.poll_interval,
            trigger_topic: self.topics.trigger,
        }
    }

    pub fn executor(&self) -> ExecutorConfig {
        ExecutorConfig {
            operator_account: self.operator.account_id,
            trigger_topic: self.topics.trigger,
            confirmation_topic: self.topics.confirmation,
        }
    }
}

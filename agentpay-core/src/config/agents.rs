//! Per-processor configuration.

use agentpay_sdk::objects::{AccountId, TopicId};
use std::time::Duration;
use url::Url;

/// Configuration of the deposit watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Root URL of the deposit feed.
    pub feed_url: Url,
    /// Delay between the end of one poll cycle and the start of the next.
    pub poll_interval: Duration,
    /// Topic the settlement triggers are published to.
    pub trigger_topic: TopicId,
}

/// Configuration of the settlement executor.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Account debited by every settlement.
    pub operator_account: AccountId,
    pub trigger_topic: TopicId,
    pub confirmation_topic: TopicId,
}

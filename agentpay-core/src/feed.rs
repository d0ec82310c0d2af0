//! Source of deposit events for the watcher.

use agentpay_sdk::client::{ClientError, FeedClient};
use agentpay_sdk::objects::DepositEvent;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("deposit feed unavailable: {0}")]
    Unavailable(String),
}

impl From<ClientError> for FeedError {
    fn from(value: ClientError) -> Self {
        FeedError::Unavailable(value.to_string())
    }
}

/// Returns the complete deposit list on every call; there is no cursor.
#[async_trait]
pub trait DepositFeed: Send + Sync {
    async fn fetch_deposits(&self) -> Result<Vec<DepositEvent>, FeedError>;
}

#[async_trait]
impl DepositFeed for FeedClient {
    async fn fetch_deposits(&self) -> Result<Vec<DepositEvent>, FeedError> {
        Ok(self.list_deposits().await?)
    }
}

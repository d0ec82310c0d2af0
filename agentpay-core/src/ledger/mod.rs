//! Ledger seams used by the processors.
//!
//! The processors only see these traits. [`LocalLedger`] keeps everything in
//! process and is what the server runs by default; [`GatewayLedger`] talks to
//! a remote `/api/ledger` gateway over HTTP.

mod gateway;
mod local;

pub use gateway::GatewayLedger;
pub use local::LocalLedger;

use agentpay_sdk::client::ClientError;
use agentpay_sdk::objects::{AccountId, TopicId, TopicMessage, TransferReceipt, TransferRequest};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of the channel handed out by [`TopicSubscriber::subscribe`].
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("topic {0} does not exist")]
    UnknownTopic(TopicId),

    #[error("account {account} holds {balance} tiny units, {requested} requested")]
    InsufficientBalance {
        account: AccountId,
        balance: i64,
        requested: i64,
    },

    #[error("invalid transfer amount {0}")]
    InvalidAmount(i64),

    #[error("cannot transfer from account {0} to itself")]
    SameAccount(AccountId),

    #[error("ledger gateway error: {0}")]
    Gateway(#[from] ClientError),
}

#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// Submit `contents` to `topic`, returning its sequence number.
    async fn publish(&self, topic: TopicId, contents: Vec<u8>) -> Result<u64, LedgerError>;
}

#[async_trait]
pub trait TopicSubscriber: Send + Sync {
    /// Receive every message submitted to `topic` from now on, in order.
    ///
    /// Delivery stops when the returned receiver is dropped.
    async fn subscribe(&self, topic: TopicId) -> Result<mpsc::Receiver<TopicMessage>, LedgerError>;
}

#[async_trait]
pub trait SettlementLedger: Send + Sync {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError>;
}

use super::{
    DEFAULT_CHANNEL_BUFFER, LedgerError, SettlementLedger, TopicPublisher, TopicSubscriber,
};
use agentpay_sdk::client::GatewayClient;
use agentpay_sdk::objects::ledger::{MAX_MESSAGES_LIMIT, MessagesQuery};
use agentpay_sdk::objects::{TopicId, TopicMessage, TransferReceipt, TransferRequest};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Ledger reached through a remote `/api/ledger` gateway.
///
/// Subscriptions poll the gateway for new messages every `poll_interval`.
/// By default they start at the current end of the topic.
#[derive(Debug, Clone)]
pub struct GatewayLedger {
    client: GatewayClient,
    poll_interval: Duration,
    replay_history: bool,
}

impl GatewayLedger {
    pub fn new(client: GatewayClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
            replay_history: false,
        }
    }

    /// Start subscriptions at the first message of the topic instead of its
    /// end, so messages published while this process was down are delivered.
    ///
    /// Only safe when the consumer skips messages it already handled, such as
    /// an executor whose settlement claims outlive the process.
    pub fn replaying_history(mut self) -> Self {
        self.replay_history = true;
        self
    }

    /// Sequence number of the newest message currently on `topic`.
    async fn tail(&self, topic: TopicId) -> Result<u64, LedgerError> {
        let mut cursor = 0;
        loop {
            let page = self
                .client
                .messages_after(
                    topic,
                    MessagesQuery {
                        after: cursor,
                        limit: MAX_MESSAGES_LIMIT,
                    },
                )
                .await?;
            if let Some(last) = page.last() {
                cursor = last.sequence_number;
            }
            if page.len() < MAX_MESSAGES_LIMIT {
                return Ok(cursor);
            }
        }
    }
}

#[async_trait]
impl TopicPublisher for GatewayLedger {
    async fn publish(&self, topic: TopicId, contents: Vec<u8>) -> Result<u64, LedgerError> {
        Ok(self.client.submit_message(topic, contents).await?)
    }
}

#[async_trait]
impl TopicSubscriber for GatewayLedger {
    async fn subscribe(&self, topic: TopicId) -> Result<mpsc::Receiver<TopicMessage>, LedgerError> {
        let mut cursor = if self.replay_history {
            0
        } else {
            self.tail(topic).await?
        };
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let client = self.client.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            'poll: loop {
                tokio::select! {
                    _ = tx.closed() => break 'poll,
                    _ = tokio::time::sleep(poll_interval) => {}
                }

                // drain everything published since the last poll
                loop {
                    let query = MessagesQuery {
                        after: cursor,
                        limit: MAX_MESSAGES_LIMIT,
                    };
                    let page = match client.messages_after(topic, query).await {
                        Ok(page) => page,
                        Err(e) => {
                            warn!(topic = %topic, error = %e, "Failed to poll topic messages");
                            break;
                        }
                    };
                    let full = page.len() >= MAX_MESSAGES_LIMIT;
                    for message in page {
                        cursor = message.sequence_number;
                        if tx.send(message).await.is_err() {
                            break 'poll;
                        }
                    }
                    if !full {
                        break;
                    }
                }
            }
            debug!(topic = %topic, "Topic subscription closed");
        });

        info!(topic = %topic, from_sequence = cursor, "Subscribed to topic via gateway");
        Ok(rx)
    }
}

#[async_trait]
impl SettlementLedger for GatewayLedger {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        Ok(self.client.transfer(request).await?)
    }
}

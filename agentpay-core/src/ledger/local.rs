use super::{
    DEFAULT_CHANNEL_BUFFER, LedgerError, SettlementLedger, TopicPublisher, TopicSubscriber,
};
use agentpay_sdk::objects::{
    AccountId, LedgerTxId, TopicId, TopicMessage, TransferReceipt, TransferRequest, now_millis,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info};

/// Status reported for every accepted transfer.
pub const RECEIPT_SUCCESS: &str = "SUCCESS";

struct TopicLog {
    messages: Vec<TopicMessage>,
    /// Wakes subscribers; the payload is the new sequence number.
    live: broadcast::Sender<u64>,
}

impl TopicLog {
    fn new() -> Self {
        let (live, _) = broadcast::channel(DEFAULT_CHANNEL_BUFFER);
        Self {
            messages: Vec::new(),
            live,
        }
    }

    fn after(&self, after: u64, limit: usize) -> Vec<TopicMessage> {
        // sequence numbers start at 1 and are dense
        let start = usize::try_from(after).unwrap_or(usize::MAX);
        self.messages.iter().skip(start).take(limit).cloned().collect()
    }
}

#[derive(Default)]
struct LedgerState {
    topics: HashMap<TopicId, TopicLog>,
    balances: HashMap<AccountId, i64>,
}

/// In-process sandbox ledger.
///
/// Topics must be created before use; accounts come into existence on their
/// first credit. Messages are kept for the lifetime of the process so the
/// gateway routes can page through them.
pub struct LocalLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl std::fmt::Debug for LocalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLedger").finish_non_exhaustive()
    }
}

impl LocalLedger {
    pub fn new(topics: impl IntoIterator<Item = TopicId>) -> Self {
        Self::with_balances(topics, HashMap::new())
    }

    /// Sandbox ledger with `account` funded with `balance` tiny units.
    pub fn with_funded_account(
        topics: impl IntoIterator<Item = TopicId>,
        account: AccountId,
        balance: i64,
    ) -> Self {
        Self::with_balances(topics, HashMap::from([(account, balance)]))
    }

    fn with_balances(
        topics: impl IntoIterator<Item = TopicId>,
        balances: HashMap<AccountId, i64>,
    ) -> Self {
        let topics = topics
            .into_iter()
            .map(|topic| (topic, TopicLog::new()))
            .collect();
        Self {
            state: Arc::new(Mutex::new(LedgerState { topics, balances })),
        }
    }

    pub async fn create_topic(&self, topic: TopicId) {
        let mut state = self.state.lock().await;
        state.topics.entry(topic).or_insert_with(TopicLog::new);
    }

    /// Messages of `topic` with a sequence number greater than `after`.
    pub async fn messages_after(
        &self,
        topic: TopicId,
        after: u64,
        limit: usize,
    ) -> Result<Vec<TopicMessage>, LedgerError> {
        let state = self.state.lock().await;
        let log = state
            .topics
            .get(&topic)
            .ok_or(LedgerError::UnknownTopic(topic))?;
        Ok(log.after(after, limit))
    }

    pub async fn balance(&self, account: AccountId) -> i64 {
        let state = self.state.lock().await;
        state.balances.get(&account).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TopicPublisher for LocalLedger {
    async fn publish(&self, topic: TopicId, contents: Vec<u8>) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().await;
        let log = state
            .topics
            .get_mut(&topic)
            .ok_or(LedgerError::UnknownTopic(topic))?;
        let sequence_number = log.messages.len() as u64 + 1;
        let message = TopicMessage {
            topic_id: topic,
            sequence_number,
            consensus_timestamp: now_millis(),
            contents,
        };
        log.messages.push(message);
        // no live subscribers is fine, the message stays in the log
        let _ = log.live.send(sequence_number);
        debug!(topic = %topic, sequence_number, "Message submitted");
        Ok(sequence_number)
    }
}

#[async_trait]
impl TopicSubscriber for LocalLedger {
    /// Delivery reads from the topic log, so a subscriber that falls behind
    /// the wake-up channel still receives every message in order.
    async fn subscribe(&self, topic: TopicId) -> Result<mpsc::Receiver<TopicMessage>, LedgerError> {
        let (mut wake, mut cursor) = {
            let state = self.state.lock().await;
            let log = state
                .topics
                .get(&topic)
                .ok_or(LedgerError::UnknownTopic(topic))?;
            (log.live.subscribe(), log.messages.len() as u64)
        };
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let state = self.state.clone();

        tokio::spawn(async move {
            'forward: loop {
                tokio::select! {
                    _ = tx.closed() => break 'forward,
                    woken = wake.recv() => match woken {
                        Ok(sequence_number) if sequence_number <= cursor => continue 'forward,
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(topic = %topic, skipped, "Subscriber lagged, catching up from the log");
                        }
                        Err(broadcast::error::RecvError::Closed) => break 'forward,
                    },
                }

                loop {
                    let pending = match state.lock().await.topics.get(&topic) {
                        Some(log) => log.after(cursor, DEFAULT_CHANNEL_BUFFER),
                        None => break 'forward,
                    };
                    if pending.is_empty() {
                        break;
                    }
                    for message in pending {
                        cursor = message.sequence_number;
                        if tx.send(message).await.is_err() {
                            break 'forward;
                        }
                    }
                }
            }
            debug!(topic = %topic, delivered = cursor, "Topic subscription closed");
        });

        info!(topic = %topic, from_sequence = cursor, "Subscribed to topic");
        Ok(rx)
    }
}

#[async_trait]
impl SettlementLedger for LocalLedger {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        if request.amount <= 0 {
            return Err(LedgerError::InvalidAmount(request.amount));
        }
        if request.from == request.to {
            return Err(LedgerError::SameAccount(request.from));
        }

        let mut state = self.state.lock().await;
        let payer_balance = state.balances.get(&request.from).copied().unwrap_or(0);
        if payer_balance < request.amount {
            return Err(LedgerError::InsufficientBalance {
                account: request.from,
                balance: payer_balance,
                requested: request.amount,
            });
        }
        let payee_balance = state.balances.get(&request.to).copied().unwrap_or(0);
        let credited = payee_balance
            .checked_add(request.amount)
            .ok_or(LedgerError::InvalidAmount(request.amount))?;

        state
            .balances
            .insert(request.from, payer_balance - request.amount);
        state.balances.insert(request.to, credited);

        let receipt = TransferReceipt {
            transaction_id: LedgerTxId::new(request.from, OffsetDateTime::now_utc()),
            status: RECEIPT_SUCCESS.to_string(),
        };
        info!(
            from = %request.from,
            to = %request.to,
            amount = request.amount,
            transaction_id = %receipt.transaction_id,
            "Transfer executed"
        );
        Ok(receipt)
    }
}

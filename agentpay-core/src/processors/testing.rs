//! Fakes shared by the processor tests.

use crate::feed::{DepositFeed, FeedError};
use crate::ledger::{LedgerError, SettlementLedger, TopicPublisher};
use agentpay_sdk::objects::{
    AccountId, DepositEvent, TopicId, TransferReceipt, TransferRequest,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn deposit(tx_hash: &str, merchant_id: &str, amount: i64) -> DepositEvent {
    DepositEvent {
        tx_hash: tx_hash.to_string(),
        from_wallet: "0xabcdef1234567890".to_string(),
        amount: Decimal::from(amount),
        token: "USDC".to_string(),
        merchant_id: merchant_id.to_string(),
        timestamp: 1_700_000_000_000,
    }
}

/// Feed returning a fixed, growable list of deposits.
#[derive(Default)]
pub struct StaticFeed {
    deposits: Mutex<Vec<DepositEvent>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StaticFeed {
    pub fn new(deposits: Vec<DepositEvent>) -> Self {
        Self {
            deposits: Mutex::new(deposits),
            ..Default::default()
        }
    }

    pub fn push(&self, deposit: DepositEvent) {
        self.deposits.lock().unwrap().push(deposit);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DepositFeed for StaticFeed {
    async fn fetch_deposits(&self) -> Result<Vec<DepositEvent>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedError::Unavailable("connection refused".to_string()));
        }
        Ok(self.deposits.lock().unwrap().clone())
    }
}

/// Publisher that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(TopicId, Vec<u8>)>>,
    failures_left: AtomicUsize,
}

impl RecordingPublisher {
    pub fn fail_next(&self, times: usize) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<(TopicId, Value)> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, bytes)| (*topic, serde_json::from_slice(bytes).unwrap()))
            .collect()
    }
}

#[async_trait]
impl TopicPublisher for RecordingPublisher {
    async fn publish(&self, topic: TopicId, contents: Vec<u8>) -> Result<u64, LedgerError> {
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(LedgerError::UnknownTopic(topic));
        }
        let mut messages = self.messages.lock().unwrap();
        messages.push((topic, contents));
        Ok(messages.len() as u64)
    }
}

/// Ledger whose payer never has funds.
#[derive(Default)]
pub struct BrokeLedger {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl SettlementLedger for BrokeLedger {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LedgerError::InsufficientBalance {
            account: request.from,
            balance: 0,
            requested: request.amount,
        })
    }
}

pub const TRIGGER_TOPIC: TopicId = TopicId::new(0, 0, 789012);
pub const CONFIRMATION_TOPIC: TopicId = TopicId::new(0, 0, 789013);
pub const OPERATOR: AccountId = AccountId::new(0, 0, 1001);

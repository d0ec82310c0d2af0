//! SettlementExecutor processor.
//!
//! The SettlementExecutor is responsible for:
//! - Receiving messages from the trigger topic, one at a time, in order
//! - Discarding anything that is not a `SETTLEMENT_TRIGGER`
//! - Resolving the merchant's settlement account and the native amount
//! - Claiming the deposit hash so a redelivered trigger never pays twice
//! - Transferring from the operator account to the merchant
//! - Publishing `SETTLEMENT_CONFIRMED` and writing the audit log
//!
//! Rejected settlements are audited and never retried.

use crate::audit::AuditLog;
use crate::config::ExecutorConfig;
use crate::idempotency::{IdempotencyStore, StoreError};
use crate::ledger::{LedgerError, SettlementLedger, TopicPublisher};
use crate::registry::{MerchantRegistry, RegistryError};
use crate::stats::AgentStats;
use crate::units::{UnitConverter, UnitError};
use agentpay_sdk::objects::{
    SettlementConfirmed, SettlementMessage, SettlementTrigger, TopicMessage, TransferRequest,
    now_millis,
};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("merchant {0} not found in registry")]
    MerchantNotFound(String),

    #[error("merchant {0} is not active")]
    MerchantInactive(String),

    #[error("unsupported token {0}")]
    UnsupportedToken(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(UnitError),

    #[error("transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),

    #[error("idempotency store error: {0}")]
    Store(#[from] StoreError),
}

impl From<RegistryError> for SettlementError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::NotFound(id) => SettlementError::MerchantNotFound(id),
            RegistryError::Inactive(id) => SettlementError::MerchantInactive(id),
        }
    }
}

impl From<UnitError> for SettlementError {
    fn from(value: UnitError) -> Self {
        match value {
            UnitError::UnsupportedToken(token) => SettlementError::UnsupportedToken(token),
            other => SettlementError::InvalidAmount(other),
        }
    }
}

/// Lifecycle of a single trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Received,
    Validating,
    Transferring,
    Confirmed,
    Rejected,
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SettlementState::Received => "received",
            SettlementState::Validating => "validating",
            SettlementState::Transferring => "transferring",
            SettlementState::Confirmed => "confirmed",
            SettlementState::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Result of handling one topic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Not a settlement trigger.
    Discarded,
    /// The deposit was already settled.
    Duplicate,
    Confirmed(SettlementConfirmed),
    /// Carries the error written to the audit log.
    Rejected(String),
}

pub struct SettlementExecutor {
    registry: Arc<RwLock<MerchantRegistry>>,
    ledger: Arc<dyn SettlementLedger>,
    publisher: Arc<dyn TopicPublisher>,
    settled: Arc<dyn IdempotencyStore>,
    units: UnitConverter,
    audit: Arc<AuditLog>,
    config: ExecutorConfig,
    stats: Arc<AgentStats>,
}

impl SettlementExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<RwLock<MerchantRegistry>>,
        ledger: Arc<dyn SettlementLedger>,
        publisher: Arc<dyn TopicPublisher>,
        settled: Arc<dyn IdempotencyStore>,
        units: UnitConverter,
        audit: Arc<AuditLog>,
        config: ExecutorConfig,
        stats: Arc<AgentStats>,
    ) -> Self {
        Self {
            registry,
            ledger,
            publisher,
            settled,
            units,
            audit,
            config,
            stats,
        }
    }

    /// Handle trigger messages until shutdown or until the subscription ends.
    pub async fn run(
        self,
        mut subscription: mpsc::Receiver<TopicMessage>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(
            topic = %self.config.trigger_topic,
            operator = %self.config.operator_account,
            "SettlementExecutor started"
        );
        self.stats.executor.set_running(true);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("SettlementExecutor received shutdown signal");
                        break;
                    }
                }

                Some(message) = subscription.recv() => {
                    let _ = self.process(message).await;
                }

                else => {
                    info!("Trigger subscription closed");
                    break;
                }
            }
        }

        self.stats.executor.set_running(false);
        info!("SettlementExecutor shutdown complete");
    }

    async fn settle(&self, message: TopicMessage) -> SettlementOutcome {
        self.stats.executor.received();

        let trigger = match SettlementTrigger::decode(&message.contents) {
            Ok(trigger) => trigger,
            Err(e) => {
                self.stats.executor.discarded();
                warn!(
                    sequence_number = message.sequence_number,
                    error = %e,
                    "Discarding topic message"
                );
                return SettlementOutcome::Discarded;
            }
        };
        debug!(
            state = %SettlementState::Received,
            tx_hash = %trigger.tx_hash,
            merchant_id = %trigger.merchant_id,
            sequence_number = message.sequence_number,
            "Settlement trigger received"
        );

        match self.execute(&trigger).await {
            Ok(Some(confirmed)) => SettlementOutcome::Confirmed(confirmed),
            Ok(None) => SettlementOutcome::Duplicate,
            Err(e) => {
                self.stats.executor.rejected();
                let reason = e.to_string();
                error!(
                    state = %SettlementState::Rejected,
                    tx_hash = %trigger.tx_hash,
                    merchant_id = %trigger.merchant_id,
                    error = %reason,
                    "Settlement rejected"
                );
                if let Err(e) = self
                    .audit
                    .record_error(&trigger.merchant_id, &trigger.tx_hash, &reason)
                    .await
                {
                    error!(tx_hash = %trigger.tx_hash, error = %e, "Failed to write audit entry");
                }
                SettlementOutcome::Rejected(reason)
            }
        }
    }

    /// `Ok(None)` when the deposit was already settled.
    async fn execute(
        &self,
        trigger: &SettlementTrigger,
    ) -> Result<Option<SettlementConfirmed>, SettlementError> {
        debug!(state = %SettlementState::Validating, tx_hash = %trigger.tx_hash);
        let merchant_account = self
            .registry
            .read()
            .await
            .lookup_active_account(&trigger.merchant_id)?;
        let amount = self.units.to_native(&trigger.token, trigger.amount)?;

        if !self.settled.insert(&trigger.tx_hash).await? {
            self.stats.executor.duplicate();
            warn!(
                tx_hash = %trigger.tx_hash,
                merchant_id = %trigger.merchant_id,
                "Deposit already settled, skipping duplicate trigger"
            );
            return Ok(None);
        }

        debug!(
            state = %SettlementState::Transferring,
            tx_hash = %trigger.tx_hash,
            to = %merchant_account,
            amount
        );
        let request = TransferRequest {
            from: self.config.operator_account,
            to: merchant_account,
            amount,
            memo: format!("settlement {}", trigger.tx_hash),
        };
        let receipt = match self.ledger.transfer(request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if let Err(release) = self.settled.remove(&trigger.tx_hash).await {
                    error!(
                        tx_hash = %trigger.tx_hash,
                        error = %release,
                        "Failed to release settlement claim"
                    );
                }
                return Err(e.into());
            }
        };
        self.stats.executor.completed();

        let confirmed = SettlementConfirmed {
            merchant_id: trigger.merchant_id.clone(),
            tx_hash: trigger.tx_hash.clone(),
            ledger_tx_id: receipt.transaction_id.0,
            status: receipt.status,
            timestamp: now_millis(),
        };

        // The transfer is final at this point; neither failure below undoes it.
        match SettlementMessage::from(confirmed.clone()).to_bytes() {
            Ok(payload) => {
                if let Err(e) = self
                    .publisher
                    .publish(self.config.confirmation_topic, payload)
                    .await
                {
                    error!(tx_hash = %confirmed.tx_hash, error = %e, "Failed to publish settlement confirmation");
                }
            }
            Err(e) => {
                error!(tx_hash = %confirmed.tx_hash, error = %e, "Failed to encode settlement confirmation");
            }
        }
        if let Err(e) = self.audit.record_completed(&confirmed).await {
            error!(tx_hash = %confirmed.tx_hash, error = %e, "Failed to write audit entry");
        }

        info!(
            state = %SettlementState::Confirmed,
            tx_hash = %confirmed.tx_hash,
            merchant_id = %confirmed.merchant_id,
            ledger_tx_id = %confirmed.ledger_tx_id,
            amount,
            "Settlement confirmed"
        );
        Ok(Some(confirmed))
    }
}

impl Processor<TopicMessage> for SettlementExecutor {
    type Output = SettlementOutcome;
    type Error = Infallible;

    async fn process(&self, message: TopicMessage) -> Result<SettlementOutcome, Infallible> {
        Ok(self.settle(message).await)
    }
}

//! DepositWatcher processor.
//!
//! The DepositWatcher is responsible for:
//! - Polling the deposit feed right away, then once per interval
//! - Skipping deposits whose `tx_hash` was already forwarded
//! - Publishing a `SETTLEMENT_TRIGGER` for every new deposit
//! - Recording the hash only after the publish succeeded, so a failed
//!   publish is retried on the next cycle
//!
//! A cycle always finishes before the next sleep starts; cycles never overlap.

use crate::config::WatcherConfig;
use crate::feed::{DepositFeed, FeedError};
use crate::idempotency::{IdempotencyStore, StoreError};
use crate::ledger::{LedgerError, TopicPublisher};
use crate::stats::AgentStats;
use agentpay_sdk::objects::{DepositEvent, SettlementMessage, SettlementTrigger, now_millis};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("failed to publish settlement trigger: {0}")]
    Publish(#[from] LedgerError),

    #[error("idempotency store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to encode settlement trigger: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Deposits returned by the feed.
    pub seen: usize,
    pub forwarded: usize,
    pub already_processed: usize,
    /// Deposits dropped because their amount was not positive.
    pub invalid: usize,
    /// Deposits left for the next cycle after an error.
    pub failed: usize,
}

enum Forward {
    Published,
    AlreadyProcessed,
    Invalid,
}

pub struct DepositWatcher {
    feed: Arc<dyn DepositFeed>,
    publisher: Arc<dyn TopicPublisher>,
    processed: Arc<dyn IdempotencyStore>,
    config: WatcherConfig,
    stats: Arc<AgentStats>,
}

impl DepositWatcher {
    pub fn new(
        feed: Arc<dyn DepositFeed>,
        publisher: Arc<dyn TopicPublisher>,
        processed: Arc<dyn IdempotencyStore>,
        config: WatcherConfig,
        stats: Arc<AgentStats>,
    ) -> Self {
        Self {
            feed,
            publisher,
            processed,
            config,
            stats,
        }
    }

    /// Poll until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            feed_url = %self.config.feed_url,
            topic = %self.config.trigger_topic,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "DepositWatcher started"
        );
        self.stats.watcher.set_running(true);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if let Err(e) = self.poll_once().await {
                error!(error = %e, "Deposit poll cycle skipped");
            }

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("DepositWatcher received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        self.stats.watcher.set_running(false);
        info!("DepositWatcher shutdown complete");
    }

    /// Run a single poll cycle.
    ///
    /// Only a feed failure fails the cycle. Errors on individual deposits
    /// are logged and counted in the report.
    pub async fn poll_once(&self) -> Result<CycleReport, WatchError> {
        let deposits = match self.feed.fetch_deposits().await {
            Ok(deposits) => deposits,
            Err(e) => {
                self.stats.watcher.feed_failed();
                return Err(e.into());
            }
        };

        let mut report = CycleReport {
            seen: deposits.len(),
            ..Default::default()
        };

        for deposit in &deposits {
            match self.forward(deposit).await {
                Ok(Forward::Published) => report.forwarded += 1,
                Ok(Forward::AlreadyProcessed) => report.already_processed += 1,
                Ok(Forward::Invalid) => report.invalid += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        tx_hash = %deposit.tx_hash,
                        error = %e,
                        "Failed to forward deposit, will retry next cycle"
                    );
                }
            }
        }

        self.stats.watcher.cycle_finished();
        debug!(?report, "Deposit poll cycle finished");
        Ok(report)
    }

    async fn forward(&self, deposit: &DepositEvent) -> Result<Forward, WatchError> {
        if self.processed.contains(&deposit.tx_hash).await? {
            return Ok(Forward::AlreadyProcessed);
        }

        if deposit.amount <= Decimal::ZERO {
            warn!(
                tx_hash = %deposit.tx_hash,
                amount = %deposit.amount,
                "Ignoring deposit with non-positive amount"
            );
            // recorded so the warning is not repeated every cycle
            self.processed.insert(&deposit.tx_hash).await?;
            return Ok(Forward::Invalid);
        }

        let trigger = SettlementTrigger {
            merchant_id: deposit.merchant_id.clone(),
            token: deposit.token.clone(),
            amount: deposit.amount,
            tx_hash: deposit.tx_hash.clone(),
            timestamp: now_millis(),
        };
        let payload = SettlementMessage::from(trigger).to_bytes()?;

        let sequence_number = match self
            .publisher
            .publish(self.config.trigger_topic, payload)
            .await
        {
            Ok(sequence_number) => sequence_number,
            Err(e) => {
                self.stats.watcher.publish_failed();
                return Err(e.into());
            }
        };
        self.stats.watcher.forwarded();

        info!(
            tx_hash = %deposit.tx_hash,
            merchant_id = %deposit.merchant_id,
            amount = %deposit.amount,
            token = %deposit.token,
            sequence_number,
            "Forwarded deposit as settlement trigger"
        );

        if let Err(e) = self.processed.insert(&deposit.tx_hash).await {
            error!(
                tx_hash = %deposit.tx_hash,
                error = %e,
                "Failed to record forwarded deposit, it may be forwarded again"
            );
        }
        Ok(Forward::Published)
    }
}

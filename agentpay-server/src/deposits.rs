//! In-memory deposit list served by the feed routes.

use agentpay_sdk::objects::{DepositEvent, NewDeposit, now_millis};
use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DepositBookError {
    #[error("deposit {0} already exists")]
    Duplicate(String),

    #[error("deposit amount must be positive")]
    NonPositiveAmount,
}

/// Deposits in arrival order. Nothing is ever removed; the watcher always
/// reads the whole list.
#[derive(Debug, Default)]
pub struct DepositBook {
    deposits: RwLock<Vec<DepositEvent>>,
}

impl DepositBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A book holding the two demo deposits, stamped a few minutes ago.
    pub fn with_demo_deposits() -> Self {
        let now = now_millis();
        let seeded = vec![
            DepositEvent {
                tx_hash: "0x1234567890abcdef".to_string(),
                from_wallet: "0xabcdef1234567890".to_string(),
                amount: Decimal::from(100),
                token: "USDC".to_string(),
                merchant_id: "merchant_001".to_string(),
                timestamp: now - 5 * 60 * 1000,
            },
            DepositEvent {
                tx_hash: "0x9876543210fedcba".to_string(),
                from_wallet: "0xfedcba0987654321".to_string(),
                amount: Decimal::from(250),
                token: "USDC".to_string(),
                merchant_id: "merchant_002".to_string(),
                timestamp: now - 2 * 60 * 1000,
            },
        ];
        Self {
            deposits: RwLock::new(seeded),
        }
    }

    pub async fn list(&self) -> Vec<DepositEvent> {
        self.deposits.read().await.clone()
    }

    /// Record a deposit, stamping it with the current time.
    pub async fn add(&self, deposit: NewDeposit) -> Result<DepositEvent, DepositBookError> {
        if deposit.amount <= Decimal::ZERO {
            return Err(DepositBookError::NonPositiveAmount);
        }
        let mut deposits = self.deposits.write().await;
        if deposits.iter().any(|d| d.tx_hash == deposit.tx_hash) {
            return Err(DepositBookError::Duplicate(deposit.tx_hash));
        }
        let event = deposit.into_event(now_millis());
        deposits.push(event.clone());
        Ok(event)
    }
}

/// A deposit with a random hash and sender, 50 to 549 USDC, paid to one of
/// the three demo merchants.
pub fn random_test_deposit() -> NewDeposit {
    let mut rng = rand::rng();
    NewDeposit {
        tx_hash: format!("0x{:08x}", rng.random::<u32>()),
        from_wallet: format!("0x{:08x}", rng.random::<u32>()),
        amount: Decimal::from(rng.random_range(50_i64..550)),
        token: "USDC".to_string(),
        merchant_id: format!("merchant_00{}", rng.random_range(1_u8..=3)),
    }
}

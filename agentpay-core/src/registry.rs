//! Merchant registry.
//!
//! A static lookup table from merchant id to settlement account. The
//! settlement path only reads it; `register` exists so operators can add
//! merchants at runtime through the HTTP API.

use agentpay_sdk::objects::{AccountId, Merchant, NewMerchant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("merchant {0} not found in registry")]
    NotFound(String),

    #[error("merchant {0} is not active")]
    Inactive(String),
}

#[derive(Debug, Clone, Default)]
pub struct MerchantRegistry {
    merchants: Vec<Merchant>,
}

impl MerchantRegistry {
    pub fn new(merchants: Vec<Merchant>) -> Self {
        Self { merchants }
    }

    /// Settlement account of an active merchant.
    pub fn lookup_active_account(&self, id: &str) -> Result<AccountId, RegistryError> {
        let merchant = self
            .lookup(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_owned()))?;
        if !merchant.is_active {
            return Err(RegistryError::Inactive(id.to_owned()));
        }
        Ok(merchant.ledger_account_id)
    }

    pub fn lookup(&self, id: &str) -> Option<&Merchant> {
        self.merchants.iter().find(|m| m.id == id)
    }

    /// All merchants in insertion order.
    pub fn list(&self) -> &[Merchant] {
        &self.merchants
    }

    /// Append a merchant under the next free sequential id (`merchant_004`, …).
    ///
    /// Configured registries may use arbitrary ids, so numbers already taken
    /// are skipped.
    pub fn register(&mut self, merchant: NewMerchant) -> Merchant {
        let id = (self.merchants.len() + 1..)
            .map(|n| format!("merchant_{n:03}"))
            .find(|id| self.lookup(id).is_none())
            .unwrap_or_default();
        let merchant = merchant.with_id(id);
        self.merchants.push(merchant.clone());
        merchant
    }

    /// The demo merchants used when no registry is configured.
    pub fn default_merchants() -> Vec<Merchant> {
        let merchant = |id: &str, num: u64, name: &str, is_active: bool| Merchant {
            id: id.to_owned(),
            ledger_account_id: AccountId::new(0, 0, num),
            name: name.to_owned(),
            is_active,
        };
        vec![
            merchant("merchant_001", 123456, "Coffee Shop Downtown", true),
            merchant("merchant_002", 123457, "Tech Store Central", true),
            merchant("merchant_003", 123458, "Bookstore Corner", false),
        ]
    }
}

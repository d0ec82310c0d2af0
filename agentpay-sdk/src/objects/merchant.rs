//! Merchant registry payloads.

use super::ledger::AccountId;
use serde::{Deserialize, Serialize};

/// A merchant that can receive settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: String,
    pub ledger_account_id: AccountId,
    pub name: String,
    pub is_active: bool,
}

/// A merchant before the registry has assigned its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMerchant {
    pub ledger_account_id: AccountId,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewMerchant {
    pub fn with_id(self, id: String) -> Merchant {
        Merchant {
            id,
            ledger_account_id: self.ledger_account_id,
            name: self.name,
            is_active: self.is_active,
        }
    }
}

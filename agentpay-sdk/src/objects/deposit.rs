//! Deposit feed payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A deposit observed by the feed, keyed by `tx_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositEvent {
    pub tx_hash: String,
    pub from_wallet: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub token: String,
    pub merchant_id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// Body of `POST /api/deposits`. The feed stamps the timestamp itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeposit {
    pub tx_hash: String,
    pub from_wallet: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub token: String,
    pub merchant_id: String,
}

impl NewDeposit {
    pub fn into_event(self, timestamp: i64) -> DepositEvent {
        DepositEvent {
            tx_hash: self.tx_hash,
            from_wallet: self.from_wallet,
            amount: self.amount,
            token: self.token,
            merchant_id: self.merchant_id,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_event_wire_shape() {
        let json = r#"{
            "txHash": "0x1234567890abcdef",
            "fromWallet": "0xabcdef1234567890",
            "amount": 100,
            "token": "USDC",
            "merchantId": "merchant_001",
            "timestamp": 1700000000000
        }"#;
        let event: DepositEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.tx_hash, "0x1234567890abcdef");
        assert_eq!(event.amount, Decimal::from(100));
        assert_eq!(event.merchant_id, "merchant_001");

        let value = serde_json::to_value(&event).unwrap();
        assert!(value["amount"].is_number());
        assert_eq!(value["merchantId"], "merchant_001");
        assert_eq!(value["timestamp"], 1700000000000i64);
    }

    #[test]
    fn test_fractional_amount() {
        let json = r#"{"txHash":"0x1","fromWallet":"0x2","amount":12.5,"token":"USDC","merchantId":"m"}"#;
        let deposit: NewDeposit = serde_json::from_str(json).unwrap();
        assert_eq!(deposit.amount, Decimal::new(125, 1));
        let event = deposit.into_event(42);
        assert_eq!(event.timestamp, 42);
    }
}

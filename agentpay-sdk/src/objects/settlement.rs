//! Messages carried on the settlement topics.
//!
//! Every message is a JSON object with a `type` discriminator. Triggers go
//! from the deposit watcher to the settlement executor; confirmations are
//! published by the executor after a successful transfer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SETTLEMENT_TRIGGER: &str = "SETTLEMENT_TRIGGER";
pub const SETTLEMENT_CONFIRMED: &str = "SETTLEMENT_CONFIRMED";

/// Request to settle one deposit with its merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementTrigger {
    pub merchant_id: String,
    pub token: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub tx_hash: String,
    /// Epoch milliseconds at which the trigger was built.
    pub timestamp: i64,
}

/// Published once the ledger accepted the settlement transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementConfirmed {
    pub merchant_id: String,
    pub tx_hash: String,
    pub ledger_tx_id: String,
    pub status: String,
    pub timestamp: i64,
}

/// A message as it appears on the wire, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SettlementMessage {
    #[serde(rename = "SETTLEMENT_TRIGGER")]
    Trigger(SettlementTrigger),
    #[serde(rename = "SETTLEMENT_CONFIRMED")]
    Confirmed(SettlementConfirmed),
}

/// Why a topic payload could not be read as a settlement trigger.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(serde_json::Error),
    #[error("payload has no `type` field")]
    MissingType,
    #[error("unexpected message type `{0}`")]
    UnexpectedType(String),
    #[error("malformed SETTLEMENT_TRIGGER payload: {0}")]
    Malformed(serde_json::Error),
}

impl SettlementMessage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<SettlementTrigger> for SettlementMessage {
    fn from(value: SettlementTrigger) -> Self {
        SettlementMessage::Trigger(value)
    }
}

impl From<SettlementConfirmed> for SettlementMessage {
    fn from(value: SettlementConfirmed) -> Self {
        SettlementMessage::Confirmed(value)
    }
}

impl SettlementTrigger {
    /// Decode a raw topic payload, accepting only `SETTLEMENT_TRIGGER` messages.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Json)?;
        match value.get("type").and_then(Value::as_str) {
            None => Err(DecodeError::MissingType),
            Some(SETTLEMENT_TRIGGER) => {
                serde_json::from_value(value).map_err(DecodeError::Malformed)
            }
            Some(other) => Err(DecodeError::UnexpectedType(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> SettlementTrigger {
        SettlementTrigger {
            merchant_id: "merchant_001".to_string(),
            token: "USDC".to_string(),
            amount: Decimal::from(100),
            tx_hash: "0xabc".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_trigger_carries_type_tag() {
        let bytes = SettlementMessage::from(trigger()).to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], SETTLEMENT_TRIGGER);
        assert_eq!(value["merchantId"], "merchant_001");
        assert_eq!(value["txHash"], "0xabc");
        assert!(value["amount"].is_number());
    }

    #[test]
    fn test_decode_trigger() {
        let json = br#"{"type":"SETTLEMENT_TRIGGER","merchantId":"merchant_001","token":"USDC","amount":100,"txHash":"0xabc","timestamp":1}"#;
        let decoded = SettlementTrigger::decode(json).unwrap();
        assert_eq!(decoded.merchant_id, "merchant_001");
        assert_eq!(decoded.amount, Decimal::from(100));
    }

    #[test]
    fn test_decode_rejects_non_triggers() {
        assert!(matches!(
            SettlementTrigger::decode(b"not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            SettlementTrigger::decode(br#"{"merchantId":"merchant_001"}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            SettlementTrigger::decode(br#"{"type":"SETTLEMENT_CONFIRMED"}"#),
            Err(DecodeError::UnexpectedType(t)) if t == SETTLEMENT_CONFIRMED
        ));
        assert!(matches!(
            SettlementTrigger::decode(br#"{"type":"SETTLEMENT_TRIGGER","merchantId":"m"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_confirmed_wire_shape() {
        let confirmed = SettlementConfirmed {
            merchant_id: "merchant_001".to_string(),
            tx_hash: "0xabc".to_string(),
            ledger_tx_id: "0.0.1001@1700000000.000000001".to_string(),
            status: "SUCCESS".to_string(),
            timestamp: 5,
        };
        let value = serde_json::to_value(SettlementMessage::from(confirmed)).unwrap();
        assert_eq!(value["type"], SETTLEMENT_CONFIRMED);
        assert_eq!(value["ledgerTxId"], "0.0.1001@1700000000.000000001");
        assert_eq!(value["status"], "SUCCESS");
    }
}

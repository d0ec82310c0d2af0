//! Ledger identifiers, topic messages and transfer payloads.
//!
//! Entity ids (accounts, topics) use the `shard.realm.num` notation, e.g.
//! `0.0.123456`. Topic message contents travel base64-encoded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ledger id `{0}`, expected `shard.realm.num`")]
pub struct ParseLedgerIdError(pub String);

fn parse_triple(s: &str) -> Result<(u64, u64, u64), ParseLedgerIdError> {
    let err = || ParseLedgerIdError(s.to_owned());
    let mut parts = s.split('.');
    let mut next = || -> Result<u64, ParseLedgerIdError> {
        parts.next().ok_or_else(err)?.parse().map_err(|_| err())
    };
    let triple = (next()?, next()?, next()?);
    if parts.next().is_some() {
        return Err(err());
    }
    Ok(triple)
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name {
            pub shard: u64,
            pub realm: u64,
            pub num: u64,
        }

        impl $name {
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self { shard, realm, num }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
            }
        }

        impl FromStr for $name {
            type Err = ParseLedgerIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (shard, realm, num) = parse_triple(s)?;
                Ok(Self { shard, realm, num })
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseLedgerIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }
    };
}

entity_id!(
    /// A ledger account, the payer or payee of a transfer.
    AccountId
);

entity_id!(
    /// A pub/sub topic on the ledger's consensus service.
    TopicId
);

/// Ledger transaction id: `{payer}@{seconds}.{nanos}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerTxId(pub String);

impl LedgerTxId {
    pub fn new(payer: AccountId, valid_start: time::OffsetDateTime) -> Self {
        Self(format!(
            "{}@{}.{:09}",
            payer,
            valid_start.unix_timestamp(),
            valid_start.nanosecond()
        ))
    }
}

impl fmt::Display for LedgerTxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message stored on a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMessage {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    /// Epoch milliseconds at which the ledger ordered the message.
    pub consensus_timestamp: i64,
    #[serde(with = "base64_bytes")]
    pub contents: Vec<u8>,
}

/// Body of `POST /api/ledger/topics/{topic_id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitMessageRequest {
    #[serde(with = "base64_bytes")]
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageResponse {
    pub sequence_number: u64,
}

/// Query of `GET /api/ledger/topics/{topic_id}/messages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesQuery {
    /// Return messages with a sequence number strictly greater than this.
    #[serde(default)]
    pub after: u64,
    #[serde(default = "default_messages_limit")]
    pub limit: usize,
}

pub const MAX_MESSAGES_LIMIT: usize = 100;

fn default_messages_limit() -> usize {
    MAX_MESSAGES_LIMIT
}

/// Move `amount` tiny units from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: i64,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction_id: LedgerTxId,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: AccountId,
    pub balance: i64,
}

mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fast32::base64::RFC4648_NOPAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        fast32::base64::RFC4648_NOPAD
            .decode_str(encoded.trim_end_matches('='))
            .map_err(|_| D::Error::custom("invalid base64 contents"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account_id() {
        let id: AccountId = "0.0.123456".parse().unwrap();
        assert_eq!(id, AccountId::new(0, 0, 123456));
        assert_eq!(id.to_string(), "0.0.123456");

        assert!("0.0".parse::<AccountId>().is_err());
        assert!("0.0.1.2".parse::<AccountId>().is_err());
        assert!("0.0.x".parse::<AccountId>().is_err());
        assert!("".parse::<TopicId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_strings() {
        let request = TransferRequest {
            from: AccountId::new(0, 0, 1001),
            to: AccountId::new(0, 0, 123456),
            amount: 10_000_000_000,
            memo: "0xabc".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["from"], "0.0.1001");
        assert_eq!(value["to"], "0.0.123456");

        let back: TransferRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);

        let bad = serde_json::json!({"from": "nope", "to": "0.0.1", "amount": 1});
        assert!(serde_json::from_value::<TransferRequest>(bad).is_err());
    }

    #[test]
    fn test_topic_message_contents_are_base64() {
        let message = TopicMessage {
            topic_id: TopicId::new(0, 0, 789012),
            sequence_number: 3,
            consensus_timestamp: 1,
            contents: b"{\"type\":\"SETTLEMENT_TRIGGER\"}".to_vec(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["topicId"], "0.0.789012");
        assert!(value["contents"].as_str().unwrap().starts_with("eyJ0eXBl"));

        let back: TopicMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back.contents, message.contents);
    }

    #[test]
    fn test_ledger_tx_id_format() {
        let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000)
            .unwrap()
            .replace_nanosecond(42)
            .unwrap();
        let id = LedgerTxId::new(AccountId::new(0, 0, 1001), start);
        assert_eq!(id.to_string(), "0.0.1001@1700000000.000000042");
    }
}

//! Operator signatures on ledger gateway writes.
//!
//! Topic submissions and transfers change ledger state, so the gateway only
//! accepts them when signed with the operator key:
//!
//! ```text
//! Agentpay-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! The signature is `HMAC-SHA256("{kind}.{timestamp}.{json_body}", key)`.
//! Including the write kind keeps a signature for one route from being
//! accepted by another.

use crate::objects::ledger::{AccountId, SubmitMessageRequest, TransferRequest};
use ring::hmac;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// Header name for the operator signature.
pub const SIGNATURE_HEADER: &str = "Agentpay-Signature";

/// How far (in seconds) a signature timestamp may drift from the verifier's
/// clock in either direction.
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// A request body that changes ledger state.
pub trait LedgerWrite: Serialize + DeserializeOwned {
    /// Domain separator mixed into the signed data.
    const KIND: &'static str;

    /// Account debited by this write, if any.
    fn payer(&self) -> Option<AccountId> {
        None
    }
}

impl LedgerWrite for SubmitMessageRequest {
    const KIND: &'static str = "topic-message";
}

impl LedgerWrite for TransferRequest {
    const KIND: &'static str = "transfer";

    fn payer(&self) -> Option<AccountId> {
        Some(self.from)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("signature is not valid base64")]
    InvalidBase64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("signature does not match the operator key")]
    Mismatch,
    #[error("signature timestamp {timestamp} is outside the freshness window")]
    Stale { timestamp: i64 },
}

/// The operator's signing key.
#[derive(Clone)]
pub struct OperatorKey(hmac::Key);

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OperatorKey(<redacted>)")
    }
}

/// A write ready to send: the exact JSON body and its header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedWrite {
    pub header: String,
    pub json: String,
}

/// A write whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedWrite<W> {
    pub write: W,
    pub timestamp: i64,
    /// Raw signature bytes, unique per signed write.
    pub signature: Box<[u8]>,
}

impl OperatorKey {
    pub fn new(secret: &[u8]) -> Self {
        Self(hmac::Key::new(hmac::HMAC_SHA256, secret))
    }

    pub fn sign<W: LedgerWrite>(&self, write: &W) -> Result<SignedWrite, SignatureError> {
        self.sign_at(write, time::OffsetDateTime::now_utc().unix_timestamp())
    }

    fn sign_at<W: LedgerWrite>(
        &self,
        write: &W,
        timestamp: i64,
    ) -> Result<SignedWrite, SignatureError> {
        let json = serde_json::to_string(write)?;
        let tag = hmac::sign(&self.0, signed_data::<W>(timestamp, &json).as_bytes());
        let header = format!(
            "{timestamp}.{}",
            fast32::base64::RFC4648_NOPAD.encode(tag.as_ref())
        );
        Ok(SignedWrite { header, json })
    }

    /// Check `header` against the raw `json` body, then decode the write.
    ///
    /// The body is only parsed once the signature and timestamp hold.
    pub fn verify<W: LedgerWrite>(
        &self,
        header: &str,
        json: &str,
    ) -> Result<VerifiedWrite<W>, SignatureError> {
        let (timestamp, encoded) = header
            .split_once('.')
            .ok_or(SignatureError::MalformedHeader)?;
        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::MalformedHeader)?;
        let signature = fast32::base64::RFC4648_NOPAD
            .decode_str(encoded)
            .map_err(|_| SignatureError::InvalidBase64)?
            .into_boxed_slice();

        hmac::verify(
            &self.0,
            signed_data::<W>(timestamp, json).as_bytes(),
            &signature,
        )
        .map_err(|_| SignatureError::Mismatch)?;

        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        if (now - timestamp).abs() > MAX_SIGNATURE_AGE {
            return Err(SignatureError::Stale { timestamp });
        }

        Ok(VerifiedWrite {
            write: serde_json::from_str(json)?,
            timestamp,
            signature,
        })
    }
}

fn signed_data<W: LedgerWrite>(timestamp: i64, json: &str) -> String {
    format!("{}.{timestamp}.{json}", W::KIND)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> OperatorKey {
        OperatorKey::new(b"operator-key")
    }

    fn transfer() -> TransferRequest {
        TransferRequest {
            from: AccountId::new(0, 0, 1001),
            to: AccountId::new(0, 0, 123456),
            amount: 500,
            memo: "settlement 0xabc".to_string(),
        }
    }

    #[test]
    fn test_verify_returns_write_and_payer() {
        let signed = key().sign(&transfer()).unwrap();
        let verified = key()
            .verify::<TransferRequest>(&signed.header, &signed.json)
            .unwrap();
        assert_eq!(verified.write, transfer());
        assert_eq!(verified.write.payer(), Some(AccountId::new(0, 0, 1001)));
        assert!(!verified.signature.is_empty());

        let message = SubmitMessageRequest {
            contents: b"trigger".to_vec(),
        };
        assert_eq!(message.payer(), None);
    }

    #[test]
    fn test_foreign_key_and_tampered_body() {
        let signed = key().sign(&transfer()).unwrap();
        assert!(matches!(
            OperatorKey::new(b"someone-else").verify::<TransferRequest>(&signed.header, &signed.json),
            Err(SignatureError::Mismatch)
        ));

        let tampered = signed.json.replace("500", "5000000");
        assert!(matches!(
            key().verify::<TransferRequest>(&signed.header, &tampered),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_signature_is_bound_to_write_kind() {
        let message = SubmitMessageRequest {
            contents: b"trigger".to_vec(),
        };
        let signed = key().sign(&message).unwrap();
        assert!(
            key()
                .verify::<SubmitMessageRequest>(&signed.header, &signed.json)
                .is_ok()
        );
        // same bytes presented to the transfer route
        assert!(matches!(
            key().verify::<TransferRequest>(&signed.header, &signed.json),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_timestamps_outside_window_are_stale() {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        for timestamp in [now - MAX_SIGNATURE_AGE - 10, now + MAX_SIGNATURE_AGE + 10] {
            let signed = key().sign_at(&transfer(), timestamp).unwrap();
            assert!(matches!(
                key().verify::<TransferRequest>(&signed.header, &signed.json),
                Err(SignatureError::Stale { timestamp: t }) if t == timestamp
            ));
        }
    }

    #[test]
    fn test_malformed_header() {
        let json = serde_json::to_string(&transfer()).unwrap();
        let verify = |header: &str| key().verify::<TransferRequest>(header, &json);
        assert!(matches!(verify("no-dot"), Err(SignatureError::MalformedHeader)));
        assert!(matches!(verify("abc.AAAA"), Err(SignatureError::MalformedHeader)));
        assert!(matches!(verify("12.!!!"), Err(SignatureError::InvalidBase64)));
    }

    #[test]
    fn test_debug_redacts_key() {
        assert_eq!(format!("{:?}", key()), "OperatorKey(<redacted>)");
    }
}

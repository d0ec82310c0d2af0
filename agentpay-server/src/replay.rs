//! Replay protection for signed ledger writes.

use agentpay_sdk::signature::MAX_SIGNATURE_AGE;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Signatures accepted within the freshness window.
///
/// A signature older than [`MAX_SIGNATURE_AGE`] is rejected as stale before
/// it gets here, so entries past that age are dropped on every insert.
#[derive(Debug, Default)]
pub struct SeenSignatures {
    seen: Mutex<HashMap<Box<[u8]>, i64>>,
}

impl SeenSignatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `signature`, returning `false` if it was already used.
    pub async fn first_use(&self, signature: &[u8], timestamp: i64) -> bool {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let mut seen = self.seen.lock().await;
        seen.retain(|_, signed_at| now - *signed_at <= MAX_SIGNATURE_AGE);
        if seen.contains_key(signature) {
            return false;
        }
        seen.insert(signature.into(), timestamp);
        true
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }
}

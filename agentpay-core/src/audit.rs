//! Append-only settlement audit log.
//!
//! One JSON object per line. Completed settlements are written as
//! `SETTLEMENT_COMPLETED` lines carrying the full confirmation, failed ones
//! as `SETTLEMENT_ERROR` lines. The log is also the source for payment
//! status lookups.

use agentpay_sdk::objects::{PaymentStatus, SettlementConfirmed, SettlementMessage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

pub const SETTLEMENT_COMPLETED: &str = "SETTLEMENT_COMPLETED";
pub const SETTLEMENT_ERROR: &str = "SETTLEMENT_ERROR";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit entry serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp formatting error: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletedLine<'a> {
    log_timestamp: String,
    log_type: &'static str,
    #[serde(flatten)]
    message: &'a SettlementMessage,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorLine<'a> {
    log_timestamp: String,
    log_type: &'static str,
    merchant_id: &'a str,
    tx_hash: &'a str,
    error: &'a str,
}

/// The subset of fields needed to answer status queries. Lines written by
/// older versions may lack some of them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditLine {
    log_type: Option<String>,
    tx_hash: Option<String>,
    ledger_tx_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    /// Serializes appends so concurrent writers never interleave lines.
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record_completed(&self, confirmed: &SettlementConfirmed) -> Result<(), AuditError> {
        let message = SettlementMessage::Confirmed(confirmed.clone());
        let line = CompletedLine {
            log_timestamp: now_rfc3339()?,
            log_type: SETTLEMENT_COMPLETED,
            message: &message,
        };
        self.append(&serde_json::to_vec(&line)?).await
    }

    pub async fn record_error(
        &self,
        merchant_id: &str,
        tx_hash: &str,
        error: &str,
    ) -> Result<(), AuditError> {
        let line = ErrorLine {
            log_timestamp: now_rfc3339()?,
            log_type: SETTLEMENT_ERROR,
            merchant_id,
            tx_hash,
            error,
        };
        self.append(&serde_json::to_vec(&line)?).await
    }

    async fn append(&self, line: &[u8]) -> Result<(), AuditError> {
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line);
        buf.push(b'\n');
        file.write_all(&buf).await?;
        file.flush().await?;
        Ok(())
    }

    /// Settlement status of a deposit, judged by the last audit line that
    /// mentions `tx_hash`.
    pub async fn payment_status(&self, tx_hash: &str) -> Result<PaymentStatus, AuditError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let latest = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<AuditLine>(line) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable audit line");
                    None
                }
            })
            .filter(|line| line.tx_hash.as_deref() == Some(tx_hash))
            .last();

        let status = match latest {
            Some(line) if line.log_type.as_deref() == Some(SETTLEMENT_COMPLETED) => PaymentStatus {
                processed: true,
                settlement_tx_id: line.ledger_tx_id,
                status: "settled".to_string(),
                error: None,
            },
            Some(line) if line.log_type.as_deref() == Some(SETTLEMENT_ERROR) => PaymentStatus {
                processed: true,
                settlement_tx_id: None,
                status: "failed".to_string(),
                error: line.error,
            },
            _ => PaymentStatus {
                processed: false,
                settlement_tx_id: None,
                status: "pending".to_string(),
                error: None,
            },
        };
        Ok(status)
    }
}

fn now_rfc3339() -> Result<String, time::error::Format> {
    OffsetDateTime::now_utc().format(&Rfc3339)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn confirmed(tx_hash: &str) -> SettlementConfirmed {
        SettlementConfirmed {
            merchant_id: "merchant_001".to_string(),
            tx_hash: tx_hash.to_string(),
            ledger_tx_id: "0.0.1001@1700000000.000000001".to_string(),
            status: "SUCCESS".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_completed_line_shape() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("agent_logs.txt"));
        log.record_completed(&confirmed("0xabc")).await.unwrap();

        let lines = read_lines(log.path());
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["logType"], SETTLEMENT_COMPLETED);
        assert_eq!(line["type"], "SETTLEMENT_CONFIRMED");
        assert_eq!(line["txHash"], "0xabc");
        assert_eq!(line["ledgerTxId"], "0.0.1001@1700000000.000000001");
        let ts = line["logTimestamp"].as_str().unwrap();
        assert!(OffsetDateTime::parse(ts, &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn test_error_line_shape() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("agent_logs.txt"));
        log.record_error("merchant_003", "0xdef", "merchant merchant_003 is not active")
            .await
            .unwrap();

        let lines = read_lines(log.path());
        assert_eq!(lines[0]["logType"], SETTLEMENT_ERROR);
        assert_eq!(lines[0]["merchantId"], "merchant_003");
        assert_eq!(lines[0]["txHash"], "0xdef");
        assert_eq!(lines[0]["error"], "merchant merchant_003 is not active");
    }

    #[tokio::test]
    async fn test_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("agent_logs.txt"));
        log.record_completed(&confirmed("0x1")).await.unwrap();
        log.record_completed(&confirmed("0x2")).await.unwrap();

        let reopened = AuditLog::new(log.path());
        reopened.record_error("merchant_009", "0x3", "boom").await.unwrap();
        assert_eq!(read_lines(log.path()).len(), 3);
    }

    #[tokio::test]
    async fn test_payment_status() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("agent_logs.txt"));

        // missing file reads as pending
        let status = log.payment_status("0xabc").await.unwrap();
        assert!(!status.processed);
        assert_eq!(status.status, "pending");

        log.record_completed(&confirmed("0xabc")).await.unwrap();
        log.record_error("merchant_003", "0xdef", "inactive").await.unwrap();
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(log.path())
            .await
            .unwrap()
            .write_all(b"not json\n")
            .await
            .unwrap();

        let settled = log.payment_status("0xabc").await.unwrap();
        assert!(settled.processed);
        assert_eq!(settled.status, "settled");
        assert_eq!(
            settled.settlement_tx_id.as_deref(),
            Some("0.0.1001@1700000000.000000001")
        );

        let failed = log.payment_status("0xdef").await.unwrap();
        assert_eq!(failed.status, "failed");
        assert_eq!(failed.error.as_deref(), Some("inactive"));

        assert_eq!(log.payment_status("0x404").await.unwrap().status, "pending");
    }
}

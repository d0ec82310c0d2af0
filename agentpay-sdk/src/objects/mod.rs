pub mod deposit;
pub mod ledger;
pub mod merchant;
pub mod settlement;
pub mod status;

pub use deposit::{DepositEvent, NewDeposit};
pub use ledger::{
    AccountId, LedgerTxId, ParseLedgerIdError, TopicId, TopicMessage, TransferReceipt,
    TransferRequest,
};
pub use merchant::{Merchant, NewMerchant};
pub use settlement::{
    DecodeError, SettlementConfirmed, SettlementMessage, SettlementTrigger,
    SETTLEMENT_CONFIRMED, SETTLEMENT_TRIGGER,
};
pub use status::{AgentStatus, ExecutorStatus, PaymentStatus, WatcherStatus};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

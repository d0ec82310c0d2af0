//! The two agents of the settlement pipeline.
//!
//! - `DepositWatcher`: polls the deposit feed, publishes `SETTLEMENT_TRIGGER`
//! - `SettlementExecutor`: consumes triggers, pays merchants, publishes
//!   `SETTLEMENT_CONFIRMED`
//!
//! They only share the trigger topic; neither calls the other.

pub mod deposit_watcher;
pub mod settlement_executor;

#[cfg(test)]
mod testing;

pub use deposit_watcher::{CycleReport, DepositWatcher, WatchError};
pub use settlement_executor::{
    SettlementError, SettlementExecutor, SettlementOutcome, SettlementState,
};

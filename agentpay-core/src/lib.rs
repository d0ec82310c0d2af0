#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod audit;
pub mod config;
pub mod entities;
pub mod feed;
pub mod framework;
pub mod idempotency;
pub mod ledger;
pub mod processors;
pub mod registry;
pub mod stats;
pub mod units;

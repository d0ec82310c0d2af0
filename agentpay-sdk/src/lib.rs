//! Wire types and clients shared by the agentpay services.
//!
//! - [`objects`]: JSON payloads for the deposit feed, the settlement topics,
//!   the merchant registry and the ledger gateway.
//! - [`signature`]: HMAC request signing for ledger gateway writes.
//! - `client` (feature `client`): typed HTTP clients.

pub mod objects;
pub mod signature;

#[cfg(feature = "client")]
pub mod client;

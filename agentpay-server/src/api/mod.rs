//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `GET  /deposits`                               – deposit feed polled by the watcher
//! - `POST /deposits`                               – add a deposit
//! - `POST /test/deposit`                           – add a random test deposit
//! - `GET  /agent/status`                           – watcher / executor statistics
//! - `GET  /payments/{tx_hash}/status`              – settlement status from the audit log
//! - `GET  /merchants`, `POST /merchants`           – merchant registry
//! - `GET  /merchants/{id}`                         – single merchant
//! - `/ledger/...`                                  – sandbox ledger gateway, see [`ledger`]

use axum::Router;

use crate::state::AppState;

pub mod extractors;
mod feed;
mod ledger;
mod merchants;
mod payments;

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(feed::router())
        .merge(merchants::router())
        .merge(payments::router())
        .nest("/ledger", ledger::router())
}

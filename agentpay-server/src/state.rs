//! Application state shared across all request handlers.

use crate::deposits::DepositBook;
use crate::replay::SeenSignatures;
use agentpay_core::audit::AuditLog;
use agentpay_core::ledger::LocalLedger;
use agentpay_core::registry::MerchantRegistry;
use agentpay_core::stats::AgentStats;
use agentpay_sdk::objects::AccountId;
use agentpay_sdk::signature::OperatorKey;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Deposits served by the feed routes.
    pub deposits: Arc<DepositBook>,
    /// Merchant registry, shared with the settlement executor.
    pub registry: Arc<RwLock<MerchantRegistry>>,
    /// Live counters of both agents.
    pub stats: Arc<AgentStats>,
    /// Settlement audit log, read by the payment status route.
    pub audit: Arc<AuditLog>,
    /// The sandbox ledger, when this server hosts one.
    pub ledger: Option<Arc<LocalLedger>>,
    /// Key that signed ledger writes must be verified against.
    pub operator_key: OperatorKey,
    /// The only account a signed transfer may debit.
    pub operator_account: AccountId,
    /// Signatures already accepted by the ledger write routes.
    pub seen_signatures: Arc<SeenSignatures>,
}

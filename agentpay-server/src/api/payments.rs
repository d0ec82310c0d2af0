use agentpay_core::audit::AuditError;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/payments/{tx_hash}/status", get(payment_status))
}

#[derive(Debug)]
pub(crate) enum PaymentApiError {
    Audit(AuditError),
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            PaymentApiError::Audit(e) => {
                tracing::error!(error = %e, "Failed to read audit log");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

/// `GET /payments/{tx_hash}/status`: whether a deposit has been settled.
///
/// Unknown hashes are reported as `pending` rather than 404: the deposit may
/// simply not have reached the executor yet.
async fn payment_status(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let status = state
        .audit
        .payment_status(&tx_hash)
        .await
        .map_err(PaymentApiError::Audit)?;
    Ok(Json(status))
}

//! Authentication of sandbox ledger writes.
//!
//! [`OperatorWrite<W>`] only yields a body that was signed with the operator
//! key, is fresh, has not been presented before, and debits no account other
//! than the operator's.

use agentpay_sdk::objects::AccountId;
use agentpay_sdk::signature::{LedgerWrite, SIGNATURE_HEADER, SignatureError};
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Signed ledger writes are small; anything larger is rejected unread.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub struct OperatorWrite<W: LedgerWrite>(pub W);

#[derive(Debug, thiserror::Error)]
pub enum OperatorWriteError {
    #[error("missing Agentpay-Signature header")]
    MissingSignature,
    #[error("unreadable request body")]
    UnreadableBody,
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("signature was already used")]
    Replayed,
    #[error("operator may not debit account {0}")]
    ForeignPayer(AccountId),
}

impl IntoResponse for OperatorWriteError {
    fn into_response(self) -> Response {
        let status = match &self {
            OperatorWriteError::MissingSignature => StatusCode::UNAUTHORIZED,
            OperatorWriteError::UnreadableBody => StatusCode::BAD_REQUEST,
            OperatorWriteError::Signature(
                SignatureError::Mismatch | SignatureError::Stale { .. },
            ) => StatusCode::UNAUTHORIZED,
            OperatorWriteError::Signature(_) => StatusCode::BAD_REQUEST,
            OperatorWriteError::Replayed => StatusCode::CONFLICT,
            OperatorWriteError::ForeignPayer(_) => StatusCode::FORBIDDEN,
        };
        tracing::warn!(error = %self, "Rejected ledger write");
        (status, self.to_string()).into_response()
    }
}

impl<W: LedgerWrite + Send> FromRequest<AppState> for OperatorWrite<W> {
    type Rejection = OperatorWriteError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = req
            .headers()
            .get(SIGNATURE_HEADER)
            .ok_or(OperatorWriteError::MissingSignature)?
            .to_str()
            .map_err(|_| SignatureError::MalformedHeader)?
            .to_owned();
        let body = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|_| OperatorWriteError::UnreadableBody)?;
        let json = std::str::from_utf8(&body).map_err(|_| OperatorWriteError::UnreadableBody)?;

        let verified = state.operator_key.verify::<W>(&header, json)?;
        match verified.write.payer() {
            Some(payer) if payer != state.operator_account => {
                return Err(OperatorWriteError::ForeignPayer(payer));
            }
            _ => {}
        }
        if !state
            .seen_signatures
            .first_use(&verified.signature, verified.timestamp)
            .await
        {
            return Err(OperatorWriteError::Replayed);
        }
        Ok(OperatorWrite(verified.write))
    }
}

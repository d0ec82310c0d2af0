//! Sandbox ledger gateway.
//!
//! Exposes the in-process [`LocalLedger`] over HTTP so a second agent
//! deployment (or the SDK's `GatewayClient`) can use this server as its
//! ledger. Only mounted with data when the server runs `network = "local"`;
//! otherwise every route answers 404.
//!
//! # Endpoints
//!
//! - `POST /topics/{topic_id}/messages`       – submit a message (operator signed)
//! - `GET  /topics/{topic_id}/messages`       – page through messages
//! - `POST /transfers`                        – debit the operator account (operator signed)
//! - `GET  /accounts/{account_id}/balance`    – account balance
//!
//! Each signature is accepted once; see [`OperatorWrite`].

use std::sync::Arc;

use agentpay_core::ledger::{LedgerError, LocalLedger, SettlementLedger, TopicPublisher};
use agentpay_sdk::objects::ledger::{
    BalanceResponse, MAX_MESSAGES_LIMIT, MessagesQuery, SubmitMessageRequest,
    SubmitMessageResponse,
};
use agentpay_sdk::objects::{AccountId, TopicId, TransferRequest};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::api::extractors::OperatorWrite;
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/topics/{topic_id}/messages",
            post(submit_message).get(list_messages),
        )
        .route("/transfers", post(transfer))
        .route("/accounts/{account_id}/balance", get(balance))
}

#[derive(Debug)]
pub(crate) enum LedgerApiError {
    Disabled,
    Ledger(LedgerError),
}

impl From<LedgerError> for LedgerApiError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl IntoResponse for LedgerApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            LedgerApiError::Disabled => {
                (StatusCode::NOT_FOUND, "sandbox ledger is not enabled").into_response()
            }
            LedgerApiError::Ledger(e) => {
                let status = match &e {
                    LedgerError::UnknownTopic(_) => StatusCode::NOT_FOUND,
                    LedgerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    LedgerError::InvalidAmount(_) | LedgerError::SameAccount(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    LedgerError::Gateway(_) => {
                        tracing::error!(error = %e, "Ledger API upstream error");
                        StatusCode::BAD_GATEWAY
                    }
                };
                (status, e.to_string()).into_response()
            }
        }
    }
}

fn sandbox(state: &AppState) -> Result<&Arc<LocalLedger>, LedgerApiError> {
    state.ledger.as_ref().ok_or(LedgerApiError::Disabled)
}

async fn submit_message(
    State(state): State<AppState>,
    Path(topic_id): Path<TopicId>,
    OperatorWrite(request): OperatorWrite<SubmitMessageRequest>,
) -> Result<impl IntoResponse, LedgerApiError> {
    let ledger = sandbox(&state)?;
    let sequence_number = ledger.publish(topic_id, request.contents).await?;
    Ok(Json(SubmitMessageResponse { sequence_number }))
}

/// `GET /topics/{topic_id}/messages?after=N&limit=M`: messages with a
/// sequence number above `after`, at most [`MAX_MESSAGES_LIMIT`] per page.
async fn list_messages(
    State(state): State<AppState>,
    Path(topic_id): Path<TopicId>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, LedgerApiError> {
    let ledger = sandbox(&state)?;
    let limit = query.limit.clamp(1, MAX_MESSAGES_LIMIT);
    let messages = ledger.messages_after(topic_id, query.after, limit).await?;
    Ok(Json(messages))
}

async fn transfer(
    State(state): State<AppState>,
    OperatorWrite(request): OperatorWrite<TransferRequest>,
) -> Result<impl IntoResponse, LedgerApiError> {
    let ledger = sandbox(&state)?;
    let receipt = ledger.transfer(request).await?;
    Ok(Json(receipt))
}

async fn balance(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, LedgerApiError> {
    let ledger = sandbox(&state)?;
    let balance = ledger.balance(account_id).await;
    Ok(Json(BalanceResponse {
        account_id,
        balance,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{OPERATOR_KEY, TRIGGER_TOPIC, assert_status, get, json_body, state};
    use crate::server::build_router;
    use agentpay_core::ledger::SettlementLedger;
    use agentpay_sdk::objects::ledger::SubmitMessageRequest;
    use agentpay_sdk::objects::{AccountId, TransferRequest};
    use agentpay_sdk::signature::{LedgerWrite, OperatorKey, SIGNATURE_HEADER};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn signed_post<W: LedgerWrite>(uri: &str, write: W, key: &[u8]) -> Request<Body> {
        let signed = OperatorKey::new(key).sign(&write).unwrap();
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signed.header)
            .body(Body::from(signed.json))
            .unwrap()
    }

    fn merchant_transfer(amount: i64) -> TransferRequest {
        TransferRequest {
            from: AccountId::new(0, 0, 1001),
            to: AccountId::new(0, 0, 123456),
            amount,
            memo: "0xabc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_and_page_messages() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir));
        let uri = format!("/api/ledger/topics/{TRIGGER_TOPIC}/messages");

        for (i, contents) in [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
            .into_iter()
            .enumerate()
        {
            let response = app
                .clone()
                .oneshot(signed_post(
                    &uri,
                    SubmitMessageRequest { contents },
                    OPERATOR_KEY,
                ))
                .await
                .unwrap();
            assert_status(&response, StatusCode::OK);
            assert_eq!(json_body(response).await["sequenceNumber"], i as u64 + 1);
        }

        let response = app
            .clone()
            .oneshot(get(&format!("{uri}?after=1&limit=1")))
            .await
            .unwrap();
        assert_status(&response, StatusCode::OK);
        let page = json_body(response).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["sequenceNumber"], 2);

        let all = json_body(app.oneshot(get(&uri)).await.unwrap()).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_topic_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir));

        let response = app
            .oneshot(get("/api/ledger/topics/0.0.42/messages"))
            .await
            .unwrap();
        assert_status(&response, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_writes_require_valid_signature() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir));

        let unsigned = Request::builder()
            .method("POST")
            .uri("/api/ledger/transfers")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(&merchant_transfer(10)).unwrap(),
            ))
            .unwrap();
        let response = app.clone().oneshot(unsigned).await.unwrap();
        assert_status(&response, StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(signed_post(
                "/api/ledger/transfers",
                merchant_transfer(10),
                b"not-the-operator",
            ))
            .await
            .unwrap();
        assert_status(&response, StatusCode::UNAUTHORIZED);

        let balance = json_body(
            app.oneshot(get("/api/ledger/accounts/0.0.123456/balance"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(balance["balance"], 0);
    }

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir));

        let response = app
            .clone()
            .oneshot(signed_post(
                "/api/ledger/transfers",
                merchant_transfer(400),
                OPERATOR_KEY,
            ))
            .await
            .unwrap();
        assert_status(&response, StatusCode::OK);
        let receipt = json_body(response).await;
        assert_eq!(receipt["status"], "SUCCESS");
        assert!(
            receipt["transactionId"]
                .as_str()
                .unwrap()
                .starts_with("0.0.1001@")
        );

        let response = app
            .clone()
            .oneshot(signed_post(
                "/api/ledger/transfers",
                merchant_transfer(601),
                OPERATOR_KEY,
            ))
            .await
            .unwrap();
        assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);

        let operator = json_body(
            app.clone()
                .oneshot(get("/api/ledger/accounts/0.0.1001/balance"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(operator["accountId"], "0.0.1001");
        assert_eq!(operator["balance"], 600);

        let merchant = json_body(
            app.oneshot(get("/api/ledger/accounts/0.0.123456/balance"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(merchant["balance"], 400);
    }

    #[tokio::test]
    async fn test_replayed_transfer_moves_funds_once() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir));
        let signed = OperatorKey::new(OPERATOR_KEY)
            .sign(&merchant_transfer(100))
            .unwrap();
        let replay = || {
            Request::builder()
                .method("POST")
                .uri("/api/ledger/transfers")
                .header("content-type", "application/json")
                .header(SIGNATURE_HEADER, signed.header.as_str())
                .body(Body::from(signed.json.clone()))
                .unwrap()
        };

        let response = app.clone().oneshot(replay()).await.unwrap();
        assert_status(&response, StatusCode::OK);
        let response = app.clone().oneshot(replay()).await.unwrap();
        assert_status(&response, StatusCode::CONFLICT);

        let merchant = json_body(
            app.oneshot(get("/api/ledger/accounts/0.0.123456/balance"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(merchant["balance"], 100);
    }

    #[tokio::test]
    async fn test_transfer_from_foreign_account_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let ledger = state.ledger.clone().unwrap();
        let app = build_router(state);

        // a funded merchant account still cannot be debited by the operator key
        let merchant = AccountId::new(0, 0, 123456);
        ledger.transfer(merchant_transfer(300)).await.unwrap();
        let drain = TransferRequest {
            from: merchant,
            to: AccountId::new(0, 0, 999),
            amount: 300,
            memo: String::new(),
        };
        let response = app
            .clone()
            .oneshot(signed_post("/api/ledger/transfers", drain, OPERATOR_KEY))
            .await
            .unwrap();
        assert_status(&response, StatusCode::FORBIDDEN);
        assert_eq!(ledger.balance(merchant).await, 300);
    }

    #[tokio::test]
    async fn test_routes_disabled_without_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state(&dir);
        state.ledger = None;
        let app = build_router(state);

        let response = app
            .oneshot(get("/api/ledger/accounts/0.0.1001/balance"))
            .await
            .unwrap();
        assert_status(&response, StatusCode::NOT_FOUND);
    }
}

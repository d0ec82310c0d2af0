//! Deposit feed and agent status.

use agentpay_sdk::objects::NewDeposit;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::deposits::{DepositBookError, random_test_deposit};
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/deposits", get(list_deposits).post(add_deposit))
        .route("/test/deposit", post(create_test_deposit))
        .route("/agent/status", get(agent_status))
}

impl IntoResponse for DepositBookError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            DepositBookError::Duplicate(_) => StatusCode::CONFLICT,
            DepositBookError::NonPositiveAmount => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// `GET /deposits`: every deposit in arrival order.
async fn list_deposits(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.deposits.list().await)
}

/// `POST /deposits`: record a deposit reported by the payment rail.
async fn add_deposit(
    State(state): State<AppState>,
    Json(deposit): Json<NewDeposit>,
) -> Result<impl IntoResponse, DepositBookError> {
    let event = state.deposits.add(deposit).await?;
    tracing::info!(
        tx_hash = %event.tx_hash,
        merchant_id = %event.merchant_id,
        amount = %event.amount,
        token = %event.token,
        "Deposit added"
    );
    Ok((StatusCode::CREATED, Json(event)))
}

/// `POST /test/deposit`: record a random deposit for demos.
async fn create_test_deposit(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, DepositBookError> {
    let event = state.deposits.add(random_test_deposit()).await?;
    tracing::info!(
        tx_hash = %event.tx_hash,
        merchant_id = %event.merchant_id,
        amount = %event.amount,
        "Test deposit created"
    );
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /agent/status`: live counters of the watcher and the executor.
async fn agent_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.snapshot())
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{assert_status, get, json_body, post_json, state};
    use crate::server::build_router;
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_add_and_list_deposits() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir));

        let deposit = json!({
            "txHash": "0xabc",
            "fromWallet": "0xwallet",
            "amount": 12.5,
            "token": "USDC",
            "merchantId": "merchant_001"
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/deposits", deposit.clone()))
            .await
            .unwrap();
        assert_status(&response, StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["txHash"], "0xabc");
        assert!(created["timestamp"].as_i64().unwrap() > 0);

        let response = app
            .clone()
            .oneshot(post_json("/api/deposits", deposit))
            .await
            .unwrap();
        assert_status(&response, StatusCode::CONFLICT);

        let response = app.oneshot(get("/api/deposits")).await.unwrap();
        assert_status(&response, StatusCode::OK);
        let listed = json_body(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["amount"], 12.5);
    }

    #[tokio::test]
    async fn test_non_positive_deposit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir));

        let response = app
            .oneshot(post_json(
                "/api/deposits",
                json!({
                    "txHash": "0xneg",
                    "fromWallet": "0xwallet",
                    "amount": -1,
                    "token": "USDC",
                    "merchantId": "merchant_001"
                }),
            ))
            .await
            .unwrap();
        assert_status(&response, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_test_deposit() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json("/api/test/deposit", json!({})))
            .await
            .unwrap();
        assert_status(&response, StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["token"], "USDC");

        let deposits = state.deposits.list().await;
        assert_eq!(deposits.len(), 1);
        assert_eq!(created["txHash"], deposits[0].tx_hash.as_str());
    }

    #[tokio::test]
    async fn test_agent_status() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        state.stats.watcher.set_running(true);
        state.stats.watcher.forwarded();
        let app = build_router(state);

        let response = app.oneshot(get("/api/agent/status")).await.unwrap();
        assert_status(&response, StatusCode::OK);
        let status = json_body(response).await;
        assert_eq!(status["watcher"]["status"], "running");
        assert_eq!(status["watcher"]["eventsForwarded"], 1);
        assert_eq!(status["executor"]["status"], "stopped");
    }
}

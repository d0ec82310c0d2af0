//! Merchant registry routes.

use agentpay_sdk::objects::NewMerchant;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/merchants", get(list_merchants).post(register_merchant))
        .route("/merchants/{id}", get(get_merchant))
}

#[derive(Debug)]
pub(crate) enum MerchantApiError {
    NotFound,
}

impl IntoResponse for MerchantApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            MerchantApiError::NotFound => {
                (StatusCode::NOT_FOUND, "merchant not found").into_response()
            }
        }
    }
}

async fn list_merchants(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    Json(registry.list().to_vec())
}

async fn get_merchant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, MerchantApiError> {
    let registry = state.registry.read().await;
    let merchant = registry.lookup(&id).ok_or(MerchantApiError::NotFound)?;
    Ok(Json(merchant.clone()))
}

/// `POST /merchants`: add a merchant under the next sequential id.
async fn register_merchant(
    State(state): State<AppState>,
    Json(merchant): Json<NewMerchant>,
) -> impl IntoResponse {
    let merchant = state.registry.write().await.register(merchant);
    tracing::info!(
        merchant_id = %merchant.id,
        account = %merchant.ledger_account_id,
        is_active = merchant.is_active,
        "Merchant registered"
    );
    (StatusCode::CREATED, Json(merchant))
}

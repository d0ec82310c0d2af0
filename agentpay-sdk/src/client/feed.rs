//! Deposit feed client.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::{AgentStatus, DepositEvent, NewDeposit, PaymentStatus};

/// Typed HTTP client for the deposit feed served under `/api`.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: Client,
    base_url: Url,
}

impl FeedClient {
    /// * `base_url` – root URL of the feed (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /api/deposits` – every deposit the feed has seen, in feed order.
    pub async fn list_deposits(&self) -> Result<Vec<DepositEvent>, ClientError> {
        let url = self.base_url.join("/api/deposits")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/deposits` – record a new deposit.
    pub async fn add_deposit(&self, deposit: &NewDeposit) -> Result<DepositEvent, ClientError> {
        let url = self.base_url.join("/api/deposits")?;
        let resp = self.http.post(url).json(deposit).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/test/deposit` – let the feed fabricate a random deposit.
    pub async fn create_test_deposit(&self) -> Result<DepositEvent, ClientError> {
        let url = self.base_url.join("/api/test/deposit")?;
        let resp = self.http.post(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/agent/status`.
    pub async fn agent_status(&self) -> Result<AgentStatus, ClientError> {
        let url = self.base_url.join("/api/agent/status")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/payments/{tx_hash}/status`.
    pub async fn payment_status(&self, tx_hash: &str) -> Result<PaymentStatus, ClientError> {
        let mut url = self.base_url.join("/api/payments/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend([tx_hash, "status"]);
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }
}

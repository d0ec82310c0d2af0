//! Ledger gateway client.
//!
//! Reads are plain GETs; writes are signed with the [`OperatorKey`].

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::ledger::{
    AccountId, BalanceResponse, MessagesQuery, SubmitMessageRequest, SubmitMessageResponse,
    TopicId, TopicMessage, TransferReceipt, TransferRequest,
};
use crate::signature::{LedgerWrite, OperatorKey, SIGNATURE_HEADER};

/// Typed HTTP client for the `/api/ledger` gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    operator_key: OperatorKey,
}

impl GatewayClient {
    /// * `base_url` – root URL of the gateway.
    /// * `operator_key` – the operator private key used to sign writes.
    pub fn new(base_url: Url, operator_key: &[u8]) -> Self {
        Self {
            http: Client::new(),
            base_url,
            operator_key: OperatorKey::new(operator_key),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/ledger/topics/{topic_id}/messages` – returns the sequence number.
    pub async fn submit_message(
        &self,
        topic_id: TopicId,
        contents: Vec<u8>,
    ) -> Result<u64, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/ledger/topics/{topic_id}/messages"))?;
        let resp: SubmitMessageResponse = self
            .post_signed(url, SubmitMessageRequest { contents })
            .await?;
        Ok(resp.sequence_number)
    }

    /// `GET /api/ledger/topics/{topic_id}/messages?after=..&limit=..`
    pub async fn messages_after(
        &self,
        topic_id: TopicId,
        query: MessagesQuery,
    ) -> Result<Vec<TopicMessage>, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/ledger/topics/{topic_id}/messages"))?;
        let resp = self.http.get(url).query(&query).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/ledger/transfers`
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, ClientError> {
        let url = self.base_url.join("/api/ledger/transfers")?;
        self.post_signed(url, request).await
    }

    /// `GET /api/ledger/accounts/{account_id}/balance`
    pub async fn balance(&self, account_id: AccountId) -> Result<i64, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/ledger/accounts/{account_id}/balance"))?;
        let resp = self.http.get(url).send().await?;
        let balance: BalanceResponse = parse_response(resp).await?;
        Ok(balance.balance)
    }

    async fn post_signed<W, R>(&self, url: Url, write: W) -> Result<R, ClientError>
    where
        W: LedgerWrite,
        R: serde::de::DeserializeOwned,
    {
        let signed = self.operator_key.sign(&write)?;
        let resp = self
            .http
            .post(url)
            .header(SIGNATURE_HEADER, signed.header)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(signed.json)
            .send()
            .await?;
        parse_response(resp).await
    }
}

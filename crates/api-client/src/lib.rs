use crate::auth::{sign_request, signing_payload};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use configuration::ApiConfig;
use core_types::{Bar, Contract, Holding, OrderRequest, Snapshot};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

mod auth;
pub mod error;
pub mod history;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod responses;
pub mod yahoo;
// --- Public API ---
pub use error::ApiError;
pub use history::{BrokerHistory, HistorySource};
pub use responses::{ApiErrorResponse, OrderResponse};
pub use yahoo::YahooHistory;

/// The broker gateway the monitoring engine talks to.
///
/// This trait is the contract between the engine and the broker, allowing the
/// underlying implementation (live or mock) to be swapped out.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Resolves a stock code to a tradable contract. `Ok(None)` means the
    /// broker does not know the code.
    async fn resolve_contract(&self, code: &str) -> Result<Option<Contract>, ApiError>;

    /// Fetches the current quote of every contract in a single request.
    async fn fetch_snapshots(&self, contracts: &[Contract]) -> Result<Vec<Snapshot>, ApiError>;

    /// Fetches daily bars for `[start, end]`, both inclusive.
    async fn fetch_daily_bars(
        &self,
        contract: &Contract,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ApiError>;

    /// Places a new order on the exchange. (Authenticated)
    async fn place_order(
        &self,
        contract: &Contract,
        order: &OrderRequest,
    ) -> Result<OrderResponse, ApiError>;

    /// Fetches all open stock positions, in shares. (Authenticated)
    async fn list_positions(&self) -> Result<Vec<Holding>, ApiError>;
}

/// A signed REST client for the broker gateway.
#[derive(Clone)]
pub struct BrokerClient {
    client: reqwest::Client,
    base_url: String,

    api_secret: String,
}

impl BrokerClient {
    pub fn new(api_config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-API-KEY",
            HeaderValue::from_str(&api_config.key)
                .map_err(|e| ApiError::InvalidData(format!("Invalid API key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(api_config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: api_config.base_url.trim_end_matches('/').to_string(),
            api_secret: api_config.secret.clone(),
        })
    }

    /// Sends a signed request and decodes the JSON response.
    ///
    /// `Ok(None)` is returned for a 404, which the broker uses for unknown codes.
    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<String>,
    ) -> Result<Option<T>, ApiError> {
        let timestamp = Utc::now().timestamp_millis();
        let body = body.unwrap_or_default();
        let payload = signing_payload(timestamp, method.as_str(), path_and_query, &body);
        let signature = sign_request(&self.api_secret, &payload);

        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!(method = %method, path = path_and_query, "Broker request.");
        let mut request = self
            .client
            .request(method, &url)
            .header("X-TIMESTAMP", timestamp.to_string())
            .header("X-SIGNATURE", signature);
        if !body.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(path = path_and_query, status = status.as_u16(), "Broker response.");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_success() {
            return serde_json::from_str::<T>(&text)
                .map(Some)
                .map_err(|e| ApiError::Deserialization(e.to_string()));
        }

        let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err) => format!("{} (code {})", err.msg, err.code),
            Err(_) => text,
        };
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_signed<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        self.send_signed(Method::GET, path, None).await
    }

    async fn post_signed<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::InvalidData(e.to_string()))?;
        self.send_signed(Method::POST, path, Some(body))
            .await?
            .ok_or_else(|| ApiError::Rejected {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("{path} not found"),
            })
    }
}

#[async_trait]
impl ApiClient for BrokerClient {
    async fn resolve_contract(&self, code: &str) -> Result<Option<Contract>, ApiError> {
        let path = format!("/api/v1/contracts/stocks/{code}");
        let contract = self.get_signed::<responses::ContractResponse>(&path).await?;
        Ok(contract.map(Contract::from))
    }

    async fn fetch_snapshots(&self, contracts: &[Contract]) -> Result<Vec<Snapshot>, ApiError> {
        if contracts.is_empty() {
            return Ok(Vec::new());
        }
        let request = responses::SnapshotRequest {
            codes: contracts.iter().map(|c| c.code.as_str()).collect(),
        };
        let snapshots: Vec<responses::SnapshotResponse> =
            self.post_signed("/api/v1/snapshots", &request).await?;
        Ok(snapshots.into_iter().map(Snapshot::from).collect())
    }

    async fn fetch_daily_bars(
        &self,
        contract: &Contract,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ApiError> {
        let path = format!(
            "/api/v1/kbars?code={}&start={}&end={}",
            contract.code,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
        match self.get_signed::<responses::KbarsResponse>(&path).await? {
            Some(kbars) => kbars.into_bars(),
            None => Ok(Vec::new()),
        }
    }

    async fn place_order(
        &self,
        contract: &Contract,
        order: &OrderRequest,
    ) -> Result<OrderResponse, ApiError> {
        let payload = responses::OrderPayload {
            code: &contract.code,
            action: order.side,
            quantity: order.quantity,
            price: order.price,
            price_type: order.price_type,
            order_type: order.order_type,
            client_order_id: order.client_order_id.to_string(),
        };
        self.post_signed("/api/v1/orders", &payload).await
    }

    async fn list_positions(&self) -> Result<Vec<Holding>, ApiError> {
        let positions: Vec<responses::PositionResponse> = self
            .get_signed("/api/v1/positions?unit=share")
            .await?
            .unwrap_or_default();
        Ok(positions
            .into_iter()
            .filter_map(responses::PositionResponse::into_holding)
            .collect())
    }
}

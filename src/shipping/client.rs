//! HTTP client for the Shipmozo API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::wire::{
    AssignCourierRequest, AssignedCourier, Envelope, PushOrderRequest, PushedOrder, RateCalculatorRequest, RateCourier,
};
use super::{AggregatorError, ShippingAggregator, DEFAULT_BASE_URL};

#[derive(Debug, Clone)]
pub struct ShipmozoConfig {
    pub base_url: String,
    pub public_key: String,
    pub private_key: String,
    /// Upper bound on every call; a timeout counts as a failed call.
    pub timeout: Duration,
}

impl ShipmozoConfig {
    /// - `SHIPMOZO_PUBLIC_KEY`, `SHIPMOZO_PRIVATE_KEY`: required
    /// - `SHIPMOZO_BASE_URL`: optional
    /// - `SHIPMOZO_TIMEOUT_SECS`: optional (default: 15)
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;
        let public_key = std::env::var("SHIPMOZO_PUBLIC_KEY").context("SHIPMOZO_PUBLIC_KEY not set")?;
        let private_key = std::env::var("SHIPMOZO_PRIVATE_KEY").context("SHIPMOZO_PRIVATE_KEY not set")?;
        let base_url = std::env::var("SHIPMOZO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("SHIPMOZO_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(15);
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), public_key, private_key, timeout: Duration::from_secs(timeout_secs) })
    }
}

pub struct ShipmozoClient {
    http: Client,
    config: ShipmozoConfig,
}

impl ShipmozoClient {
    pub fn new(config: ShipmozoConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout).connect_timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, endpoint: &'static str, body: &B) -> Result<T, AggregatorError> {
        let url = format!("{}/{}", self.config.base_url, endpoint);
        let response = self.http.post(&url)
            .header("public-key", &self.config.public_key)
            .header("private-key", &self.config.private_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint, status = %status, "shipmozo returned non-success status");
            return Err(AggregatorError::Status { endpoint, status: status.as_u16(), body: body.chars().take(200).collect() });
        }

        let bytes = response.bytes().await.map_err(|e| transport(endpoint, e))?;
        let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|source| AggregatorError::Decode { endpoint, source })?;
        debug!(endpoint, result = %envelope.result, message = %envelope.message, "shipmozo response");
        envelope.into_data(endpoint)
    }
}

fn transport(endpoint: &'static str, source: reqwest::Error) -> AggregatorError {
    if source.is_timeout() { AggregatorError::Timeout { endpoint } } else { AggregatorError::Transport { endpoint, source } }
}

#[async_trait]
impl ShippingAggregator for ShipmozoClient {
    async fn rate_calculator(&self, req: &RateCalculatorRequest) -> Result<Vec<RateCourier>, AggregatorError> {
        self.post("rate-calculator", req).await
    }

    async fn push_order(&self, req: &PushOrderRequest) -> Result<PushedOrder, AggregatorError> {
        self.post("push-order", req).await
    }

    async fn assign_courier(&self, req: &AssignCourierRequest) -> Result<AssignedCourier, AggregatorError> {
        self.post("assign-courier", req).await
    }

    fn tracking_url(&self, awb_number: &str) -> String {
        format!("{}/track-order?awb_number={}", self.config.base_url, awb_number)
    }
}

//! Shipping aggregator integration.
//!
//! [`ShippingAggregator`] is the seam between fulfillment and the remote
//! Shipmozo API. [`ShipmozoClient`] is the HTTP implementation; tests
//! substitute scripted ones.

pub mod client;
pub mod wire;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use client::{ShipmozoClient, ShipmozoConfig};
pub use wire::{
    AssignCourierRequest, AssignedCourier, PushOrderRequest, PushedOrder, RateCalculatorRequest, RateCourier,
};

pub const DEFAULT_BASE_URL: &str = "https://shipping-api.com/app/api/v1";

#[async_trait]
pub trait ShippingAggregator: Send + Sync {
    /// `POST /rate-calculator`. Pure query.
    async fn rate_calculator(&self, req: &RateCalculatorRequest) -> Result<Vec<RateCourier>, AggregatorError>;

    /// `POST /push-order`. Creates one remote shipment record per call.
    async fn push_order(&self, req: &PushOrderRequest) -> Result<PushedOrder, AggregatorError>;

    /// `POST /assign-courier` against a previously pushed shipment.
    async fn assign_courier(&self, req: &AssignCourierRequest) -> Result<AssignedCourier, AggregatorError>;

    fn tracking_url(&self, awb_number: &str) -> String {
        format!("{DEFAULT_BASE_URL}/track-order?awb_number={awb_number}")
    }
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("{endpoint} timed out")]
    Timeout { endpoint: &'static str },

    #[error("{endpoint} transport error: {source}")]
    Transport { endpoint: &'static str, #[source] source: reqwest::Error },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status { endpoint: &'static str, status: u16, body: String },

    #[error("{endpoint} rejected request: {message}")]
    Rejected { endpoint: &'static str, message: String },

    #[error("{endpoint} returned an undecodable body: {source}")]
    Decode { endpoint: &'static str, #[source] source: serde_json::Error },
}

/// One quote from the rate calculator, valid for a single assignment sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourierOffer {
    pub courier_id: u64,
    pub name: String,
    pub total_charges: i64,
    pub before_tax_charges: i64,
    pub tax: i64,
    pub estimated_delivery: String,
    pub minimum_chargeable_weight: String,
    pub auto_pickup: bool,
}

impl From<RateCourier> for CourierOffer {
    fn from(c: RateCourier) -> Self {
        Self {
            courier_id: c.id,
            name: c.name,
            total_charges: c.total_charges,
            before_tax_charges: c.before_tax_total_charges,
            tax: c.gst,
            estimated_delivery: c.estimated_delivery,
            minimum_chargeable_weight: c.minimum_chargeable_weight,
            auto_pickup: c.pickups_automatically_scheduled,
        }
    }
}

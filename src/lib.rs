//! Shipmozo Fulfillment
//!
//! Order fulfillment orchestration for a storefront that ships through the
//! Shipmozo aggregator.
//!
//! ## Features
//! - Rate quotes for an order or a product
//! - Cheapest-first courier assignment with fallback
//! - Shipment push
//! - Order status state machine with cancellation compensation
//! - Delivery-status webhook reconciliation and customer notifications

pub mod api;
pub mod config;
pub mod domain;
pub mod fulfillment;
pub mod notify;
pub mod publisher;
pub mod shipping;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use domain::aggregates::OrderError;
use domain::value_objects::{OrderId, PincodeError};
use shipping::AggregatorError;
use store::StoreError;

#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("Order not found")]
    OrderNotFound,

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Order address not found on customer")]
    AddressNotFound,

    #[error("Invalid pincode: {0}")]
    InvalidPincode(#[from] PincodeError),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Pickup location not found")]
    PickupNotFound,

    #[error("Pickup {0} is not registered with the aggregator")]
    PickupWarehouseMissing(Uuid),

    #[error("Rate quote failed: {0}")]
    RateQuoteFailed(#[source] AggregatorError),

    #[error("Shipment push failed: {0}")]
    ShipmentPushFailed(#[source] AggregatorError),

    #[error("No courier accepted the shipment ({attempted} tried)")]
    CourierAssignmentExhausted { attempted: usize },

    #[error("Order {0} was changed by another request")]
    OrderAlreadyAdvanced(OrderId),

    #[error(transparent)]
    Transition(#[from] OrderError),

    #[error("No order linked to shipment {0}")]
    WebhookOrderNotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, FulfillmentError>;

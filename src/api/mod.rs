//! HTTP surface.

pub mod errors;
pub mod orders;
pub mod shipping;
pub mod webhooks;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::fulfillment::{OrderFulfillment, WebhookReconciler};
use crate::shipping::ShippingAggregator;
use crate::store::FulfillmentStore;

#[derive(Clone)]
pub struct AppState {
    pub fulfillment: OrderFulfillment,
    pub reconciler: WebhookReconciler,
    pub store: Arc<dyn FulfillmentStore>,
    pub aggregator: Arc<dyn ShippingAggregator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shipmozo-fulfillment"})) }))
        .route("/api/order/:orderId", get(orders::get_order).put(orders::update_order))
        .route("/api/webhooks/shipmozo", post(webhooks::shipmozo))
        .route("/api/shipping/rate-calculator", post(shipping::rate_calculator))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

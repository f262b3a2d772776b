use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;
use validator::Validate;

use super::errors::fulfillment_error_to_response;
use super::AppState;
use crate::fulfillment::ShipmozoWebhook;
use crate::FulfillmentError;

/// Callbacks we cannot use are still acknowledged with `success: false` so
/// the aggregator stops redelivering them. Only storage failures answer 500.
pub async fn shipmozo(State(s): State<AppState>, body: Bytes) -> Response {
    let payload: ShipmozoWebhook = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "undecodable webhook body");
            return Json(json!({ "success": false })).into_response();
        }
    };
    if let Err(e) = payload.validate() {
        warn!(error = %e, "webhook without a shipment id");
        return Json(json!({ "success": false })).into_response();
    }
    match s.reconciler.reconcile(payload).await {
        Ok(status) => Json(json!({ "success": true, "status": status })).into_response(),
        Err(FulfillmentError::WebhookOrderNotFound(_)) => Json(json!({ "success": false })).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}

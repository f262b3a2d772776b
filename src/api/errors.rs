use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::aggregates::OrderError;
use crate::store::StoreError;
use crate::FulfillmentError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn fulfillment_error_to_response(err: FulfillmentError) -> Response {
    let (status, code) = match &err {
        FulfillmentError::OrderNotFound => (StatusCode::NOT_FOUND, "order_not_found"),
        FulfillmentError::CustomerNotFound => (StatusCode::BAD_REQUEST, "customer_not_found"),
        FulfillmentError::AddressNotFound => (StatusCode::BAD_REQUEST, "address_not_found"),
        FulfillmentError::InvalidPincode(_) => (StatusCode::BAD_REQUEST, "invalid_pincode"),
        FulfillmentError::ProductNotFound => (StatusCode::BAD_REQUEST, "product_not_found"),
        FulfillmentError::PickupNotFound => (StatusCode::BAD_REQUEST, "pickup_not_found"),
        FulfillmentError::PickupWarehouseMissing(_) => (StatusCode::BAD_REQUEST, "pickup_warehouse_missing"),
        FulfillmentError::Transition(OrderError::Locked(_)) => (StatusCode::BAD_REQUEST, "order_locked"),
        FulfillmentError::Transition(OrderError::InvalidTransition { .. }) => (StatusCode::BAD_REQUEST, "invalid_transition"),
        FulfillmentError::OrderAlreadyAdvanced(_) => (StatusCode::CONFLICT, "order_already_advanced"),
        FulfillmentError::RateQuoteFailed(_) => (StatusCode::BAD_GATEWAY, "rate_quote_failed"),
        FulfillmentError::ShipmentPushFailed(_) => (StatusCode::BAD_GATEWAY, "shipment_push_failed"),
        FulfillmentError::CourierAssignmentExhausted { .. } => (StatusCode::BAD_GATEWAY, "courier_assignment_exhausted"),
        FulfillmentError::WebhookOrderNotFound(_) => (StatusCode::NOT_FOUND, "webhook_order_not_found"),
        FulfillmentError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
        FulfillmentError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
    };
    if status.is_server_error() {
        tracing::error!(error = %err, code, "request failed");
    }
    json_error(status, code, err.to_string())
}

pub fn validation_error(errors: validator::ValidationErrors) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", errors.to_string())
}

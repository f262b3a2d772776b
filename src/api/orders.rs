use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::errors::{fulfillment_error_to_response, json_error};
use super::AppState;
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::OrderId;

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest { pub status: String }

pub async fn get_order(State(s): State<AppState>, Path(order_id): Path<String>) -> Response {
    match s.fulfillment.view(&OrderId::new(order_id)).await {
        Ok(view) => Json(json!({ "success": true, "order": view })).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}

pub async fn update_order(State(s): State<AppState>, Path(order_id): Path<String>, Json(r): Json<UpdateOrderRequest>) -> Response {
    let requested: OrderStatus = match r.status.parse() {
        Ok(status) => status,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string()),
    };
    match s.fulfillment.update_status(&OrderId::new(order_id), requested).await {
        Ok(view) => Json(json!({ "success": true, "order": view })).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}

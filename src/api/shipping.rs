//! Storefront rate calculator: what would shipping this product cost?

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::errors::{fulfillment_error_to_response, validation_error};
use super::AppState;
use crate::domain::value_objects::{PaymentType, Pincode};
use crate::fulfillment::{cheapest_first, quote, RateQuery};
use crate::shipping::CourierOffer;
use crate::FulfillmentError;

#[derive(Debug, Deserialize, Validate)]
pub struct RateCalculatorRequest {
    pub product_id: Uuid,
    #[validate(length(equal = 6))]
    pub delivery_pincode: String,
    pub payment_type: Option<PaymentType>,
}

pub async fn rate_calculator(State(s): State<AppState>, Json(r): Json<RateCalculatorRequest>) -> Response {
    if let Err(e) = r.validate() { return validation_error(e); }
    match offers_for(&s, &r).await {
        Ok(offers) => Json(json!({ "success": true, "couriers": offers })).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}

async fn offers_for(s: &AppState, r: &RateCalculatorRequest) -> Result<Vec<CourierOffer>, FulfillmentError> {
    let delivery = Pincode::parse(&r.delivery_pincode)?;
    let product = s.store.find_product(r.product_id).await?.ok_or(FulfillmentError::ProductNotFound)?;
    let pickup_id = product.pickup_id.ok_or(FulfillmentError::PickupNotFound)?;
    let pickup = s.store.find_pickup(pickup_id).await?.ok_or(FulfillmentError::PickupNotFound)?;

    let query = RateQuery::for_product(&product, pickup.pincode()?, delivery, r.payment_type.unwrap_or(PaymentType::Prepaid));
    let mut offers = quote(s.aggregator.as_ref(), &query).await?;
    cheapest_first(&mut offers);
    Ok(offers)
}

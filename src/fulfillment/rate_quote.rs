//! Rate quotes from the aggregator's rate calculator.

use tracing::debug;

use crate::domain::aggregates::{Order, Product};
use crate::domain::value_objects::{Dimensions, PaymentType, Pincode};
use crate::shipping::{CourierOffer, RateCalculatorRequest, ShippingAggregator};
use crate::FulfillmentError;

/// What a shipment looks like to the rate calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuery {
    pub pickup: Pincode,
    pub delivery: Pincode,
    pub payment_type: PaymentType,
    pub order_amount: i64,
    pub cod_amount: Option<i64>,
    pub weight_grams: u32,
    pub dimensions: Vec<Dimensions>,
}

impl RateQuery {
    pub fn for_order(order: &Order, product: &Product, pickup: Pincode, delivery: Pincode) -> Self {
        Self {
            pickup,
            delivery,
            payment_type: order.payment_type(),
            order_amount: order.order_value(),
            cod_amount: order.cod_amount(),
            weight_grams: product.shipping_weight(),
            dimensions: vec![product.package()],
        }
    }

    /// A single unit of `product`, as quoted to a shopper before checkout.
    pub fn for_product(product: &Product, pickup: Pincode, delivery: Pincode, payment_type: PaymentType) -> Self {
        Self {
            pickup,
            delivery,
            payment_type,
            order_amount: product.price,
            cod_amount: (payment_type == PaymentType::Cod).then_some(product.price),
            weight_grams: product.shipping_weight(),
            dimensions: vec![product.package()],
        }
    }

    pub fn to_request(&self) -> RateCalculatorRequest {
        RateCalculatorRequest {
            order_id: None,
            pickup_pincode: self.pickup.value(),
            delivery_pincode: self.delivery.value(),
            payment_type: self.payment_type,
            shipment_type: "FORWARD",
            order_amount: self.order_amount,
            type_of_package: "SPS",
            rov_type: "ROV_OWNER",
            cod_amount: self.cod_amount,
            weight: self.weight_grams,
            dimensions: self.dimensions.iter().copied().map(Into::into).collect(),
        }
    }
}

/// Fetch fresh offers. Never cached: every assignment sequence re-queries.
pub async fn quote(aggregator: &dyn ShippingAggregator, query: &RateQuery) -> Result<Vec<CourierOffer>, FulfillmentError> {
    let couriers = aggregator.rate_calculator(&query.to_request()).await.map_err(FulfillmentError::RateQuoteFailed)?;
    debug!(pickup = %query.pickup, delivery = %query.delivery, offers = couriers.len(), "rate quote received");
    Ok(couriers.into_iter().map(CourierOffer::from).collect())
}

/// Cheapest first; equal prices keep the aggregator's order.
pub fn cheapest_first(offers: &mut [CourierOffer]) {
    offers.sort_by_key(|o| o.total_charges);
}

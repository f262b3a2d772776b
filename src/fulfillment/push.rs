//! Shipment push: registers the order as a shipment record at the aggregator.

use chrono::NaiveDate;
use tracing::info;

use crate::domain::aggregates::{Address, Order, Product};
use crate::domain::value_objects::Pincode;
use crate::shipping::wire::ProductLine;
use crate::shipping::{PushOrderRequest, ShippingAggregator};
use crate::FulfillmentError;

/// Everything the push needs, resolved beforehand by the caller.
pub struct ShipmentDraft<'a> {
    pub order: &'a Order,
    pub customer_name: &'a str,
    pub address: &'a Address,
    pub delivery: Pincode,
    pub product: &'a Product,
    pub warehouse_id: &'a str,
}

impl ShipmentDraft<'_> {
    pub fn to_request(&self, order_date: NaiveDate) -> PushOrderRequest {
        let package = self.product.package();
        PushOrderRequest {
            order_id: self.order.order_id().to_string(),
            order_date: order_date.format("%Y-%m-%d").to_string(),
            consignee_name: self.address.name.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| self.customer_name.to_string()),
            consignee_phone: self.address.mobile.clone(),
            consignee_address_line_one: self.address.line_one(),
            consignee_pin_code: self.delivery.value(),
            consignee_city: self.address.city.clone(),
            consignee_state: self.address.state.clone(),
            product_detail: vec![ProductLine {
                name: self.product.name.clone(),
                quantity: self.order.quantity(),
                unit_price: self.product.price,
                product_category: "Other",
                discount: self.product.discount,
                hsn: self.product.sku.clone(),
            }],
            payment_type: self.order.payment_type(),
            cod_amount: self.order.cod_amount(),
            weight: self.product.shipping_weight(),
            length: package.length,
            width: package.width,
            height: package.height,
            warehouse_id: self.warehouse_id.to_string(),
        }
    }
}

/// Creates exactly one remote shipment and returns its id. Callers must not
/// push the same order twice.
pub async fn push_shipment(aggregator: &dyn ShippingAggregator, request: &PushOrderRequest) -> Result<String, FulfillmentError> {
    let pushed = aggregator.push_order(request).await.map_err(FulfillmentError::ShipmentPushFailed)?;
    info!(order_id = %request.order_id, shipment_id = %pushed.order_id, warehouse_id = %request.warehouse_id, "order pushed to shipmozo");
    Ok(pushed.order_id)
}

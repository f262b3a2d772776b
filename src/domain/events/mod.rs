//! Domain events
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::OrderId;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Shipped { order_id: OrderId, courier_name: String, awb_number: String },
    Cancelled { order_id: OrderId, customer_id: Uuid, order_value: i64 },
    ShipmentStatusChanged { order_id: OrderId, carrier_status: String, status: OrderStatus },
    Delivered { order_id: OrderId },
}

impl OrderEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Shipped { .. } => "orders.shipped",
            Self::Cancelled { .. } => "orders.cancelled",
            Self::ShipmentStatusChanged { .. } => "orders.shipment_status_changed",
            Self::Delivered { .. } => "orders.delivered",
        }
    }
}

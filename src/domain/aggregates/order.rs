//! Order Aggregate
//!
//! Owns the order status state machine. Commercial fields are fixed at
//! placement; `status`, `payment_status` and `shipping` only move through the
//! methods below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{OrderId, PaymentType};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub(crate) order_id: OrderId,
    pub(crate) payment_id: Uuid,
    pub(crate) customer_id: Uuid,
    pub(crate) mobile: String,
    pub(crate) address_id: Uuid,
    pub(crate) product_id: Uuid,
    pub(crate) quantity: u32,
    pub(crate) price: i64,
    pub(crate) order_value: i64,
    pub(crate) coupon_code: Option<String>,
    pub(crate) coupon_discount: Option<i64>,
    pub(crate) status: OrderStatus,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) shipping: Shipping,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<OrderEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Processing,
    Confirmed,
    Shipped,
    InTransit,
    OutForDelivery,
    Delivered,
    Cancelled,
    #[serde(rename = "RTO")]
    Rto,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Confirmed => "Confirmed",
            Self::Shipped => "Shipped",
            Self::InTransit => "InTransit",
            Self::OutForDelivery => "OutForDelivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Rto => "RTO",
        }
    }

    /// Shipped or anywhere past it.
    pub fn is_shipped(&self) -> bool {
        matches!(self, Self::Shipped | Self::InTransit | Self::OutForDelivery | Self::Delivered | Self::Rto)
    }

    /// No generic update may touch an order in one of these states.
    pub fn is_locked(&self) -> bool { self.is_shipped() || *self == Self::Cancelled }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Processing" => Self::Processing,
            "Confirmed" => Self::Confirmed,
            "Shipped" => Self::Shipped,
            "InTransit" => Self::InTransit,
            "OutForDelivery" => Self::OutForDelivery,
            "Delivered" => Self::Delivered,
            "Cancelled" => Self::Cancelled,
            "RTO" => Self::Rto,
            other => return Err(UnknownStatus(other.to_string())),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus { #[default] Paid, Unpaid, Refunded }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Paid => "Paid", Self::Unpaid => "Unpaid", Self::Refunded => "Refunded" }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paid" => Ok(Self::Paid),
            "Unpaid" => Ok(Self::Unpaid),
            "Refunded" => Ok(Self::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownStatus(pub String);
impl std::error::Error for UnknownStatus {}
impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown status '{}'", self.0) }
}

/// Shipment sub-document. Written by fulfillment and the webhook only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shipping {
    pub shipmozo_order_id: Option<String>,
    pub courier_id: Option<u64>,
    pub courier_name: Option<String>,
    pub reference_id: Option<String>,
    pub awb_number: Option<String>,
    pub tracking_url: Option<String>,
    pub label_generated: bool,
    pub current_status: Option<String>,
    pub expected_delivery_date: Option<String>,
    pub last_status_time: Option<String>,
    pub tracking_history: Vec<TrackingEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingEvent { pub timestamp: String, pub status: String, pub location: String }

/// Outcome of a successful courier assignment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierAssignment {
    pub courier_id: u64,
    pub courier_name: String,
    pub reference_id: Option<String>,
    pub awb_number: String,
    pub estimated_delivery: Option<String>,
    pub tracking_url: String,
}

/// One carrier status callback, already decoded from the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackingUpdate {
    pub awb_number: Option<String>,
    pub carrier: Option<String>,
    pub current_status: Option<String>,
    pub status_time: Option<String>,
    pub expected_delivery_date: Option<String>,
    pub scans: Vec<TrackingEvent>,
}

/// What a generic status update asks the state machine to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition { Fulfil, Cancel }

/// Counter deltas to undo on the owning customer after a cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Compensation { pub customer_id: Uuid, pub orders: i64, pub spent: i64 }

/// Commercial fields captured at checkout.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub payment_id: Uuid,
    pub customer_id: Uuid,
    pub mobile: String,
    pub address_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: i64,
    pub coupon_code: Option<String>,
    pub coupon_discount: Option<i64>,
}

pub const CARRIER_PICKED_UP: &str = "Shipment picked up";
pub const CARRIER_OUT_FOR_DELIVERY: &str = "Out for delivery";
pub const CARRIER_DELIVERED: &str = "Delivered";

impl Order {
    pub fn place(new: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            order_value: new.price * i64::from(new.quantity),
            order_id: new.order_id, payment_id: new.payment_id, customer_id: new.customer_id,
            mobile: new.mobile, address_id: new.address_id, product_id: new.product_id,
            quantity: new.quantity, price: new.price,
            coupon_code: new.coupon_code, coupon_discount: new.coupon_discount,
            status: OrderStatus::Processing, payment_status: PaymentStatus::Paid,
            shipping: Shipping::default(), created_at: now, updated_at: now, events: vec![],
        }
    }

    pub fn order_id(&self) -> &OrderId { &self.order_id }
    pub fn payment_id(&self) -> Uuid { self.payment_id }
    pub fn customer_id(&self) -> Uuid { self.customer_id }
    pub fn mobile(&self) -> &str { &self.mobile }
    pub fn address_id(&self) -> Uuid { self.address_id }
    pub fn product_id(&self) -> Uuid { self.product_id }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn price(&self) -> i64 { self.price }
    pub fn order_value(&self) -> i64 { self.order_value }
    pub fn coupon_code(&self) -> Option<&str> { self.coupon_code.as_deref() }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn shipping(&self) -> &Shipping { &self.shipping }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Prepaid once captured, otherwise cash on delivery for the full value.
    pub fn payment_type(&self) -> PaymentType {
        if self.payment_status == PaymentStatus::Paid { PaymentType::Prepaid } else { PaymentType::Cod }
    }

    pub fn cod_amount(&self) -> Option<i64> {
        (self.payment_type() == PaymentType::Cod).then_some(self.order_value)
    }

    /// Decide what a requested status means for this order.
    pub fn plan_transition(&self, to: OrderStatus) -> Result<Transition, OrderError> {
        if self.status.is_locked() { return Err(OrderError::Locked(self.status)); }
        match (self.status, to) {
            (OrderStatus::Processing, OrderStatus::Confirmed) => Ok(Transition::Fulfil),
            (OrderStatus::Processing | OrderStatus::Confirmed, OrderStatus::Cancelled) => Ok(Transition::Cancel),
            (from, to) => Err(OrderError::InvalidTransition { from, to }),
        }
    }

    /// Record the shipment created at the aggregator and the courier that took it.
    pub fn mark_shipped(&mut self, shipment_id: String, assignment: CourierAssignment) -> Result<(), OrderError> {
        if self.status != OrderStatus::Processing {
            return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Shipped });
        }
        self.shipping = Shipping {
            shipmozo_order_id: Some(shipment_id),
            courier_id: Some(assignment.courier_id),
            courier_name: Some(assignment.courier_name.clone()),
            reference_id: assignment.reference_id,
            awb_number: Some(assignment.awb_number.clone()),
            tracking_url: Some(assignment.tracking_url),
            label_generated: false,
            current_status: Some(OrderStatus::Shipped.as_str().to_string()),
            expected_delivery_date: assignment.estimated_delivery,
            last_status_time: None,
            tracking_history: vec![],
        };
        self.status = OrderStatus::Shipped;
        self.touch();
        self.raise_event(OrderEvent::Shipped {
            order_id: self.order_id.clone(),
            courier_name: assignment.courier_name,
            awb_number: assignment.awb_number,
        });
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<Compensation, OrderError> {
        if self.status.is_locked() { return Err(OrderError::Locked(self.status)); }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(OrderEvent::Cancelled { order_id: self.order_id.clone(), customer_id: self.customer_id, order_value: self.order_value });
        Ok(Compensation { customer_id: self.customer_id, orders: 1, spent: self.order_value })
    }

    /// Fold a carrier callback in. Scalars are overwritten, history is replaced
    /// wholesale. Returns the new status when the callback moved it.
    pub fn apply_tracking(&mut self, update: TrackingUpdate) -> Option<OrderStatus> {
        let next = match update.current_status.as_deref() {
            Some(CARRIER_PICKED_UP) => Some(OrderStatus::InTransit),
            Some(CARRIER_OUT_FOR_DELIVERY) => Some(OrderStatus::OutForDelivery),
            Some(CARRIER_DELIVERED) => Some(OrderStatus::Delivered),
            _ => None,
        };

        // Shipment identity is only ever superseded, never cleared.
        if let Some(awb) = update.awb_number.filter(|a| !a.is_empty()) { self.shipping.awb_number = Some(awb); }
        if let Some(carrier) = update.carrier.filter(|c| !c.is_empty()) { self.shipping.courier_name = Some(carrier); }
        self.shipping.current_status = update.current_status.clone();
        self.shipping.expected_delivery_date = update.expected_delivery_date;
        self.shipping.last_status_time = update.status_time;
        self.shipping.tracking_history = update.scans;

        if let Some(status) = next {
            self.status = status;
            if status == OrderStatus::Delivered {
                self.payment_status = PaymentStatus::Paid;
                self.raise_event(OrderEvent::Delivered { order_id: self.order_id.clone() });
            }
        }
        self.raise_event(OrderEvent::ShipmentStatusChanged {
            order_id: self.order_id.clone(),
            carrier_status: update.current_status.unwrap_or_default(),
            status: self.status,
        });
        self.touch();
        next
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    Locked(OrderStatus),
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked(status) => write!(f, "{status} orders cannot be modified"),
            Self::InvalidTransition { from, to } => write!(f, "cannot move order from {from} to {to}"),
        }
    }
}

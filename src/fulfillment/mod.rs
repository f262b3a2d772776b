//! Order fulfillment orchestration.
//!
//! `Processing → Confirmed` pushes the order to Shipmozo, assigns the
//! cheapest courier that accepts it, and lands the order in `Shipped`. Any
//! failure on that path leaves the order in `Processing` so the operator can
//! retry. Carrier callbacks are folded in later by [`webhook`].

pub mod courier;
pub mod push;
pub mod rate_quote;
pub mod status;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::domain::aggregates::{Address, Order};
use crate::domain::value_objects::OrderId;

pub use courier::assign_cheapest;
pub use push::{push_shipment, ShipmentDraft};
pub use rate_quote::{cheapest_first, quote, RateQuery};
pub use status::OrderFulfillment;
pub use webhook::{ShipmozoWebhook, WebhookReconciler};

/// An order together with the delivery address it resolves to.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub address: Option<Address>,
}

/// Orders with a fulfillment sequence currently running in this process.
#[derive(Clone, Default)]
pub struct InFlight { orders: Arc<Mutex<HashSet<OrderId>>> }

impl InFlight {
    /// `None` when the order is already claimed.
    pub fn try_claim(&self, order_id: &OrderId) -> Option<InFlightGuard> {
        let mut orders = self.orders.lock().unwrap_or_else(|e| e.into_inner());
        orders.insert(order_id.clone()).then(|| InFlightGuard { orders: self.orders.clone(), order_id: order_id.clone() })
    }
}

pub struct InFlightGuard { orders: Arc<Mutex<HashSet<OrderId>>>, order_id: OrderId }

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.orders.lock().unwrap_or_else(|e| e.into_inner()).remove(&self.order_id);
    }
}

//! Customer Aggregate
//!
//! Only the parts fulfillment reads: the address book and the running totals
//! that cancellation compensates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::order::Compensation;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    pub addresses: Vec<Address>,
    pub total_orders: i64,
    pub total_spent: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub name: Option<String>,
    pub mobile: String,
    pub area: String,
    pub city: String,
    pub state: String,
    pub pin: String,
    pub landmark: Option<String>,
}

impl Address {
    /// `area`, followed by the landmark when there is one.
    pub fn line_one(&self) -> String {
        match self.landmark.as_deref().filter(|l| !l.is_empty()) {
            Some(landmark) => format!("{}, {}", self.area, landmark),
            None => self.area.clone(),
        }
    }
}

impl Customer {
    pub fn address(&self, id: Uuid) -> Option<&Address> { self.addresses.iter().find(|a| a.id == id) }

    pub fn compensate(&mut self, c: &Compensation) {
        self.total_orders -= c.orders;
        self.total_spent -= c.spent;
    }
}

//! Product and Pickup, as the catalog hands them to fulfillment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Dimensions, Pincode, PincodeError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub price: i64,
    pub discount: i64,
    pub weight_grams: Option<u32>,
    pub dimensions: Vec<Dimensions>,
    pub pickup_id: Option<Uuid>,
}

impl Product {
    pub const DEFAULT_WEIGHT_GRAMS: u32 = 500;

    pub fn shipping_weight(&self) -> u32 { self.weight_grams.filter(|w| *w > 0).unwrap_or(Self::DEFAULT_WEIGHT_GRAMS) }
    pub fn package(&self) -> Dimensions { self.dimensions.first().copied().unwrap_or_default() }
}

/// Pickup location, with the warehouse id the aggregator assigned to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pickup {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub pin: String,
    pub mobile: String,
    pub warehouse_id: Option<String>,
}

impl Pickup {
    pub fn pincode(&self) -> Result<Pincode, PincodeError> { Pincode::parse(&self.pin) }
    pub fn warehouse_id(&self) -> Option<&str> { self.warehouse_id.as_deref().filter(|w| !w.is_empty()) }
}

//! Request and response bodies of the Shipmozo API.
//!
//! Field names are the aggregator's; do not rename.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use crate::domain::value_objects::{Dimensions, PaymentType};
use super::AggregatorError;

/// Every response is wrapped as `{ result: "1" | "0", message, data }`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(deserialize_with = "lenient_string")]
    pub result: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn is_success(&self) -> bool { self.result == "1" }

    pub fn into_data<T: serde::de::DeserializeOwned>(self, endpoint: &'static str) -> Result<T, AggregatorError> {
        if !self.is_success() {
            let message = self.data.get("error").and_then(Value::as_str).map(str::to_string)
                .filter(|m| !m.is_empty())
                .unwrap_or(self.message);
            return Err(AggregatorError::Rejected { endpoint, message });
        }
        serde_json::from_value(self.data).map_err(|source| AggregatorError::Decode { endpoint, source })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateCalculatorRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub pickup_pincode: u32,
    pub delivery_pincode: u32,
    pub payment_type: PaymentType,
    pub shipment_type: &'static str,
    pub order_amount: i64,
    pub type_of_package: &'static str,
    pub rov_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cod_amount: Option<i64>,
    pub weight: u32,
    pub dimensions: Vec<BoxDimensions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxDimensions { pub no_of_box: String, pub length: String, pub width: String, pub height: String }

impl From<Dimensions> for BoxDimensions {
    fn from(d: Dimensions) -> Self {
        Self { no_of_box: "1".into(), length: d.length.to_string(), width: d.width.to_string(), height: d.height.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateCourier {
    #[serde(deserialize_with = "lenient_u64")]
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub estimated_delivery: String,
    #[serde(default)]
    pub before_tax_total_charges: i64,
    #[serde(default)]
    pub gst: i64,
    pub total_charges: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub minimum_chargeable_weight: String,
    #[serde(default, deserialize_with = "yes_no")]
    pub pickups_automatically_scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushOrderRequest {
    pub order_id: String,
    pub order_date: String,
    pub consignee_name: String,
    pub consignee_phone: String,
    pub consignee_address_line_one: String,
    pub consignee_pin_code: u32,
    pub consignee_city: String,
    pub consignee_state: String,
    pub product_detail: Vec<ProductLine>,
    pub payment_type: PaymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cod_amount: Option<i64>,
    pub weight: u32,
    pub length: u32,
    pub width: u32,
    pub height: u32,
    pub warehouse_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub product_category: &'static str,
    pub discount: i64,
    pub hsn: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushedOrder {
    #[serde(deserialize_with = "lenient_string")]
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignCourierRequest { pub order_id: String, pub courier_id: u64 }

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssignedCourier {
    #[serde(default)]
    pub courier: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub reference_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub awb_number: String,
}

/// Accepts `"42"` or `42`.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

pub(crate) fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    lenient_string(d).map(|s| Some(s).filter(|s| !s.is_empty()))
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let raw = lenient_string(d)?;
    raw.parse().map_err(|_| de::Error::custom(format!("expected integer id, got '{raw}'")))
}

fn yes_no<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => s.eq_ignore_ascii_case("yes"),
        _ => false,
    })
}

//! Value Objects for order fulfillment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable order identifier, e.g. `PPN-15102614300007`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub const PREFIX: &'static str = "PPN-";

    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

    /// Prefix, then `ddmmyyHHMM` of `at`, then the zero-padded sequence.
    pub fn sequential(at: DateTime<Utc>, seq: u32) -> Self {
        Self(format!("{}{}{:04}", Self::PREFIX, at.format("%d%m%y%H%M"), seq))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self { Self(value.to_string()) }
}

/// Six digit Indian postal code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pincode(u32);

impl Pincode {
    pub fn parse(raw: &str) -> Result<Self, PincodeError> {
        let raw = raw.trim();
        if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) { return Err(PincodeError(raw.to_string())); }
        raw.parse().map(Self).map_err(|_| PincodeError(raw.to_string()))
    }
    pub fn value(&self) -> u32 { self.0 }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:06}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct PincodeError(pub String);
impl std::error::Error for PincodeError {}
impl fmt::Display for PincodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "invalid pincode '{}'", self.0) }
}

/// How the consignee pays, as the aggregator spells it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    #[default]
    Prepaid,
    Cod,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Prepaid => "PREPAID", Self::Cod => "COD" }
    }
}

/// Package dimensions in centimetres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions { pub length: u32, pub width: u32, pub height: u32 }

impl Default for Dimensions {
    fn default() -> Self { Self { length: 10, width: 10, height: 10 } }
}

//! Persistence for orders and the collaborator records fulfillment reads.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Compensation, Customer, Order, OrderStatus, Pickup, Product};
use crate::domain::value_objects::OrderId;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Looks an order up by the aggregator's shipment id.
    async fn find_order_by_shipment(&self, shipment_id: &str) -> Result<Option<Order>, StoreError>;

    /// Writes status, payment status and shipping only while the stored status
    /// still equals `expected`. `Ok(false)` means another writer moved it first.
    async fn save_if_status(&self, order: &Order, expected: OrderStatus) -> Result<bool, StoreError>;

    /// Guarded like [`save_if_status`](Self::save_if_status), then decrements the
    /// customer's counters in place. Both happen or neither does.
    async fn cancel_order(&self, order: &Order, expected: OrderStatus, compensation: &Compensation) -> Result<bool, StoreError>;

    /// Unconditional overwrite used by carrier callbacks.
    async fn save_tracking(&self, order: &Order) -> Result<(), StoreError>;

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn find_pickup(&self, id: Uuid) -> Result<Option<Pickup>, StoreError>;
}

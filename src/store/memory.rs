//! In-process store for local runs and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{FulfillmentStore, StoreError};
use crate::domain::aggregates::{Compensation, Customer, Order, OrderStatus, Pickup, Product};
use crate::domain::value_objects::OrderId;

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    customers: HashMap<Uuid, Customer>,
    products: HashMap<Uuid, Product>,
    pickups: HashMap<Uuid, Pickup>,
}

#[derive(Default)]
pub struct MemoryStore { tables: RwLock<Tables> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert_order(&self, order: Order) {
        if let Ok(mut t) = self.tables.write() { t.orders.insert(order.order_id().clone(), order); }
    }
    pub fn insert_customer(&self, customer: Customer) {
        if let Ok(mut t) = self.tables.write() { t.customers.insert(customer.id, customer); }
    }
    pub fn insert_product(&self, product: Product) {
        if let Ok(mut t) = self.tables.write() { t.products.insert(product.id, product); }
    }
    pub fn insert_pickup(&self, pickup: Pickup) {
        if let Ok(mut t) = self.tables.write() { t.pickups.insert(pickup.id, pickup); }
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R, StoreError> {
        self.tables.read().map(|t| f(&t)).map_err(|_| StoreError::Poisoned)
    }
    fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> Result<R, StoreError> {
        self.tables.write().map(|mut t| f(&mut t)).map_err(|_| StoreError::Poisoned)
    }
}

fn overwrite(stored: &mut Order, from: &Order) {
    stored.status = from.status;
    stored.payment_status = from.payment_status;
    stored.shipping = from.shipping.clone();
    stored.updated_at = from.updated_at;
}

#[async_trait]
impl FulfillmentStore for MemoryStore {
    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.read(|t| t.orders.get(order_id).cloned())
    }

    async fn find_order_by_shipment(&self, shipment_id: &str) -> Result<Option<Order>, StoreError> {
        self.read(|t| t.orders.values().find(|o| o.shipping.shipmozo_order_id.as_deref() == Some(shipment_id)).cloned())
    }

    async fn save_if_status(&self, order: &Order, expected: OrderStatus) -> Result<bool, StoreError> {
        self.write(|t| match t.orders.get_mut(order.order_id()) {
            Some(stored) if stored.status == expected => { overwrite(stored, order); true }
            _ => false,
        })
    }

    async fn cancel_order(&self, order: &Order, expected: OrderStatus, compensation: &Compensation) -> Result<bool, StoreError> {
        self.write(|t| {
            if !t.customers.contains_key(&compensation.customer_id) { return Err(StoreError::NotFound("customer")); }
            match t.orders.get_mut(order.order_id()) {
                Some(stored) if stored.status == expected => overwrite(stored, order),
                _ => return Ok(false),
            }
            if let Some(customer) = t.customers.get_mut(&compensation.customer_id) { customer.compensate(compensation); }
            Ok(true)
        })?
    }

    async fn save_tracking(&self, order: &Order) -> Result<(), StoreError> {
        self.write(|t| match t.orders.get_mut(order.order_id()) {
            Some(stored) => { overwrite(stored, order); Ok(()) }
            None => Err(StoreError::NotFound("order")),
        })?
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        self.read(|t| t.customers.get(&id).cloned())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        self.read(|t| t.products.get(&id).cloned())
    }

    async fn find_pickup(&self, id: Uuid) -> Result<Option<Pickup>, StoreError> {
        self.read(|t| t.pickups.get(&id).cloned())
    }
}

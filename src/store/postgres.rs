//! Postgres-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{FulfillmentStore, StoreError};
use crate::domain::aggregates::{Address, Compensation, Customer, Order, OrderStatus, PaymentStatus, Pickup, Product, Shipping};
use crate::domain::value_objects::{Dimensions, OrderId};

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: String, payment_id: Uuid, customer_id: Uuid, mobile: String, address_id: Uuid,
    product_id: Uuid, quantity: i32, price: i64, order_value: i64,
    coupon_code: Option<String>, coupon_discount: Option<i64>,
    status: String, payment_status: String, shipping: Json<Shipping>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |what: String| StoreError::Corrupt(format!("order {}: {what}", r.order_id));
        let status = r.status.parse::<OrderStatus>().map_err(|e| corrupt(e.to_string()))?;
        let payment_status = r.payment_status.parse::<PaymentStatus>().map_err(|e| corrupt(e.to_string()))?;
        let quantity = u32::try_from(r.quantity).map_err(|_| corrupt(format!("negative quantity {}", r.quantity)))?;
        Ok(Order {
            order_id: OrderId::new(r.order_id), payment_id: r.payment_id, customer_id: r.customer_id,
            mobile: r.mobile, address_id: r.address_id, product_id: r.product_id, quantity,
            price: r.price, order_value: r.order_value, coupon_code: r.coupon_code, coupon_discount: r.coupon_discount,
            status, payment_status, shipping: r.shipping.0, created_at: r.created_at, updated_at: r.updated_at,
            events: vec![],
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow { id: Uuid, name: String, mobile: String, addresses: Json<Vec<Address>>, total_orders: i64, total_spent: i64 }

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid, sku: String, name: String, price: i64, discount: i64, weight_grams: Option<i32>,
    dimensions: Json<Vec<Dimensions>>, pickup_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct PickupRow { id: Uuid, name: String, address: String, pin: String, mobile: String, warehouse_id: Option<String> }

const UPDATE_FULFILLMENT: &str =
    "UPDATE orders SET status = $2, payment_status = $3, shipping = $4, updated_at = $5 WHERE order_id = $1";

#[async_trait]
impl FulfillmentStore for PgStore {
    async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id.as_str()).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn find_order_by_shipment(&self, shipment_id: &str) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE shipping->>'shipmozo_order_id' = $1 LIMIT 1")
            .bind(shipment_id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn save_if_status(&self, order: &Order, expected: OrderStatus) -> Result<bool, StoreError> {
        let done = sqlx::query(&format!("{UPDATE_FULFILLMENT} AND status = $6"))
            .bind(order.order_id().as_str()).bind(order.status().as_str()).bind(order.payment_status().as_str())
            .bind(Json(order.shipping())).bind(order.updated_at()).bind(expected.as_str())
            .execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn cancel_order(&self, order: &Order, expected: OrderStatus, compensation: &Compensation) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let moved = sqlx::query(&format!("{UPDATE_FULFILLMENT} AND status = $6"))
            .bind(order.order_id().as_str()).bind(order.status().as_str()).bind(order.payment_status().as_str())
            .bind(Json(order.shipping())).bind(order.updated_at()).bind(expected.as_str())
            .execute(&mut *tx).await?;
        if moved.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }
        let adjusted = sqlx::query("UPDATE customers SET total_orders = total_orders - $2, total_spent = total_spent - $3 WHERE id = $1")
            .bind(compensation.customer_id).bind(compensation.orders).bind(compensation.spent)
            .execute(&mut *tx).await?;
        if adjusted.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(StoreError::NotFound("customer"));
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn save_tracking(&self, order: &Order) -> Result<(), StoreError> {
        let done = sqlx::query(UPDATE_FULFILLMENT)
            .bind(order.order_id().as_str()).bind(order.status().as_str()).bind(order.payment_status().as_str())
            .bind(Json(order.shipping())).bind(order.updated_at())
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::NotFound("order")); }
        Ok(())
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>("SELECT id, name, mobile, addresses, total_orders, total_spent FROM customers WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| Customer { id: r.id, name: r.name, mobile: r.mobile, addresses: r.addresses.0, total_orders: r.total_orders, total_spent: r.total_spent }))
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT id, sku, name, price, discount, weight_grams, dimensions, pickup_id FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| Product {
            id: r.id, sku: r.sku, name: r.name, price: r.price, discount: r.discount,
            weight_grams: r.weight_grams.and_then(|w| u32::try_from(w).ok()),
            dimensions: r.dimensions.0, pickup_id: r.pickup_id,
        }))
    }

    async fn find_pickup(&self, id: Uuid) -> Result<Option<Pickup>, StoreError> {
        let row = sqlx::query_as::<_, PickupRow>("SELECT id, name, address, pin, mobile, warehouse_id FROM pickups WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| Pickup { id: r.id, name: r.name, address: r.address, pin: r.pin, mobile: r.mobile, warehouse_id: r.warehouse_id }))
    }
}

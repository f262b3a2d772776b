//! Aggregates module
pub mod order;
pub mod customer;
pub mod product;

pub use order::{
    Compensation, CourierAssignment, NewOrder, Order, OrderError, OrderStatus, PaymentStatus, Shipping,
    TrackingEvent, TrackingUpdate, Transition,
};
pub use customer::{Address, Customer};
pub use product::{Pickup, Product};

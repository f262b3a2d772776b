//! Drives generic status updates through the order state machine.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use super::courier::assign_cheapest;
use super::push::{push_shipment, ShipmentDraft};
use super::rate_quote::RateQuery;
use super::{InFlight, OrderView};
use crate::domain::aggregates::{Address, Customer, Order, OrderStatus, Pickup, Product, Transition};
use crate::domain::value_objects::{OrderId, Pincode};
use crate::publisher::EventPublisher;
use crate::shipping::ShippingAggregator;
use crate::store::FulfillmentStore;
use crate::FulfillmentError;

#[derive(Clone)]
pub struct OrderFulfillment {
    store: Arc<dyn FulfillmentStore>,
    aggregator: Arc<dyn ShippingAggregator>,
    publisher: EventPublisher,
    in_flight: InFlight,
}

/// Delivery and pickup details resolved before anything remote happens.
struct Resolved {
    customer: Customer,
    address: Address,
    delivery: Pincode,
    product: Product,
    pickup: Pickup,
    pickup_pin: Pincode,
}

impl OrderFulfillment {
    pub fn new(store: Arc<dyn FulfillmentStore>, aggregator: Arc<dyn ShippingAggregator>, publisher: EventPublisher) -> Self {
        Self { store, aggregator, publisher, in_flight: InFlight::default() }
    }

    /// The order plus its resolved address, for the read path.
    pub async fn view(&self, order_id: &OrderId) -> Result<OrderView, FulfillmentError> {
        let order = self.store.find_order(order_id).await?.ok_or(FulfillmentError::OrderNotFound)?;
        let address = self.store.find_customer(order.customer_id()).await?
            .and_then(|c| c.address(order.address_id()).cloned());
        Ok(OrderView { order, address })
    }

    /// Apply a requested status. Either the order ends in the new state, or it
    /// is left exactly as it was and the reason is returned.
    #[instrument(skip_all, fields(order_id = %order_id, requested = %requested))]
    pub async fn update_status(&self, order_id: &OrderId, requested: OrderStatus) -> Result<OrderView, FulfillmentError> {
        let order = self.store.find_order(order_id).await?.ok_or(FulfillmentError::OrderNotFound)?;
        match order.plan_transition(requested)? {
            Transition::Fulfil => self.fulfil(order).await,
            Transition::Cancel => self.cancel(order).await,
        }
    }

    async fn resolve(&self, order: &Order) -> Result<Resolved, FulfillmentError> {
        let customer = self.store.find_customer(order.customer_id()).await?.ok_or(FulfillmentError::CustomerNotFound)?;
        let address = customer.address(order.address_id()).cloned().ok_or(FulfillmentError::AddressNotFound)?;
        let delivery = Pincode::parse(&address.pin)?;

        let product = self.store.find_product(order.product_id()).await?.ok_or(FulfillmentError::ProductNotFound)?;
        let pickup_id = product.pickup_id.ok_or(FulfillmentError::PickupNotFound)?;
        let pickup = self.store.find_pickup(pickup_id).await?.ok_or(FulfillmentError::PickupNotFound)?;
        if pickup.warehouse_id().is_none() { return Err(FulfillmentError::PickupWarehouseMissing(pickup.id)); }
        let pickup_pin = pickup.pincode()?;

        Ok(Resolved { customer, address, delivery, product, pickup, pickup_pin })
    }

    async fn fulfil(&self, mut order: Order) -> Result<OrderView, FulfillmentError> {
        let Some(_claim) = self.in_flight.try_claim(order.order_id()) else {
            warn!("fulfillment already running for this order");
            return Err(FulfillmentError::OrderAlreadyAdvanced(order.order_id().clone()));
        };

        let r = self.resolve(&order).await?;
        let warehouse_id = r.pickup.warehouse_id().unwrap_or_default();

        // Last look before the remote side is touched.
        match self.store.find_order(order.order_id()).await? {
            Some(current) if current.status() == OrderStatus::Processing => {}
            _ => return Err(FulfillmentError::OrderAlreadyAdvanced(order.order_id().clone())),
        }

        let draft = ShipmentDraft {
            order: &order, customer_name: &r.customer.name, address: &r.address, delivery: r.delivery,
            product: &r.product, warehouse_id,
        };
        let shipment_id = push_shipment(self.aggregator.as_ref(), &draft.to_request(Utc::now().date_naive())).await?;

        let query = RateQuery::for_order(&order, &r.product, r.pickup_pin, r.delivery);
        let assignment = match assign_cheapest(self.aggregator.as_ref(), &shipment_id, &query).await {
            Ok(a) => a,
            Err(e) => {
                error!(shipment_id = %shipment_id, error = %e, "courier assignment failed after push; order stays Processing");
                return Err(e);
            }
        };

        order.mark_shipped(shipment_id.clone(), assignment)?;
        if !self.store.save_if_status(&order, OrderStatus::Processing).await? {
            error!(shipment_id = %shipment_id, "order changed while shipping was arranged; shipment left unlinked");
            return Err(FulfillmentError::OrderAlreadyAdvanced(order.order_id().clone()));
        }
        info!(
            shipment_id = %shipment_id,
            courier = order.shipping().courier_name.as_deref().unwrap_or_default(),
            awb = order.shipping().awb_number.as_deref().unwrap_or_default(),
            "order shipped"
        );

        self.publisher.publish(order.take_events()).await;
        Ok(OrderView { order, address: Some(r.address) })
    }

    async fn cancel(&self, mut order: Order) -> Result<OrderView, FulfillmentError> {
        let Some(_claim) = self.in_flight.try_claim(order.order_id()) else {
            warn!("cancel refused while fulfillment is running for this order");
            return Err(FulfillmentError::OrderAlreadyAdvanced(order.order_id().clone()));
        };
        let previous = order.status();
        let compensation = order.cancel()?;
        if !self.store.cancel_order(&order, previous, &compensation).await? {
            return Err(FulfillmentError::OrderAlreadyAdvanced(order.order_id().clone()));
        }
        info!(customer_id = %compensation.customer_id, order_value = compensation.spent, "order cancelled");

        self.publisher.publish(order.take_events()).await;
        let address = self.store.find_customer(order.customer_id()).await?
            .and_then(|c| c.address(order.address_id()).cloned());
        Ok(OrderView { order, address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::sample_order;
    use crate::domain::aggregates::PaymentStatus;
    use crate::domain::value_objects::Dimensions;
    use crate::fulfillment::testing::{offer, Call, ScriptedAggregator};
    use crate::store::MemoryStore;
    use tokio::sync::Notify;
    use uuid::Uuid;

    struct Fixture { store: Arc<MemoryStore>, order: Order }

    fn fixture(warehouse: Option<&str>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let order = sample_order();
        let pickup = Pickup { id: Uuid::new_v4(), name: "Nursery".into(), address: "Delhi".into(), pin: "110001".into(), mobile: "9".into(), warehouse_id: warehouse.map(String::from) };
        store.insert_product(Product {
            id: order.product_id(), sku: "FERN-01".into(), name: "Fern".into(), price: 500, discount: 0,
            weight_grams: Some(500), dimensions: vec![Dimensions::default()], pickup_id: Some(pickup.id),
        });
        store.insert_pickup(pickup);
        store.insert_customer(Customer {
            id: order.customer_id(), name: "Asha".into(), mobile: "9000000000".into(),
            addresses: vec![Address { id: order.address_id(), mobile: "9000000000".into(), area: "Park St".into(), city: "Kolkata".into(), state: "WB".into(), pin: "700001".into(), ..Default::default() }],
            total_orders: 5, total_spent: 5000,
        });
        store.insert_order(order.clone());
        Fixture { store, order }
    }

    fn service(store: &Arc<MemoryStore>, agg: &Arc<ScriptedAggregator>) -> OrderFulfillment {
        OrderFulfillment::new(store.clone(), agg.clone(), EventPublisher::default())
    }

    async fn stored(f: &Fixture) -> Order {
        f.store.find_order(f.order.order_id()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_confirm_ships_with_cheapest_courier() {
        let f = fixture(Some("WH-1"));
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120), offer(2, "Y", 90)]).with_awb(2, "AWB123"));
        let view = service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap();

        assert_eq!(view.order.status(), OrderStatus::Shipped);
        assert_eq!(view.address.as_ref().map(|a| a.pin.as_str()), Some("700001"));
        let order = stored(&f).await;
        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.shipping().courier_name.as_deref(), Some("Y"));
        assert_eq!(order.shipping().awb_number.as_deref(), Some("AWB123"));
        assert_eq!(order.shipping().shipmozo_order_id.as_deref(), Some("SM-PPN-O1"));
        assert_eq!(agg.assign_attempts(), vec![2]);
    }

    #[tokio::test]
    async fn test_push_happens_before_any_assignment() {
        let f = fixture(Some("WH-1"));
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120), offer(2, "Y", 90)]).failing_couriers(&[2]));
        service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap();
        assert_eq!(agg.calls(), vec![Call::Push("PPN-O1".into()), Call::Rate, Call::Assign(2), Call::Assign(1)]);
        assert_eq!(stored(&f).await.shipping().courier_id, Some(1));
    }

    #[tokio::test]
    async fn test_exhaustion_leaves_order_processing_and_unshipped() {
        let f = fixture(Some("WH-1"));
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120), offer(2, "Y", 90)]).failing_couriers(&[1, 2]));
        let err = service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::CourierAssignmentExhausted { attempted: 2 }));
        let order = stored(&f).await;
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.shipping(), &Default::default());
    }

    #[tokio::test]
    async fn test_push_failure_skips_assignment() {
        let f = fixture(Some("WH-1"));
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120)]).failing_push());
        let err = service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::ShipmentPushFailed(_)));
        assert_eq!(agg.calls(), vec![Call::Push("PPN-O1".into())]);
        assert_eq!(stored(&f).await.status(), OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_missing_warehouse_is_a_precondition_failure() {
        let f = fixture(None);
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120)]));
        let err = service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::PickupWarehouseMissing(_)));
        assert!(agg.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_address_is_rejected() {
        let f = fixture(Some("WH-1"));
        let mut customer = f.store.find_customer(f.order.customer_id()).await.unwrap().unwrap();
        customer.addresses.clear();
        f.store.insert_customer(customer);
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120)]));
        let err = service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::AddressNotFound));
        assert!(agg.calls().is_empty());
    }

    #[tokio::test]
    async fn test_shipped_order_rejects_generic_update() {
        let f = fixture(Some("WH-1"));
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120)]));
        let svc = service(&f.store, &agg);
        svc.update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap();
        for to in [OrderStatus::Confirmed, OrderStatus::Cancelled, OrderStatus::Delivered] {
            let err = svc.update_status(f.order.order_id(), to).await.unwrap_err();
            assert!(matches!(err, FulfillmentError::Transition(_)), "{to}: {err}");
        }
        assert_eq!(agg.calls().iter().filter(|c| matches!(c, Call::Push(_))).count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_compensates_customer_totals() {
        let f = fixture(Some("WH-1"));
        let agg = Arc::new(ScriptedAggregator::new(vec![]));
        let view = service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Cancelled).await.unwrap();
        assert_eq!(view.order.status(), OrderStatus::Cancelled);
        let customer = f.store.find_customer(f.order.customer_id()).await.unwrap().unwrap();
        assert_eq!((customer.total_orders, customer.total_spent), (4, 4000));
        assert_eq!(stored(&f).await.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_concurrent_writer_wins_and_fulfillment_reports_it() {
        let f = fixture(Some("WH-1"));
        let mut moved = f.order.clone();
        moved.status = OrderStatus::Cancelled;
        assert!(f.store.save_if_status(&moved, OrderStatus::Processing).await.unwrap());

        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120)]));
        let svc = service(&f.store, &agg);
        let order = f.order.clone();
        let err = svc.fulfil(order).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::OrderAlreadyAdvanced(_)));
        assert!(agg.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_refused_while_fulfillment_runs() {
        let f = fixture(Some("WH-1"));
        let agg = Arc::new(ScriptedAggregator::new(vec![]));
        let svc = service(&f.store, &agg);
        let claim = svc.in_flight.try_claim(f.order.order_id()).unwrap();

        let err = svc.update_status(f.order.order_id(), OrderStatus::Cancelled).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::OrderAlreadyAdvanced(_)));
        assert_eq!(stored(&f).await.status(), OrderStatus::Processing);
        let customer = f.store.find_customer(f.order.customer_id()).await.unwrap().unwrap();
        assert_eq!((customer.total_orders, customer.total_spent), (5, 5000));

        drop(claim);
        svc.update_status(f.order.order_id(), OrderStatus::Cancelled).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_confirm_during_push_is_rejected() {
        let f = fixture(Some("WH-1"));
        let gate = Arc::new(Notify::new());
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120)]).blocking_push(gate.clone()));
        let svc = service(&f.store, &agg);

        let first = tokio::spawn({
            let (svc, id) = (svc.clone(), f.order.order_id().clone());
            async move { svc.update_status(&id, OrderStatus::Confirmed).await }
        });
        while agg.push_requests().is_empty() { tokio::task::yield_now().await; }

        let err = svc.update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::OrderAlreadyAdvanced(_)));

        gate.notify_one();
        let view = first.await.unwrap().unwrap();
        assert_eq!(view.order.status(), OrderStatus::Shipped);
        assert_eq!(agg.push_requests().len(), 1);
        assert_eq!(agg.assign_attempts(), vec![1]);
    }

    #[tokio::test]
    async fn test_unpaid_order_pushes_cod() {
        let f = fixture(Some("WH-1"));
        let mut order = f.order.clone();
        order.payment_status = PaymentStatus::Unpaid;
        f.store.insert_order(order);
        let agg = Arc::new(ScriptedAggregator::new(vec![offer(1, "X", 120)]));
        service(&f.store, &agg).update_status(f.order.order_id(), OrderStatus::Confirmed).await.unwrap();
        assert_eq!(agg.push_requests()[0].cod_amount, Some(1000));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let store = Arc::new(MemoryStore::new());
        let agg = Arc::new(ScriptedAggregator::default());
        let err = service(&store, &agg).update_status(&OrderId::from("PPN-X"), OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::OrderNotFound));
    }
}

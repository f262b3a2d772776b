//! Folds Shipmozo delivery-status callbacks into local orders.
//!
//! Callbacks are last-write-wins: there is no guard against an older status
//! arriving after a newer one.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::domain::aggregates::{Order, OrderStatus, TrackingEvent, TrackingUpdate};
use crate::notify::{dispatch, Notification, Notifier};
use crate::publisher::EventPublisher;
use crate::shipping::wire::{lenient_opt_string, lenient_string};
use crate::store::FulfillmentStore;
use crate::FulfillmentError;

/// Callback body. `order_id` is the aggregator's shipment id, not ours.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShipmozoWebhook {
    #[serde(default, deserialize_with = "lenient_string")]
    #[validate(length(min = 1))]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub awb_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub carrier: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub current_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub status_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub expected_delivery_date: Option<String>,
    #[serde(default)]
    pub status_feed: Option<StatusFeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusFeed { #[serde(default)] pub scan: Vec<Scan> }

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scan {
    #[serde(alias = "timestamp", deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
}

impl From<ShipmozoWebhook> for TrackingUpdate {
    fn from(w: ShipmozoWebhook) -> Self {
        Self {
            awb_number: w.awb_number,
            carrier: w.carrier,
            current_status: w.current_status,
            status_time: w.status_time,
            expected_delivery_date: w.expected_delivery_date,
            scans: w.status_feed.unwrap_or_default().scan.into_iter()
                .map(|s| TrackingEvent { timestamp: s.date, status: s.status, location: s.location })
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct WebhookReconciler {
    store: Arc<dyn FulfillmentStore>,
    notifier: Arc<dyn Notifier>,
    publisher: EventPublisher,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn FulfillmentStore>, notifier: Arc<dyn Notifier>, publisher: EventPublisher) -> Self {
        Self { store, notifier, publisher }
    }

    /// Returns the order's status after the callback was applied.
    /// [`FulfillmentError::WebhookOrderNotFound`] is expected for shipments we
    /// never linked and should be acknowledged, not retried.
    pub async fn reconcile(&self, payload: ShipmozoWebhook) -> Result<OrderStatus, FulfillmentError> {
        let shipment_id = payload.order_id.clone();
        let Some(mut order) = self.store.find_order_by_shipment(&shipment_id).await? else {
            warn!(shipment_id = %shipment_id, "webhook for unknown shipment");
            return Err(FulfillmentError::WebhookOrderNotFound(shipment_id));
        };

        let moved = order.apply_tracking(payload.into());
        self.store.save_tracking(&order).await?;
        info!(
            order_id = %order.order_id(),
            shipment_id = %shipment_id,
            carrier_status = order.shipping().current_status.as_deref().unwrap_or_default(),
            status = %order.status(),
            "order updated from webhook"
        );

        self.publisher.publish(order.take_events()).await;
        if let Some(notification) = self.notification_for(&order, moved).await {
            dispatch(self.notifier.clone(), order.mobile().to_string(), notification);
        }
        Ok(order.status())
    }

    async fn notification_for(&self, order: &Order, moved: Option<OrderStatus>) -> Option<Notification> {
        let order_id = order.order_id().to_string();
        let expected_delivery = order.shipping().expected_delivery_date.clone().unwrap_or_default();
        match moved? {
            OrderStatus::InTransit => {
                let customer_name = match self.store.find_customer(order.customer_id()).await {
                    Ok(Some(c)) => c.name,
                    Ok(None) => String::new(),
                    Err(e) => { warn!(error = %e, "customer lookup for notification failed"); String::new() }
                };
                Some(Notification::PickedUp { order_id, customer_name, expected_delivery })
            }
            OrderStatus::OutForDelivery => Some(Notification::OutForDelivery { order_id, expected_delivery }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use serde_json::json;
    use crate::domain::aggregates::order::tests::sample_order;
    use crate::domain::aggregates::{CourierAssignment, PaymentStatus};
    use crate::notify::NotifyError;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct Recording { sent: Mutex<Vec<(String, Notification)>> }

    #[async_trait]
    impl Notifier for Recording {
        async fn send(&self, mobile: &str, n: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push((mobile.to_string(), n.clone()));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn send(&self, _: &str, _: &Notification) -> Result<(), NotifyError> { Err(NotifyError::Status(503)) }
    }

    fn shipped_store() -> (Arc<MemoryStore>, Order) {
        let store = Arc::new(MemoryStore::new());
        let mut order = sample_order();
        order.mark_shipped("SM-77".into(), CourierAssignment {
            courier_id: 1, courier_name: "X".into(), reference_id: None, awb_number: "AWB1".into(),
            estimated_delivery: None, tracking_url: "u".into(),
        }).unwrap();
        order.take_events();
        store.insert_order(order.clone());
        (store, order)
    }

    fn payload(status: &str, scans: serde_json::Value) -> ShipmozoWebhook {
        serde_json::from_value(json!({
            "order_id": "SM-77", "awb_number": "AWB1", "carrier": "Xpress", "current_status": status,
            "status_time": "2026-10-15 10:00", "expected_delivery_date": "2026-10-18",
            "status_feed": { "scan": scans }
        })).unwrap()
    }

    #[tokio::test]
    async fn test_history_is_replaced_by_latest_feed() {
        let (store, order) = shipped_store();
        let r = WebhookReconciler::new(store.clone(), Arc::new(Recording::default()), EventPublisher::default());
        r.reconcile(payload("Shipment picked up", json!([{"date": "d1", "status": "Picked", "location": "DEL"}, {"date": "d2", "status": "Hub", "location": "AGR"}]))).await.unwrap();
        r.reconcile(payload("In transit", json!([{"date": "d3", "status": "Hub", "location": "KOL"}]))).await.unwrap();

        let stored = store.find_order(order.order_id()).await.unwrap().unwrap();
        assert_eq!(stored.shipping().tracking_history, vec![TrackingEvent { timestamp: "d3".into(), status: "Hub".into(), location: "KOL".into() }]);
        assert_eq!(stored.status(), OrderStatus::InTransit);
        assert_eq!(stored.shipping().current_status.as_deref(), Some("In transit"));
        assert_eq!(stored.shipping().courier_name.as_deref(), Some("Xpress"));
        assert_eq!(stored.shipping().last_status_time.as_deref(), Some("2026-10-15 10:00"));
    }

    #[tokio::test]
    async fn test_unknown_shipment_is_not_found_and_mutates_nothing() {
        let (store, order) = shipped_store();
        let r = WebhookReconciler::new(store.clone(), Arc::new(Recording::default()), EventPublisher::default());
        let mut p = payload("Delivered", json!([]));
        p.order_id = "SM-404".into();
        assert!(matches!(r.reconcile(p).await, Err(FulfillmentError::WebhookOrderNotFound(id)) if id == "SM-404"));
        assert_eq!(store.find_order(order.order_id()).await.unwrap().unwrap().status(), OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_delivered_marks_paid() {
        let (store, mut order) = shipped_store();
        order.payment_status = PaymentStatus::Unpaid;
        store.insert_order(order.clone());
        let r = WebhookReconciler::new(store.clone(), Arc::new(Recording::default()), EventPublisher::default());
        assert_eq!(r.reconcile(payload("Delivered", json!([]))).await.unwrap(), OrderStatus::Delivered);
        assert_eq!(store.find_order(order.order_id()).await.unwrap().unwrap().payment_status(), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_out_for_delivery_notifies_customer() {
        let (store, _) = shipped_store();
        let notifier = Arc::new(Recording::default());
        let r = WebhookReconciler::new(store, notifier.clone(), EventPublisher::default());
        r.reconcile(payload("Out for delivery", json!([]))).await.unwrap();
        for _ in 0..50 {
            if !notifier.sent.lock().unwrap().is_empty() { break; }
            tokio::task::yield_now().await;
        }
        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![("9876543210".to_string(), Notification::OutForDelivery { order_id: "PPN-O1".into(), expected_delivery: "2026-10-18".into() })]);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_reconcile() {
        let (store, _) = shipped_store();
        let r = WebhookReconciler::new(store, Arc::new(Failing), EventPublisher::default());
        assert_eq!(r.reconcile(payload("Out for delivery", json!([]))).await.unwrap(), OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_payload_tolerates_nulls_and_numbers() {
        let p: ShipmozoWebhook = serde_json::from_value(json!({
            "carrier": 17, "current_status": null,
            "status_feed": { "scan": [{ "date": "d1", "status": "Picked", "location": null }] }
        })).unwrap();
        assert!(p.validate().is_err());
        assert_eq!(p.carrier.as_deref(), Some("17"));
        assert_eq!(p.current_status, None);
        let update = TrackingUpdate::from(p);
        assert_eq!(update.scans, vec![TrackingEvent { timestamp: "d1".into(), status: "Picked".into(), location: String::new() }]);
    }

    #[test]
    fn test_payload_tolerates_missing_feed_and_numeric_ids() {
        let p: ShipmozoWebhook = serde_json::from_value(json!({"order_id": 5521, "current_status": "Manifested"})).unwrap();
        assert_eq!(p.order_id, "5521");
        assert!(p.validate().is_ok());
        assert!(TrackingUpdate::from(p).scans.is_empty());
    }
}

//! Customer notifications for shipment milestones.
//!
//! Sending is fire-and-forget: [`dispatch`] spawns the send and only logs a
//! failure, so a broken provider never fails the caller.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_WABRIDGE_URL: &str = "https://web.wabridge.com/api/createmessage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PickedUp { order_id: String, customer_name: String, expected_delivery: String },
    OutForDelivery { order_id: String, expected_delivery: String },
}

impl Notification {
    pub fn text(&self) -> String {
        match self {
            Self::PickedUp { order_id, customer_name, expected_delivery } => format!(
                "Hi {customer_name}, your order {order_id} has been picked up by the courier. Expected delivery: {expected_delivery}."
            ),
            Self::OutForDelivery { order_id, expected_delivery } => format!(
                "Your order {order_id} is out for delivery. Expected delivery: {expected_delivery}."
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification provider returned HTTP {0}")]
    Status(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, mobile: &str, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct WhatsAppCredentials {
    pub auth_key: String,
    pub app_key: String,
    pub device_id: String,
    pub base_url: String,
    pub picked_up_template: String,
    pub out_for_delivery_template: String,
}

#[derive(Debug, Clone)]
pub struct SmsCredentials { pub api_key: String, pub sender_id: String, pub base_url: String }

#[derive(Debug, Clone)]
pub enum Provider {
    Sms(SmsCredentials),
    WhatsApp(WhatsAppCredentials),
}

/// Sends through whichever provider is configured.
pub struct ProviderNotifier { http: Client, provider: Provider }

impl ProviderNotifier {
    pub fn new(http: Client, provider: Provider) -> Self { Self { http, provider } }
}

#[async_trait]
impl Notifier for ProviderNotifier {
    async fn send(&self, mobile: &str, notification: &Notification) -> Result<(), NotifyError> {
        let destination = normalise_mobile(mobile);
        let request = match &self.provider {
            Provider::WhatsApp(wa) => {
                let (template_id, variables) = match notification {
                    Notification::PickedUp { order_id, customer_name, expected_delivery } =>
                        (&wa.picked_up_template, vec![customer_name.as_str(), order_id.as_str(), expected_delivery.as_str()]),
                    Notification::OutForDelivery { order_id, expected_delivery } =>
                        (&wa.out_for_delivery_template, vec![order_id.as_str(), expected_delivery.as_str()]),
                };
                self.http.post(&wa.base_url).json(&json!({
                    "auth-key": wa.auth_key,
                    "app-key": wa.app_key,
                    "destination_number": destination,
                    "template_id": template_id,
                    "device_id": wa.device_id,
                    "language": "en",
                    "variables": variables,
                }))
            }
            Provider::Sms(sms) => self.http.post(&sms.base_url).json(&json!({
                "api_key": sms.api_key,
                "sender_id": sms.sender_id,
                "to": destination,
                "message": notification.text(),
            })),
        };
        let response = request.send().await?;
        if !response.status().is_success() { return Err(NotifyError::Status(response.status().as_u16())); }
        Ok(())
    }
}

/// Used when no provider is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _mobile: &str, _notification: &Notification) -> Result<(), NotifyError> { Ok(()) }
}

/// Digits only, with the `91` country code.
pub fn normalise_mobile(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 12 && digits.starts_with("91") { digits } else { format!("91{digits}") }
}

pub fn dispatch(notifier: Arc<dyn Notifier>, mobile: String, notification: Notification) {
    tokio::spawn(async move {
        match notifier.send(&mobile, &notification).await {
            Ok(()) => info!(?notification, "customer notified"),
            Err(e) => warn!(?notification, error = %e, "customer notification failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_mobile() {
        assert_eq!(normalise_mobile("98765 43210"), "919876543210");
        assert_eq!(normalise_mobile("+91-98765-43210"), "919876543210");
        assert_eq!(normalise_mobile("9123456789"), "919123456789");
    }

    #[test]
    fn test_notification_text() {
        let n = Notification::OutForDelivery { order_id: "PPN-1".into(), expected_delivery: "Tomorrow".into() };
        assert!(n.text().contains("PPN-1 is out for delivery"));
    }
}

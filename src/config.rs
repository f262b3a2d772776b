//! Process configuration, read from the environment once at startup.

use anyhow::{bail, Context, Result};

use crate::notify::{Provider, SmsCredentials, WhatsAppCredentials, DEFAULT_WABRIDGE_URL};
use crate::shipping::ShipmozoConfig;

const PICKED_UP_TEMPLATE: &str = "827590426765356";
const OUT_FOR_DELIVERY_TEMPLATE: &str = "1189674629421688";

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    pub nats_url: Option<String>,
    pub shipmozo: ShipmozoConfig,
    /// `None` disables customer notifications.
    pub notify: Option<Provider>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match optional("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT is not a port number: {p}"))?,
            None => 8083,
        };
        Ok(Self {
            database_url: optional("DATABASE_URL"),
            port,
            nats_url: optional("NATS_URL"),
            shipmozo: ShipmozoConfig::from_env()?,
            notify: notify_provider()?,
        })
    }
}

fn notify_provider() -> Result<Option<Provider>> {
    let kind = optional("NOTIFY_PROVIDER").unwrap_or_else(|| "none".to_string());
    Ok(match kind.to_ascii_lowercase().as_str() {
        "none" => None,
        "whatsapp" => Some(Provider::WhatsApp(WhatsAppCredentials {
            auth_key: required("WA_AUTH_KEY")?,
            app_key: required("WA_APP_KEY")?,
            device_id: required("WA_DEVICE_ID")?,
            base_url: optional("WA_BASE_URL").unwrap_or_else(|| DEFAULT_WABRIDGE_URL.to_string()),
            picked_up_template: PICKED_UP_TEMPLATE.to_string(),
            out_for_delivery_template: OUT_FOR_DELIVERY_TEMPLATE.to_string(),
        })),
        "sms" => Some(Provider::Sms(SmsCredentials {
            api_key: required("SMS_API_KEY")?,
            sender_id: required("SMS_SENDER_ID")?,
            base_url: required("SMS_BASE_URL")?,
        })),
        other => bail!("NOTIFY_PROVIDER must be whatsapp, sms or none, got '{other}'"),
    })
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} not set"))
}

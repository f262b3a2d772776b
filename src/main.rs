//! Shipmozo Fulfillment - order fulfillment service

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shipmozo_fulfillment::api::{self, AppState};
use shipmozo_fulfillment::config::Config;
use shipmozo_fulfillment::fulfillment::{OrderFulfillment, WebhookReconciler};
use shipmozo_fulfillment::notify::{NoopNotifier, Notifier, ProviderNotifier};
use shipmozo_fulfillment::publisher::EventPublisher;
use shipmozo_fulfillment::shipping::{ShipmozoClient, ShippingAggregator};
use shipmozo_fulfillment::store::{FulfillmentStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let store: Arc<dyn FulfillmentStore> = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await.context("connecting to Postgres")?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable; order events will be dropped"); None }
        },
        None => None,
    };
    let publisher = EventPublisher::new(nats);

    let aggregator: Arc<dyn ShippingAggregator> = Arc::new(ShipmozoClient::new(config.shipmozo.clone())?);
    let notifier: Arc<dyn Notifier> = match config.notify.clone() {
        Some(provider) => Arc::new(ProviderNotifier::new(reqwest::Client::builder().timeout(config.shipmozo.timeout).build()?, provider)),
        None => Arc::new(NoopNotifier),
    };

    let state = AppState {
        fulfillment: OrderFulfillment::new(store.clone(), aggregator.clone(), publisher.clone()),
        reconciler: WebhookReconciler::new(store.clone(), notifier, publisher),
        store,
        aggregator,
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Shipmozo fulfillment listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}

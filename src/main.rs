use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use customer_es::config::Config;
use customer_es::domain::customer::{
    CustomerCommandHandler, CustomerEvent, CustomerEventStore, CustomerId, CustomerQueryHandler,
};
use customer_es::event_sourcing::{connect, SystemClock, UuidV7Generator};
use customer_es::metrics::Metrics;
use customer_es::utils::{retry_on_transient, RetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,customer_es=debug"))
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    tracing::info!(database_url = %config.database_url, "Starting customer event store demo");

    // === 1. Storage ===
    let busy_timeout = config.store.operation_timeout;
    let pool = connect(&config.database_url, config.max_connections, busy_timeout)
        .await
        .context("connecting to the database")?;

    let clock = Arc::new(SystemClock);
    let store = Arc::new(CustomerEventStore::new(pool, config.store.clone(), clock.clone()));
    store.init_schema().await?;

    // === 2. Handlers ===
    let metrics = Arc::new(Metrics::new()?);
    let ids = Arc::new(UuidV7Generator);
    let commands = CustomerCommandHandler::new(store.clone(), clock, ids, metrics.clone());
    let queries = CustomerQueryHandler::new(store.clone(), metrics.clone());

    // === 3. Customer lifecycle ===
    let customer_id = commands
        .register_customer("fiona@gallagher.net", "Fiona", "Gallagher")
        .await?;
    tracing::info!(customer_id = %customer_id, "Customer registered");

    let hash = registration_hash(&store, &customer_id).await?;

    let wrong_hash = commands
        .confirm_customer_email_address(customer_id.as_str(), "not-the-hash")
        .await;
    if let Err(err) = wrong_hash {
        tracing::info!(error = %err, "Confirmation with a wrong hash was rejected as expected");
    }
    commands.confirm_customer_email_address(customer_id.as_str(), &hash).await?;

    // Explicit retry around the whole command in case another writer wins the race
    retry_on_transient(RetryConfig::for_conflicts(), |_attempt| {
        commands.change_customer_name(customer_id.as_str(), "Fiona", "Lishman")
    })
    .await
    .into_result()?;

    commands.change_customer_email_address(customer_id.as_str(), "fiona@lishman.net").await?;

    let view = queries.customer_view_by_id(customer_id.as_str()).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);

    commands.delete_customer(customer_id.as_str()).await?;
    match queries.customer_view_by_id(customer_id.as_str()).await {
        Ok(_) => anyhow::bail!("deleted customer is still visible"),
        Err(err) => tracing::info!(error = %err, "Deleted customer is gone"),
    }

    // === 4. Metrics ===
    if config.metrics_enabled {
        println!("{}", metrics.render()?);
    }

    Ok(())
}

/// The confirmation hash normally travels by email; the demo reads it back
async fn registration_hash(
    store: &CustomerEventStore,
    customer_id: &CustomerId,
) -> anyhow::Result<String> {
    let events = store.retrieve_event_stream(customer_id).await?;

    match events.first() {
        Some(CustomerEvent::Registered(e)) => Ok(e.confirmation_hash.to_string()),
        _ => anyhow::bail!("stream of {customer_id} does not start with a registration"),
    }
}

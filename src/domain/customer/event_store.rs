use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::event_sourcing::core::{Clock, StreamId};
use crate::event_sourcing::store::{with_deadline, EventStore, Transaction};
use super::codec::CustomerEventCodec;
use super::events::CustomerEvent;
use super::unique_email_addresses::UniqueEmailAddresses;
use super::value_objects::CustomerId;

// ============================================================================
// Customer Event Store
// ============================================================================
//
// Customer streams on top of the generic event store. Each write appends the
// events and applies the uniqueness ledger mutations they imply inside one
// transaction, so either both land or neither does.
//
// ============================================================================

pub struct CustomerEventStore {
    events: EventStore<CustomerEventCodec>,
    ledger: UniqueEmailAddresses,
    config: StoreConfig,
}

impl CustomerEventStore {
    pub fn new(pool: SqlitePool, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: EventStore::new(pool, &config.event_table, CustomerEventCodec, clock),
            ledger: UniqueEmailAddresses::new(&config.unique_email_table),
            config,
        }
    }

    pub async fn init_schema(&self) -> Result<()> {
        self.events.init_schema().await?;
        self.ledger.init_schema(self.events.pool()).await?;

        tracing::info!(
            event_table = %self.config.event_table,
            unique_email_table = %self.config.unique_email_table,
            "Customer event store schema ready"
        );

        Ok(())
    }

    /// Full history of a customer; an absent stream is NotFound
    pub async fn retrieve_event_stream(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<CustomerEvent>> {
        let stream_id = customer_id.stream_id();

        let events = with_deadline(
            self.config.operation_timeout,
            "customerEventStore.retrieveEventStream",
            self.events.load(&stream_id, 1, u64::MAX),
        )
        .await
        .map_err(|e| e.context("customerEventStore.retrieveEventStream"))?;

        if events.is_empty() {
            return Err(Error::NotFound(format!("customer [{customer_id}]")));
        }

        Ok(events)
    }

    /// Persist the events of a new customer
    pub async fn start_event_stream(
        &self,
        customer_id: &CustomerId,
        recorded: &[CustomerEvent],
    ) -> Result<()> {
        self.write("customerEventStore.startEventStream", customer_id, recorded, 0)
            .await
            .map_err(|e| match e {
                Error::ConcurrencyConflict(_) => {
                    Error::Duplicate(format!("customer [{customer_id}] already exists"))
                }
                other => other,
            })
            .map_err(|e| e.context("customerEventStore.startEventStream"))
    }

    pub async fn append_to_event_stream(
        &self,
        customer_id: &CustomerId,
        recorded: &[CustomerEvent],
        expected_version: u64,
    ) -> Result<()> {
        let operation = "customerEventStore.appendToEventStream";
        self.write(operation, customer_id, recorded, expected_version)
            .await
            .map_err(|e| e.context("customerEventStore.appendToEventStream"))
    }

    /// Remove a customer's events and ledger rows; purging twice is fine
    pub async fn purge_event_stream(&self, customer_id: &CustomerId) -> Result<()> {
        let stream_id = customer_id.stream_id();

        with_deadline(self.config.operation_timeout, "customerEventStore.purgeEventStream", async {
            let mut tx = Transaction::begin(self.events.pool()).await?;
            let outcome = self.purge_in(tx.connection(), &stream_id, customer_id).await;
            tx.finish(outcome).await
        })
        .await
        .map_err(|e| e.context("customerEventStore.purgeEventStream"))
    }

    async fn write(
        &self,
        operation: &'static str,
        customer_id: &CustomerId,
        recorded: &[CustomerEvent],
        expected_version: u64,
    ) -> Result<()> {
        if recorded.is_empty() {
            return Ok(());
        }

        let stream_id = customer_id.stream_id();

        with_deadline(self.config.operation_timeout, operation, async {
            let mut tx = Transaction::begin(self.events.pool()).await?;
            let outcome = self
                .append_in(tx.connection(), &stream_id, recorded, expected_version)
                .await;
            tx.finish(outcome).await
        })
        .await
    }

    async fn append_in(
        &self,
        conn: &mut SqliteConnection,
        stream_id: &StreamId,
        recorded: &[CustomerEvent],
        expected_version: u64,
    ) -> Result<()> {
        self.events.append(conn, stream_id, recorded, expected_version).await?;
        self.ledger.assert_for(conn, recorded).await
    }

    async fn purge_in(
        &self,
        conn: &mut SqliteConnection,
        stream_id: &StreamId,
        customer_id: &CustomerId,
    ) -> Result<()> {
        self.events.purge(conn, stream_id).await?;
        self.ledger.release_all_for(conn, customer_id).await
    }
}

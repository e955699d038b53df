use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::event_sourcing::core::{Aggregate, Clock, DomainEvent, IdGenerator};
use crate::metrics::Metrics;

use super::aggregate::CustomerAggregate;
use super::commands::{CustomerCommand, RegisterCustomer};
use super::event_store::CustomerEventStore;
use super::events::CustomerEvent;
use super::value_objects::CustomerId;

// ============================================================================
// Customer Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store
//
// Input is validated while building the command, before any storage access.
// Whatever the aggregate recorded is persisted even if the command itself
// failed, so an audited failure reaches the stream before the error does.
//
// ============================================================================

pub struct CustomerCommandHandler {
    store: Arc<CustomerEventStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    metrics: Arc<Metrics>,
}

impl CustomerCommandHandler {
    pub fn new(
        store: Arc<CustomerEventStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { store, clock, ids, metrics }
    }

    pub async fn register_customer(
        &self,
        email_address: &str,
        given_name: &str,
        family_name: &str,
    ) -> Result<CustomerId> {
        self.observe("register_customer", async {
            let ids = self.ids.as_ref();
            let command = RegisterCustomer::build(email_address, given_name, family_name, ids)?;
            let mut customer = CustomerAggregate::register(&command, self.clock.now());
            let recorded = customer.take_recorded_events();

            self.store.start_event_stream(&command.customer_id, &recorded).await?;
            self.metrics.record_appended_events(recorded.len());

            Ok::<_, Error>(command.customer_id)
        })
        .await
        .map_err(|e| e.context("customerCommandHandler.registerCustomer"))
    }

    pub async fn confirm_customer_email_address(
        &self,
        customer_id: &str,
        confirmation_hash: &str,
    ) -> Result<()> {
        self.observe("confirm_customer_email_address", async {
            let command = CustomerCommand::confirm_email_address(customer_id, confirmation_hash)?;
            self.handle(&command).await
        })
        .await
        .map_err(|e| e.context("customerCommandHandler.confirmCustomerEmailAddress"))
    }

    pub async fn change_customer_email_address(
        &self,
        customer_id: &str,
        email_address: &str,
    ) -> Result<()> {
        self.observe("change_customer_email_address", async {
            let command = CustomerCommand::change_email_address(customer_id, email_address)?;
            self.handle(&command).await
        })
        .await
        .map_err(|e| e.context("customerCommandHandler.changeCustomerEmailAddress"))
    }

    pub async fn change_customer_name(
        &self,
        customer_id: &str,
        given_name: &str,
        family_name: &str,
    ) -> Result<()> {
        self.observe("change_customer_name", async {
            let command = CustomerCommand::change_name(customer_id, given_name, family_name)?;
            self.handle(&command).await
        })
        .await
        .map_err(|e| e.context("customerCommandHandler.changeCustomerName"))
    }

    pub async fn delete_customer(&self, customer_id: &str) -> Result<()> {
        self.observe("delete_customer", async {
            let command = CustomerCommand::delete(customer_id)?;
            self.handle(&command).await
        })
        .await
        .map_err(|e| e.context("customerCommandHandler.deleteCustomer"))
    }

    /// Load, decide, persist for a command on an existing customer
    async fn handle(&self, command: &CustomerCommand) -> Result<()> {
        let customer_id = command.customer_id();

        let events = self.store.retrieve_event_stream(customer_id).await?;
        let mut customer = CustomerAggregate::load_from_events(&events)?;
        let expected_version = customer.version();

        let outcome = customer.handle_command(command, self.clock.now());
        let recorded = customer.take_recorded_events();

        if recorded.is_empty() {
            tracing::debug!(
                customer_id = %customer_id,
                command = command.name(),
                "Command changed nothing"
            );
            return outcome.map_err(Error::from);
        }

        warn_about_failures(customer_id, &recorded);

        self.store
            .append_to_event_stream(customer_id, &recorded, expected_version)
            .await?;
        self.metrics.record_appended_events(recorded.len());

        outcome.map_err(Error::from)
    }

    async fn observe<T>(
        &self,
        command: &'static str,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let started = Instant::now();
        let outcome = work.await;
        let elapsed = started.elapsed().as_secs_f64();

        self.metrics.record_command(command, elapsed, outcome.as_ref().map(|_| ()));

        match &outcome {
            Ok(_) => tracing::info!(command, elapsed_ms = elapsed * 1000.0, "Command handled"),
            Err(Error::ConcurrencyConflict(msg)) => {
                tracing::warn!(command, error = %msg, "Command lost a concurrent write")
            }
            Err(err) => {
                tracing::debug!(command, error_kind = %err.kind(), error = %err, "Command rejected")
            }
        }

        outcome
    }
}

fn warn_about_failures(customer_id: &CustomerId, recorded: &[CustomerEvent]) {
    for event in recorded {
        if let Some(reason) = event.indicates_an_error() {
            tracing::warn!(
                customer_id = %customer_id,
                event_name = event.event_name(),
                stream_version = event.stream_version(),
                reason,
                "Recorded an event that indicates an error"
            );
        }
    }
}

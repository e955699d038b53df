use std::sync::Arc;

use crate::error::{Error, Result};
use crate::metrics::Metrics;

use super::event_store::CustomerEventStore;
use super::value_objects::CustomerId;
use super::view::CustomerView;

// ============================================================================
// Customer Query Handler
// ============================================================================

pub struct CustomerQueryHandler {
    store: Arc<CustomerEventStore>,
    metrics: Arc<Metrics>,
}

impl CustomerQueryHandler {
    pub fn new(store: Arc<CustomerEventStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Current view of a customer; deleted customers are not found
    pub async fn customer_view_by_id(&self, customer_id: &str) -> Result<CustomerView> {
        let outcome = self.view(customer_id).await;
        self.metrics.record_query(outcome.as_ref().map(|_| ()));

        outcome.map_err(|e| e.context("customerQueryHandler.customerViewByID"))
    }

    async fn view(&self, customer_id: &str) -> Result<CustomerView> {
        let customer_id = CustomerId::build(customer_id)?;
        let events = self.store.retrieve_event_stream(&customer_id).await?;

        let view = CustomerView::from_events(&events);
        if view.is_deleted {
            return Err(Error::NotFound(format!("customer [{customer_id}] was deleted")));
        }

        tracing::debug!(customer_id = %customer_id, version = view.version, "Built customer view");

        Ok(view)
    }
}

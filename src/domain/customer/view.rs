use serde::Serialize;

use crate::event_sourcing::core::DomainEvent;
use super::events::CustomerEvent;

// ============================================================================
// Customer View - read model folded from the event stream
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    pub email_address: String,
    pub is_email_address_confirmed: bool,
    pub given_name: String,
    pub family_name: String,
    pub is_deleted: bool,
    pub version: u64,
}

impl CustomerView {
    pub fn from_events(events: &[CustomerEvent]) -> Self {
        let mut view = Self::default();

        for event in events {
            match event {
                CustomerEvent::Registered(e) => {
                    view.customer_id = e.customer_id.to_string();
                    view.email_address = e.email_address.to_string();
                    view.given_name = e.person_name.given_name.clone();
                    view.family_name = e.person_name.family_name.clone();
                }
                CustomerEvent::EmailAddressConfirmed(_) => {
                    view.is_email_address_confirmed = true;
                }
                CustomerEvent::EmailAddressConfirmationFailed(_) => {}
                CustomerEvent::EmailAddressChanged(e) => {
                    view.email_address = e.email_address.to_string();
                    view.is_email_address_confirmed = false;
                }
                CustomerEvent::NameChanged(e) => {
                    view.given_name = e.person_name.given_name.clone();
                    view.family_name = e.person_name.family_name.clone();
                }
                CustomerEvent::Deleted(_) => {
                    view.is_deleted = true;
                }
            }

            view.version = event.stream_version();
        }

        view
    }
}

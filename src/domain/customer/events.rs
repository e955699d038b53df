use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_sourcing::core::{DomainEvent, EventMeta};
use super::value_objects::{ConfirmationHash, CustomerId, EmailAddress, PersonName};

// ============================================================================
// Customer Domain Events
// ============================================================================

const AGGREGATE_NAME: &str = "Customer";

/// Closed set of event kinds; the names are part of the durable contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomerEventKind {
    Registered,
    EmailAddressConfirmed,
    EmailAddressConfirmationFailed,
    EmailAddressChanged,
    NameChanged,
    Deleted,
}

impl CustomerEventKind {
    pub const ALL: [CustomerEventKind; 6] = [
        CustomerEventKind::Registered,
        CustomerEventKind::EmailAddressConfirmed,
        CustomerEventKind::EmailAddressConfirmationFailed,
        CustomerEventKind::EmailAddressChanged,
        CustomerEventKind::NameChanged,
        CustomerEventKind::Deleted,
    ];

    /// Full event name as persisted
    pub fn event_name(&self) -> &'static str {
        match self {
            CustomerEventKind::Registered => "CustomerRegistered",
            CustomerEventKind::EmailAddressConfirmed => "CustomerEmailAddressConfirmed",
            CustomerEventKind::EmailAddressConfirmationFailed => {
                "CustomerEmailAddressConfirmationFailed"
            }
            CustomerEventKind::EmailAddressChanged => "CustomerEmailAddressChanged",
            CustomerEventKind::NameChanged => "CustomerNameChanged",
            CustomerEventKind::Deleted => "CustomerDeleted",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.event_name() == name)
    }
}

/// Union type for all customer events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerEvent {
    Registered(CustomerRegistered),
    EmailAddressConfirmed(CustomerEmailAddressConfirmed),
    EmailAddressConfirmationFailed(CustomerEmailAddressConfirmationFailed),
    EmailAddressChanged(CustomerEmailAddressChanged),
    NameChanged(CustomerNameChanged),
    Deleted(CustomerDeleted),
}

impl CustomerEvent {
    pub fn kind(&self) -> CustomerEventKind {
        match self {
            CustomerEvent::Registered(_) => CustomerEventKind::Registered,
            CustomerEvent::EmailAddressConfirmed(_) => CustomerEventKind::EmailAddressConfirmed,
            CustomerEvent::EmailAddressConfirmationFailed(_) => {
                CustomerEventKind::EmailAddressConfirmationFailed
            }
            CustomerEvent::EmailAddressChanged(_) => CustomerEventKind::EmailAddressChanged,
            CustomerEvent::NameChanged(_) => CustomerEventKind::NameChanged,
            CustomerEvent::Deleted(_) => CustomerEventKind::Deleted,
        }
    }

    pub fn customer_id(&self) -> &CustomerId {
        match self {
            CustomerEvent::Registered(e) => &e.customer_id,
            CustomerEvent::EmailAddressConfirmed(e) => &e.customer_id,
            CustomerEvent::EmailAddressConfirmationFailed(e) => &e.customer_id,
            CustomerEvent::EmailAddressChanged(e) => &e.customer_id,
            CustomerEvent::NameChanged(e) => &e.customer_id,
            CustomerEvent::Deleted(e) => &e.customer_id,
        }
    }

    pub(crate) fn meta_mut(&mut self) -> &mut EventMeta {
        match self {
            CustomerEvent::Registered(e) => &mut e.meta,
            CustomerEvent::EmailAddressConfirmed(e) => &mut e.meta,
            CustomerEvent::EmailAddressConfirmationFailed(e) => &mut e.meta,
            CustomerEvent::EmailAddressChanged(e) => &mut e.meta,
            CustomerEvent::NameChanged(e) => &mut e.meta,
            CustomerEvent::Deleted(e) => &mut e.meta,
        }
    }
}

impl DomainEvent for CustomerEvent {
    fn meta(&self) -> &EventMeta {
        match self {
            CustomerEvent::Registered(e) => &e.meta,
            CustomerEvent::EmailAddressConfirmed(e) => &e.meta,
            CustomerEvent::EmailAddressConfirmationFailed(e) => &e.meta,
            CustomerEvent::EmailAddressChanged(e) => &e.meta,
            CustomerEvent::NameChanged(e) => &e.meta,
            CustomerEvent::Deleted(e) => &e.meta,
        }
    }

    fn indicates_an_error(&self) -> Option<&str> {
        match self {
            CustomerEvent::EmailAddressConfirmationFailed(e) => Some(&e.reason),
            _ => None,
        }
    }
}

fn meta_for(
    kind: CustomerEventKind,
    customer_id: &CustomerId,
    occurred_at: DateTime<Utc>,
    stream_version: u64,
) -> EventMeta {
    debug_assert!(kind.event_name().starts_with(AGGREGATE_NAME));
    EventMeta::new(customer_id.as_str(), kind.event_name(), occurred_at, stream_version)
}

// Individual event types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRegistered {
    pub customer_id: CustomerId,
    pub email_address: EmailAddress,
    pub confirmation_hash: ConfirmationHash,
    pub person_name: PersonName,
    pub meta: EventMeta,
}

impl CustomerRegistered {
    pub fn build(
        customer_id: CustomerId,
        email_address: EmailAddress,
        confirmation_hash: ConfirmationHash,
        person_name: PersonName,
        occurred_at: DateTime<Utc>,
        stream_version: u64,
    ) -> Self {
        let meta = meta_for(
            CustomerEventKind::Registered,
            &customer_id,
            occurred_at,
            stream_version,
        );
        Self { customer_id, email_address, confirmation_hash, person_name, meta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerEmailAddressConfirmed {
    pub customer_id: CustomerId,
    pub email_address: EmailAddress,
    pub meta: EventMeta,
}

impl CustomerEmailAddressConfirmed {
    pub fn build(
        customer_id: CustomerId,
        email_address: EmailAddress,
        occurred_at: DateTime<Utc>,
        stream_version: u64,
    ) -> Self {
        let meta = meta_for(
            CustomerEventKind::EmailAddressConfirmed,
            &customer_id,
            occurred_at,
            stream_version,
        );
        Self { customer_id, email_address, meta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerEmailAddressConfirmationFailed {
    pub customer_id: CustomerId,
    pub email_address: EmailAddress,
    /// The hash that was supplied and did not match
    pub confirmation_hash: ConfirmationHash,
    pub reason: String,
    pub meta: EventMeta,
}

impl CustomerEmailAddressConfirmationFailed {
    pub fn build(
        customer_id: CustomerId,
        email_address: EmailAddress,
        confirmation_hash: ConfirmationHash,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
        stream_version: u64,
    ) -> Self {
        let meta = meta_for(
            CustomerEventKind::EmailAddressConfirmationFailed,
            &customer_id,
            occurred_at,
            stream_version,
        );
        Self { customer_id, email_address, confirmation_hash, reason: reason.into(), meta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerEmailAddressChanged {
    pub customer_id: CustomerId,
    pub email_address: EmailAddress,
    pub confirmation_hash: ConfirmationHash,
    pub previous_email_address: EmailAddress,
    pub meta: EventMeta,
}

impl CustomerEmailAddressChanged {
    pub fn build(
        customer_id: CustomerId,
        email_address: EmailAddress,
        confirmation_hash: ConfirmationHash,
        previous_email_address: EmailAddress,
        occurred_at: DateTime<Utc>,
        stream_version: u64,
    ) -> Self {
        let meta = meta_for(
            CustomerEventKind::EmailAddressChanged,
            &customer_id,
            occurred_at,
            stream_version,
        );
        Self { customer_id, email_address, confirmation_hash, previous_email_address, meta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerNameChanged {
    pub customer_id: CustomerId,
    pub person_name: PersonName,
    pub meta: EventMeta,
}

impl CustomerNameChanged {
    pub fn build(
        customer_id: CustomerId,
        person_name: PersonName,
        occurred_at: DateTime<Utc>,
        stream_version: u64,
    ) -> Self {
        let meta = meta_for(
            CustomerEventKind::NameChanged,
            &customer_id,
            occurred_at,
            stream_version,
        );
        Self { customer_id, person_name, meta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDeleted {
    pub customer_id: CustomerId,
    /// Address held at deletion time; released from the uniqueness ledger
    pub email_address: EmailAddress,
    pub meta: EventMeta,
}

impl CustomerDeleted {
    pub fn build(
        customer_id: CustomerId,
        email_address: EmailAddress,
        occurred_at: DateTime<Utc>,
        stream_version: u64,
    ) -> Self {
        let meta = meta_for(CustomerEventKind::Deleted, &customer_id, occurred_at, stream_version);
        Self { customer_id, email_address, meta }
    }
}

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::event_sourcing::core::{DomainEvent, EventCodec};
use super::events::*;

// ============================================================================
// Customer Event Codec
// ============================================================================
//
// Payload: the event's own fields in camelCase plus a `meta` object
// {identifier, eventName, occurredAt, streamVersion}. Decoding goes through
// CustomerEventKind, so every new kind has to be wired in here explicitly.
//
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct CustomerEventCodec;

impl EventCodec for CustomerEventCodec {
    type Event = CustomerEvent;

    fn encode(&self, event: &CustomerEvent) -> Result<(String, Vec<u8>)> {
        let payload = match event {
            CustomerEvent::Registered(e) => to_payload(e),
            CustomerEvent::EmailAddressConfirmed(e) => to_payload(e),
            CustomerEvent::EmailAddressConfirmationFailed(e) => to_payload(e),
            CustomerEvent::EmailAddressChanged(e) => to_payload(e),
            CustomerEvent::NameChanged(e) => to_payload(e),
            CustomerEvent::Deleted(e) => to_payload(e),
        }
        .map_err(|e| Error::Technical(format!("encoding {} failed: {}", event.event_name(), e)))?;

        Ok((event.kind().event_name().to_string(), payload))
    }

    fn decode(
        &self,
        event_name: &str,
        payload: &[u8],
        stream_version: u64,
    ) -> Result<CustomerEvent> {
        let Some(kind) = CustomerEventKind::from_event_name(event_name) else {
            return Err(Error::UnmarshalingFailed(format!("unknown event name [{event_name}]")));
        };

        let mut event = match kind {
            CustomerEventKind::Registered => {
                CustomerEvent::Registered(from_payload(event_name, payload)?)
            }
            CustomerEventKind::EmailAddressConfirmed => {
                CustomerEvent::EmailAddressConfirmed(from_payload(event_name, payload)?)
            }
            CustomerEventKind::EmailAddressConfirmationFailed => {
                CustomerEvent::EmailAddressConfirmationFailed(from_payload(event_name, payload)?)
            }
            CustomerEventKind::EmailAddressChanged => {
                CustomerEvent::EmailAddressChanged(from_payload(event_name, payload)?)
            }
            CustomerEventKind::NameChanged => {
                CustomerEvent::NameChanged(from_payload(event_name, payload)?)
            }
            CustomerEventKind::Deleted => {
                CustomerEvent::Deleted(from_payload(event_name, payload)?)
            }
        };
        event.meta_mut().stream_version = stream_version;

        if event.event_name() != event_name {
            return Err(Error::UnmarshalingFailed(format!(
                "payload of [{event_name}] claims to be [{}]",
                event.event_name()
            )));
        }

        Ok(event)
    }
}

fn to_payload<T: Serialize>(event: &T) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(event)
}

fn from_payload<T: DeserializeOwned>(event_name: &str, payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload)
        .map_err(|e| Error::UnmarshalingFailed(format!("decoding [{event_name}] failed: {e}")))
}

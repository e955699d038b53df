use crate::error::Result;

use super::event::DomainEvent;

// ============================================================================
// Event Codec
// ============================================================================
//
// Bidirectional mapping between the closed set of event kinds of one
// aggregate and their wire payloads. Implementations dispatch through an
// explicit match over the known kinds; the set of names is the aggregate's
// durable contract.
//
// ============================================================================

pub trait EventCodec: Send + Sync {
    type Event: DomainEvent;

    /// Returns the event name and the serialized payload
    fn encode(&self, event: &Self::Event) -> Result<(String, Vec<u8>)>;

    /// Rebuild an event; the stream version of the envelope is authoritative
    fn decode(&self, event_name: &str, payload: &[u8], stream_version: u64) -> Result<Self::Event>;
}

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::stream_id::StreamId;

// ============================================================================
// Event Metadata
// ============================================================================
//
// Shared by every domain event, whatever its kind. The occurrence timestamp
// goes over the wire as RFC3339 with nanosecond precision.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    /// Identifier of the owning aggregate
    pub identifier: String,
    /// Full event name, e.g. "CustomerRegistered"
    pub event_name: String,
    #[serde(with = "rfc3339_nanos")]
    pub occurred_at: DateTime<Utc>,
    pub stream_version: u64,
}

impl EventMeta {
    pub fn new(
        identifier: impl Into<String>,
        event_name: impl Into<String>,
        occurred_at: DateTime<Utc>,
        stream_version: u64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            event_name: event_name.into(),
            occurred_at,
            stream_version,
        }
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// Implemented by the closed event enum of an aggregate
pub trait DomainEvent: Clone + Send + Sync {
    fn meta(&self) -> &EventMeta;

    fn event_name(&self) -> &str {
        &self.meta().event_name
    }

    fn stream_version(&self) -> u64 {
        self.meta().stream_version
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.meta().occurred_at
    }

    /// Some events record a failed attempt; they carry the reason here
    fn indicates_an_error(&self) -> Option<&str> {
        None
    }
}

// ============================================================================
// Event Envelope - Persisted Form
// ============================================================================

/// One row of the event table, before decoding
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub stream_id: StreamId,
    pub event_name: String,
    pub payload: Vec<u8>,
    pub stream_version: u64,
    pub recorded_at: DateTime<Utc>,
}

pub mod rfc3339_nanos {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_timestamp, parse_timestamp};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_uses_nanosecond_precision() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let formatted = format_timestamp(&ts);

        assert_eq!(formatted, "2023-11-14T22:13:20.123456789Z");
        assert_eq!(parse_timestamp(&formatted).unwrap(), ts);
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let meta = EventMeta::new("abc", "CustomerRegistered", ts, 1);

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["identifier"], "abc");
        assert_eq!(json["eventName"], "CustomerRegistered");
        assert_eq!(json["occurredAt"], "2023-11-14T22:13:20.000000000Z");
        assert_eq!(json["streamVersion"], 1);

        let back: EventMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}

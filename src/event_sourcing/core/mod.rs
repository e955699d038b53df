// ============================================================================
// Event Sourcing Core - Generic Infrastructure Abstractions
// ============================================================================
//
// This module contains GENERIC, reusable event sourcing infrastructure
// that works with ANY domain aggregate.
//
// Key Principles:
// - No domain-specific code (no Customer, etc.)
// - Generic over aggregate and event types
// - Time and identity are injected, never read from globals
//
// ============================================================================

pub mod aggregate;
pub mod clock;
pub mod codec;
pub mod event;
pub mod stream_id;

// Re-export core types for convenience
pub use aggregate::Aggregate;
pub use clock::{Clock, FixedClock, IdGenerator, SequenceIdGenerator, SystemClock, UuidV7Generator};
pub use codec::EventCodec;
pub use event::{format_timestamp, parse_timestamp, DomainEvent, EventEnvelope, EventMeta};
pub use stream_id::StreamId;

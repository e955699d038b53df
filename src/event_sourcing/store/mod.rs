// ============================================================================
// Event Sourcing Store - Generic Persistence Layer
// ============================================================================
//
// This module contains GENERIC persistence infrastructure for event sourcing.
// All components work with ANY aggregate/event type.
//
// ============================================================================

pub mod database;
pub mod event_store;

pub use database::{connect, with_deadline, Transaction};
pub use event_store::EventStore;

use chrono::{DateTime, Utc};

use super::event::DomainEvent;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Commands are validated before emitting events
// 3. Events represent facts that have already happened
// 4. Recorded events are folded into state right away
// 5. The caller persists the recorded events and drains the buffer
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// Type Parameters:
/// - `Event`: The domain event type for this aggregate
/// - `Command`: The command type handled by an existing aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Sized + Send {
    type Event: DomainEvent;
    type Command;
    type Error;

    /// Rebuild state by folding a persisted stream, oldest first
    fn load_from_events(events: &[Self::Event]) -> Result<Self, Self::Error>;

    /// Fold a single event into state
    fn apply_event(&mut self, event: &Self::Event);

    /// Validate a command against current state and record resulting events.
    ///
    /// An error does not imply that nothing was recorded: a failed attempt
    /// may itself be recorded as history.
    fn handle_command(
        &mut self,
        command: &Self::Command,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), Self::Error>;

    /// Version of the last event folded into state
    fn version(&self) -> u64;

    /// Events recorded since the last drain, oldest first
    fn recorded_events(&self) -> &[Self::Event];

    /// Hand over the recorded events and clear the buffer
    fn take_recorded_events(&mut self) -> Vec<Self::Event>;
}

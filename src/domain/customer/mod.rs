// ============================================================================
// Customer Domain - Business Logic for Customer Aggregate
// ============================================================================
//
// This module contains ALL Customer-specific code:
// - Value objects (CustomerId, EmailAddress, PersonName, ...)
// - Events (CustomerRegistered, CustomerDeleted, ...) and their codec
// - Commands (RegisterCustomer, CustomerCommand)
// - Errors (CustomerError enum)
// - Aggregate (CustomerAggregate with business logic)
// - Persistence (CustomerEventStore, UniqueEmailAddresses)
// - Command and query handlers, CustomerView read model
//
// This is completely separate from the generic event sourcing infrastructure.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod codec;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod unique_email_addresses;
pub mod event_store;
pub mod view;
pub mod command_handler;
pub mod query_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use codec::CustomerEventCodec;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use unique_email_addresses::{LedgerAssertion, UniqueEmailAddresses};
pub use event_store::CustomerEventStore;
pub use view::CustomerView;
pub use command_handler::CustomerCommandHandler;
pub use query_handler::CustomerQueryHandler;

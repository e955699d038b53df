// ============================================================================
// customer_es - event-sourced customer records
// ============================================================================
//
// event_sourcing: generic stream storage (append with optimistic
//                 concurrency, ordered reads, purge) and core abstractions
// domain:         the Customer aggregate, its events, uniqueness ledger and
//                 command / query handlers
//
// ============================================================================

pub mod config;
pub mod domain;
pub mod error;
pub mod event_sourcing;
pub mod metrics;
pub mod utils;

pub use error::{Error, ErrorKind, Result};

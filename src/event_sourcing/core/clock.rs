use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// Injected collaborators: time and identity
// ============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always answers the same instant; for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Time-ordered UUIDs, unique across processes
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn generate(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Hands out a predefined list of ids, then falls back to random UUIDs
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    ids: Mutex<Vec<String>>,
}

impl SequenceIdGenerator {
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        ids.reverse();
        Self { ids: Mutex::new(ids) }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn generate(&self) -> String {
        let next = match self.ids.lock() {
            Ok(mut ids) => ids.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        };
        next.unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_is_stable() {
        let instant = Utc.timestamp_opt(1_600_000_000, 42).unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_uuid_generator_is_unique() {
        let generator = UuidV7Generator;
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_sequence_generator_in_order() {
        let generator = SequenceIdGenerator::new(["first", "second"]);
        assert_eq!(generator.generate(), "first");
        assert_eq!(generator.generate(), "second");
        assert!(Uuid::parse_str(&generator.generate()).is_ok());
    }
}

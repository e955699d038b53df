use chrono::{DateTime, Utc};

use crate::event_sourcing::core::{Aggregate, DomainEvent};
use super::commands::{CustomerCommand, RegisterCustomer};
use super::errors::CustomerError;
use super::events::*;
use super::value_objects::{
    ConfirmableEmailAddress, ConfirmationHash, CustomerId, EmailAddress, PersonName,
};

// ============================================================================
// Customer Aggregate - Business Logic
// ============================================================================
//
// States: active with an unconfirmed address, active with a confirmed
// address, deleted (terminal). Every recorded event is folded right away, so
// a second command on the same instance sees the new state.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerAggregate {
    pub customer_id: CustomerId,
    pub email_address: ConfirmableEmailAddress,
    pub person_name: PersonName,
    pub is_deleted: bool,
    version: u64,
    recorded: Vec<CustomerEvent>,
}

impl CustomerAggregate {
    /// Start a new customer; the result holds one recorded event
    pub fn register(command: &RegisterCustomer, occurred_at: DateTime<Utc>) -> Self {
        let event = CustomerRegistered::build(
            command.customer_id.clone(),
            command.email_address.clone(),
            command.confirmation_hash.clone(),
            command.person_name.clone(),
            occurred_at,
            1,
        );

        let mut aggregate = Self::from_registration(&event);
        aggregate.recorded.push(CustomerEvent::Registered(event));
        aggregate
    }

    fn from_registration(event: &CustomerRegistered) -> Self {
        Self {
            customer_id: event.customer_id.clone(),
            email_address: ConfirmableEmailAddress::unconfirmed(
                event.email_address.clone(),
                event.confirmation_hash.clone(),
            ),
            person_name: event.person_name.clone(),
            is_deleted: false,
            version: event.meta.stream_version,
            recorded: Vec::new(),
        }
    }

    fn record(&mut self, event: CustomerEvent) {
        self.apply_event(&event);
        self.recorded.push(event);
    }

    fn next_version(&self) -> u64 {
        self.version + 1
    }

    fn confirm_email_address(
        &mut self,
        confirmation_hash: &ConfirmationHash,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), CustomerError> {
        if !self.email_address.matches(confirmation_hash) {
            let failure = CustomerEmailAddressConfirmationFailed::build(
                self.customer_id.clone(),
                self.email_address.email_address.clone(),
                confirmation_hash.clone(),
                CustomerError::ConfirmationHashMismatch.to_string(),
                occurred_at,
                self.next_version(),
            );
            self.record(CustomerEvent::EmailAddressConfirmationFailed(failure));
            return Err(CustomerError::ConfirmationHashMismatch);
        }

        if self.email_address.is_confirmed {
            return Ok(());
        }

        let confirmed = CustomerEmailAddressConfirmed::build(
            self.customer_id.clone(),
            self.email_address.email_address.clone(),
            occurred_at,
            self.next_version(),
        );
        self.record(CustomerEvent::EmailAddressConfirmed(confirmed));
        Ok(())
    }

    fn change_email_address(
        &mut self,
        email_address: &EmailAddress,
        confirmation_hash: &ConfirmationHash,
        occurred_at: DateTime<Utc>,
    ) {
        if &self.email_address.email_address == email_address {
            return;
        }

        let changed = CustomerEmailAddressChanged::build(
            self.customer_id.clone(),
            email_address.clone(),
            confirmation_hash.clone(),
            self.email_address.email_address.clone(),
            occurred_at,
            self.next_version(),
        );
        self.record(CustomerEvent::EmailAddressChanged(changed));
    }

    fn change_name(&mut self, person_name: &PersonName, occurred_at: DateTime<Utc>) {
        if &self.person_name == person_name {
            return;
        }

        let changed = CustomerNameChanged::build(
            self.customer_id.clone(),
            person_name.clone(),
            occurred_at,
            self.next_version(),
        );
        self.record(CustomerEvent::NameChanged(changed));
    }

    fn delete(&mut self, occurred_at: DateTime<Utc>) {
        let deleted = CustomerDeleted::build(
            self.customer_id.clone(),
            self.email_address.email_address.clone(),
            occurred_at,
            self.next_version(),
        );
        self.record(CustomerEvent::Deleted(deleted));
    }
}

impl Aggregate for CustomerAggregate {
    type Event = CustomerEvent;
    type Command = CustomerCommand;
    type Error = CustomerError;

    fn load_from_events(events: &[Self::Event]) -> Result<Self, Self::Error> {
        let (first, rest) = events.split_first().ok_or(CustomerError::EmptyEventStream)?;

        let mut aggregate = match first {
            CustomerEvent::Registered(e) if e.meta.stream_version == 1 => {
                Self::from_registration(e)
            }
            CustomerEvent::Registered(e) => {
                return Err(CustomerError::VersionGap { expected: 1, found: e.meta.stream_version });
            }
            other => {
                let name = other.event_name().to_string();
                return Err(CustomerError::NotStartedByRegistration(name));
            }
        };

        for event in rest {
            let expected = aggregate.next_version();
            if event.stream_version() != expected {
                return Err(CustomerError::VersionGap { expected, found: event.stream_version() });
            }
            if let CustomerEvent::Registered(_) = event {
                return Err(CustomerError::RegisteredTwice(expected));
            }
            aggregate.apply_event(event);
        }

        Ok(aggregate)
    }

    fn apply_event(&mut self, event: &Self::Event) {
        match event {
            CustomerEvent::Registered(e) => {
                *self = Self {
                    recorded: std::mem::take(&mut self.recorded),
                    ..Self::from_registration(e)
                };
            }
            CustomerEvent::EmailAddressConfirmed(_) => {
                self.email_address.is_confirmed = true;
            }
            CustomerEvent::EmailAddressConfirmationFailed(_) => {
                // History only
            }
            CustomerEvent::EmailAddressChanged(e) => {
                self.email_address = ConfirmableEmailAddress::unconfirmed(
                    e.email_address.clone(),
                    e.confirmation_hash.clone(),
                );
            }
            CustomerEvent::NameChanged(e) => {
                self.person_name = e.person_name.clone();
            }
            CustomerEvent::Deleted(_) => {
                self.is_deleted = true;
            }
        }

        self.version = event.stream_version();
    }

    fn handle_command(
        &mut self,
        command: &Self::Command,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        if self.is_deleted {
            return match command {
                // Deleting twice is fine
                CustomerCommand::Delete { .. } => Ok(()),
                _ => Err(CustomerError::Deleted),
            };
        }

        match command {
            CustomerCommand::ConfirmEmailAddress { confirmation_hash, .. } => {
                self.confirm_email_address(confirmation_hash, occurred_at)
            }
            CustomerCommand::ChangeEmailAddress { email_address, confirmation_hash, .. } => {
                self.change_email_address(email_address, confirmation_hash, occurred_at);
                Ok(())
            }
            CustomerCommand::ChangeName { person_name, .. } => {
                self.change_name(person_name, occurred_at);
                Ok(())
            }
            CustomerCommand::Delete { .. } => {
                self.delete(occurred_at);
                Ok(())
            }
        }
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn recorded_events(&self) -> &[Self::Event] {
        &self.recorded
    }

    fn take_recorded_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.recorded)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

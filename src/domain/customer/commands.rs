use crate::error::Result;
use crate::event_sourcing::core::IdGenerator;
use super::value_objects::{ConfirmationHash, CustomerId, EmailAddress, PersonName};

// ============================================================================
// Customer Domain Commands
// ============================================================================
//
// Commands are built from raw input and validate it on construction, so an
// invalid request never reaches storage. Anything random (ids, confirmation
// hashes) is generated here as well, keeping the aggregate deterministic.
//
// ============================================================================

/// Starts a new customer stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCustomer {
    pub customer_id: CustomerId,
    pub email_address: EmailAddress,
    pub confirmation_hash: ConfirmationHash,
    pub person_name: PersonName,
}

impl RegisterCustomer {
    pub fn build(
        email_address: &str,
        given_name: &str,
        family_name: &str,
        ids: &dyn IdGenerator,
    ) -> Result<Self> {
        let email_address = EmailAddress::build(email_address)?;
        let person_name = PersonName::build(given_name, family_name)?;
        let confirmation_hash = ConfirmationHash::generate(&email_address);

        Ok(Self {
            customer_id: CustomerId::generate(ids),
            email_address,
            confirmation_hash,
            person_name,
        })
    }
}

/// Commands handled by an existing customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerCommand {
    ConfirmEmailAddress {
        customer_id: CustomerId,
        confirmation_hash: ConfirmationHash,
    },
    ChangeEmailAddress {
        customer_id: CustomerId,
        email_address: EmailAddress,
        confirmation_hash: ConfirmationHash,
    },
    ChangeName {
        customer_id: CustomerId,
        person_name: PersonName,
    },
    Delete {
        customer_id: CustomerId,
    },
}

impl CustomerCommand {
    pub fn confirm_email_address(customer_id: &str, confirmation_hash: &str) -> Result<Self> {
        Ok(Self::ConfirmEmailAddress {
            customer_id: CustomerId::build(customer_id)?,
            confirmation_hash: ConfirmationHash::build(confirmation_hash)?,
        })
    }

    pub fn change_email_address(customer_id: &str, email_address: &str) -> Result<Self> {
        let customer_id = CustomerId::build(customer_id)?;
        let email_address = EmailAddress::build(email_address)?;
        let confirmation_hash = ConfirmationHash::generate(&email_address);

        Ok(Self::ChangeEmailAddress {
            customer_id,
            email_address,
            confirmation_hash,
        })
    }

    pub fn change_name(customer_id: &str, given_name: &str, family_name: &str) -> Result<Self> {
        Ok(Self::ChangeName {
            customer_id: CustomerId::build(customer_id)?,
            person_name: PersonName::build(given_name, family_name)?,
        })
    }

    pub fn delete(customer_id: &str) -> Result<Self> {
        Ok(Self::Delete {
            customer_id: CustomerId::build(customer_id)?,
        })
    }

    pub fn customer_id(&self) -> &CustomerId {
        match self {
            CustomerCommand::ConfirmEmailAddress { customer_id, .. }
            | CustomerCommand::ChangeEmailAddress { customer_id, .. }
            | CustomerCommand::ChangeName { customer_id, .. }
            | CustomerCommand::Delete { customer_id } => customer_id,
        }
    }

    /// Short name used in logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            CustomerCommand::ConfirmEmailAddress { .. } => "confirm_email_address",
            CustomerCommand::ChangeEmailAddress { .. } => "change_email_address",
            CustomerCommand::ChangeName { .. } => "change_name",
            CustomerCommand::Delete { .. } => "delete",
        }
    }
}

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::event_sourcing::core::{IdGenerator, StreamId};

// ============================================================================
// Customer Value Objects
// ============================================================================
//
// Every constructor taking raw caller input validates it and fails with
// InputIsInvalid. `rebuild`-style constructors are for data coming back from
// storage, which was validated on the way in.
//
// ============================================================================

const STREAM_PREFIX: &str = "customer";

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s]+@[^\s]+\.[\w]{2,}$").expect("email address pattern is valid")
});

/// Customer identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn build(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::InputIsInvalid("customer id must not be empty".to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(ids.generate())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn stream_id(&self) -> StreamId {
        // Never empty: construction guarantees a non-empty id
        StreamId::new(format!("{STREAM_PREFIX}-{}", self.0))
            .unwrap_or_else(|_| unreachable!("customer stream id is never empty"))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer email address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn build(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::InputIsInvalid("email address must not be empty".to_string()));
        }
        if !EMAIL_ADDRESS.is_match(value) {
            return Err(Error::InputIsInvalid(format!(
                "email address has an invalid format: {value}"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secret a customer proves ownership of an email address with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationHash(String);

impl ConfirmationHash {
    pub fn build(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::InputIsInvalid("confirmation hash must not be empty".to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Fresh hash bound to an address; salted so re-using an address never
    /// yields an old hash again
    pub fn generate(email_address: &EmailAddress) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(email_address.as_str().as_bytes());
        hasher.update(Uuid::new_v4().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfirmationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub given_name: String,
    pub family_name: String,
}

impl PersonName {
    pub fn build(given_name: &str, family_name: &str) -> Result<Self> {
        if given_name.is_empty() {
            return Err(Error::InputIsInvalid("given name must not be empty".to_string()));
        }
        if family_name.is_empty() {
            return Err(Error::InputIsInvalid("family name must not be empty".to_string()));
        }
        Ok(Self {
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
        })
    }
}

/// An email address together with its confirmation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmableEmailAddress {
    pub email_address: EmailAddress,
    pub confirmation_hash: ConfirmationHash,
    pub is_confirmed: bool,
}

impl ConfirmableEmailAddress {
    pub fn unconfirmed(email_address: EmailAddress, confirmation_hash: ConfirmationHash) -> Self {
        Self {
            email_address,
            confirmation_hash,
            is_confirmed: false,
        }
    }

    pub fn matches(&self, hash: &ConfirmationHash) -> bool {
        &self.confirmation_hash == hash
    }
}

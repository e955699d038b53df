use crate::error::Error;

// ============================================================================
// Customer Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomerError {
    #[error("customer was deleted")]
    Deleted,

    #[error("confirmation hash does not match")]
    ConfirmationHashMismatch,

    #[error("event stream is empty")]
    EmptyEventStream,

    #[error("event stream must start with CustomerRegistered, found {0}")]
    NotStartedByRegistration(String),

    #[error("event stream is not contiguous: expected version {expected}, found {found}")]
    VersionGap { expected: u64, found: u64 },

    #[error("event stream has a second CustomerRegistered at version {0}")]
    RegisteredTwice(u64),
}

impl From<CustomerError> for Error {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::Deleted => Error::NotFound(err.to_string()),
            CustomerError::ConfirmationHashMismatch => {
                Error::DomainConstraintsViolation(err.to_string())
            }
            CustomerError::EmptyEventStream
            | CustomerError::NotStartedByRegistration(_)
            | CustomerError::VersionGap { .. }
            | CustomerError::RegisteredTwice(_) => Error::InvalidEventStream(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_business_errors_map_to_kinds() {
        assert_eq!(Error::from(CustomerError::Deleted).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::from(CustomerError::ConfirmationHashMismatch).kind(),
            ErrorKind::DomainConstraintsViolation
        );
        assert_eq!(
            Error::from(CustomerError::VersionGap { expected: 2, found: 4 }).kind(),
            ErrorKind::InvalidEventStream
        );
    }
}

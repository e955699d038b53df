use std::fmt;

// ============================================================================
// Error Taxonomy
// ============================================================================
//
// Every failure that leaves the core carries one of these kinds. Context is
// prepended to the message as the error travels upwards; the kind never
// changes on the way.
//
// ============================================================================

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or empty caller input, rejected before any storage access
    #[error("input is invalid: {0}")]
    InputIsInvalid(String),

    /// A business rule was broken
    #[error("domain constraints violated: {0}")]
    DomainConstraintsViolation(String),

    /// Stream is absent or the aggregate was deleted
    #[error("not found: {0}")]
    NotFound(String),

    /// Email address already claimed by another customer
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Optimistic version check failed at append time
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("unmarshaling failed: {0}")]
    UnmarshalingFailed(String),

    #[error("invalid event stream: {0}")]
    InvalidEventStream(String),

    /// Infrastructure failure (database, deadline, ...)
    #[error("technical error: {0}")]
    Technical(String),
}

/// Discriminant of [`Error`], handy for matching and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputIsInvalid,
    DomainConstraintsViolation,
    NotFound,
    Duplicate,
    ConcurrencyConflict,
    UnmarshalingFailed,
    InvalidEventStream,
    Technical,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputIsInvalid => "input_is_invalid",
            ErrorKind::DomainConstraintsViolation => "domain_constraints_violation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::ConcurrencyConflict => "concurrency_conflict",
            ErrorKind::UnmarshalingFailed => "unmarshaling_failed",
            ErrorKind::InvalidEventStream => "invalid_event_stream",
            ErrorKind::Technical => "technical",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InputIsInvalid(_) => ErrorKind::InputIsInvalid,
            Error::DomainConstraintsViolation(_) => ErrorKind::DomainConstraintsViolation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Duplicate(_) => ErrorKind::Duplicate,
            Error::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            Error::UnmarshalingFailed(_) => ErrorKind::UnmarshalingFailed,
            Error::InvalidEventStream(_) => ErrorKind::InvalidEventStream,
            Error::Technical(_) => ErrorKind::Technical,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::InputIsInvalid(msg)
            | Error::DomainConstraintsViolation(msg)
            | Error::NotFound(msg)
            | Error::Duplicate(msg)
            | Error::ConcurrencyConflict(msg)
            | Error::UnmarshalingFailed(msg)
            | Error::InvalidEventStream(msg)
            | Error::Technical(msg) => msg,
        }
    }

    /// Prepend context to the message, keeping the kind intact
    pub fn context(self, ctx: impl fmt::Display) -> Self {
        let wrap = |msg: String| format!("{ctx}: {msg}");

        match self {
            Error::InputIsInvalid(msg) => Error::InputIsInvalid(wrap(msg)),
            Error::DomainConstraintsViolation(msg) => Error::DomainConstraintsViolation(wrap(msg)),
            Error::NotFound(msg) => Error::NotFound(wrap(msg)),
            Error::Duplicate(msg) => Error::Duplicate(wrap(msg)),
            Error::ConcurrencyConflict(msg) => Error::ConcurrencyConflict(wrap(msg)),
            Error::UnmarshalingFailed(msg) => Error::UnmarshalingFailed(wrap(msg)),
            Error::InvalidEventStream(msg) => Error::InvalidEventStream(wrap(msg)),
            Error::Technical(msg) => Error::Technical(wrap(msg)),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Technical(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::UnmarshalingFailed(err.to_string())
    }
}

/// Attach context to the error side of a [`Result`]
pub trait ResultExt<T> {
    fn context(self, ctx: &'static str) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, ctx: &'static str) -> Result<T> {
        self.map_err(|e| e.into().context(ctx))
    }
}

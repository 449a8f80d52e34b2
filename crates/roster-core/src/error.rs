//! Error types for roster-core
//!
//! Every failure carries the exact user-facing string that the calling layer
//! shows (and asserts on). Errors are grouped into the four kinds the outward
//! contract distinguishes: validation, authorization, state conflict and
//! storage.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::messages;
use crate::store::StoreError;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input (empty reason, zero value, bad service number, ...)
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// Permission, ownership or self-action denial
    #[error("denied: {0}")]
    Denied(&'static str),

    /// Acting on state that no longer allows the action
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// Underlying persistence failure
    #[error("storage error ({message}): {source}")]
    Storage {
        /// Generic message shown to the user
        message: &'static str,
        /// Store failure
        #[source]
        source: StoreError,
    },

    /// Token or password hashing failure
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy used by callers that need to branch on the failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input
    Validation,
    /// Denied by the authorization model
    Authorization,
    /// Already-decided grant, insufficient balance, duplicate record, missing record
    StateConflict,
    /// Persistence or identity infrastructure failure
    Storage,
}

impl Error {
    /// Map a store failure to a storage error carrying an operation-specific message.
    pub fn storage(message: &'static str) -> impl FnOnce(StoreError) -> Error {
        move |source| Error::Storage { message, source }
    }

    /// The verbatim user-facing message for this error
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Validation(msg)
            | Error::Denied(msg)
            | Error::Conflict(msg)
            | Error::NotFound(msg) => msg,
            Error::Storage { message, .. } => message,
            Error::Identity(_) => messages::UNKNOWN_ERROR,
        }
    }

    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Denied(_) => ErrorKind::Authorization,
            Error::Conflict(_) | Error::NotFound(_) => ErrorKind::StateConflict,
            Error::Storage { .. } | Error::Identity(_) => ErrorKind::Storage,
        }
    }
}

impl From<StoreError> for Error {
    fn from(source: StoreError) -> Self {
        Error::Storage {
            message: messages::UNKNOWN_ERROR,
            source,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    match error.kind() {
        ErrorKind::Storage => format!("{}\n\n({})", error.user_message(), error),
        _ => error.user_message().to_string(),
    }
}

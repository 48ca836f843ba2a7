//! Error types for the todo API client and the session built on top of it.
//!
//! # Design
//! `ApiError` covers everything that can go wrong once a request is about to
//! be issued: no token, the transport failing, a non-2xx status, or a body
//! that does not decode. `SyncError` adds the local precondition failures that
//! stop an operation before any request exists. Both render to the
//! human-readable message the session stores for display.

use thiserror::Error;

/// Errors returned by `TodoClient` parse methods and `Transport` impls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not complete (DNS, connect, reset, ...).
    #[error("network failure: {0}")]
    Network(String),

    /// The server answered with a non-2xx status. `message` is whatever the
    /// server put in the body, if anything usable.
    #[error("{}", http_message(.status, .message))]
    Http { status: u16, message: Option<String> },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// No bearer token was available when the operation started.
    #[error("token not found, please log in again")]
    MissingToken,
}

fn http_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(msg) => format!("HTTP {status}: {msg}"),
        None => format!("HTTP {status}"),
    }
}

impl ApiError {
    /// Status code for `Http` failures, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A local precondition that was not met. No request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationSkip {
    #[error("name must not be blank")]
    BlankName,

    #[error("no todo with id {0} in the current list")]
    UnknownId(i64),

    #[error("not editing any todo")]
    NotEditing,

    #[error("username is required")]
    BlankUsername,

    #[error("username must be at least {min} characters")]
    UsernameTooShort { min: usize },

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("passwords do not match")]
    PasswordMismatch,
}

/// Errors surfaced by `TodoSession` operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationSkip),

    #[error(transparent)]
    Api(#[from] ApiError),
}

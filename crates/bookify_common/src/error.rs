// --- File: crates/bookify_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// Generic message used when neither the transport nor the server told us anything useful.
pub const GENERIC_CONNECTION_ERROR: &str = "Connection or server error.";

/// The base error type for all Bookify errors.
///
/// Crate-local error enums convert into this via `From`, so view-models and the
/// binary only ever deal with one normalized type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookifyError {
    /// No response reached us (DNS, connect, timeout, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a structured failure.
    #[error("{message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// A payload could not be decoded into the expected record.
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// Data was decoded but violates an invariant.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable client-side storage (token file) failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A booking was submitted before date, slot or event type were known.
    #[error("Incomplete booking, missing: {0}")]
    IncompleteBooking(String),

    /// A booking submission is already pending for this form.
    #[error("A booking submission is already in progress")]
    SubmissionInProgress,

    /// A superseded async result arrived and was dropped. Never shown to users.
    #[error("Stale result discarded")]
    StaleResultDiscarded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookifyError {
    /// HTTP status carried by the error, if the server produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BookifyError::Api { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Message suitable for inline display.
    pub fn user_message(&self) -> String {
        match self {
            BookifyError::Api { message, .. } => message.clone(),
            BookifyError::Network(_) => GENERIC_CONNECTION_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, BookifyError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, BookifyError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, BookifyError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| BookifyError::Internal(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, BookifyError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| BookifyError::Internal(format!("{}: {}", f(), error)))
    }
}

// Common error conversions
impl From<reqwest::Error> for BookifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BookifyError::Parse(err.to_string())
        } else {
            BookifyError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BookifyError {
    fn from(err: serde_json::Error) -> Self {
        BookifyError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for BookifyError {
    fn from(err: std::io::Error) -> Self {
        BookifyError::Storage(err.to_string())
    }
}

// Utility functions for error handling
pub fn api_error<T: fmt::Display>(status: Option<u16>, message: T) -> BookifyError {
    BookifyError::Api {
        status,
        message: message.to_string(),
    }
}

pub fn config_error<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::Config(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::Validation(message.to_string())
}

pub fn internal_error<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_display_the_server_message() {
        let err = api_error(Some(400), "Email already registered");
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn unauthorized_detection_covers_401_and_403() {
        assert!(api_error(Some(401), "expired").is_unauthorized());
        assert!(api_error(Some(403), "forbidden").is_unauthorized());
        assert!(!api_error(Some(404), "missing").is_unauthorized());
        assert!(!BookifyError::Network("refused".into()).is_unauthorized());
    }

    #[test]
    fn network_errors_show_generic_message_to_users() {
        let err = BookifyError::Network("tcp connect error".into());
        assert_eq!(err.user_message(), GENERIC_CONNECTION_ERROR);
    }

    #[test]
    fn context_wraps_foreign_errors() {
        let res: Result<(), std::fmt::Error> = Err(std::fmt::Error);
        let err = res.context("rendering summary").unwrap_err();
        assert!(matches!(err, BookifyError::Internal(msg) if msg.starts_with("rendering summary")));
    }
}

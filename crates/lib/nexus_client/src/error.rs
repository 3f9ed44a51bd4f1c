//! Client error types.

use nexus_core::models::health::EntryId;
use nexus_core::validation::FieldError;
use thiserror::Error;

/// Failure of a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// No response reached us (connect failure, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// 401/403: the credential is missing, expired or invalid.
    #[error("Unauthorized: {detail}")]
    Unauthorized { status: u16, detail: String },

    #[error("Not found: {detail}")]
    NotFound { detail: String },

    /// Any other non-2xx status.
    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// The body was not valid JSON or did not have the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl HttpError {
    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Unauthorized { status, .. } | HttpError::Server { status, .. } => {
                Some(*status)
            }
            HttpError::NotFound { .. } => Some(404),
            HttpError::Network(_) | HttpError::Decode(_) => None,
        }
    }

    /// Server-supplied `detail`, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            HttpError::Unauthorized { detail, .. }
            | HttpError::NotFound { detail }
            | HttpError::Server { detail, .. } => Some(detail.as_str()),
            HttpError::Network(_) | HttpError::Decode(_) => None,
        }
    }

    /// Whether this error must end the session.
    pub fn is_auth(&self) -> bool {
        matches!(self, HttpError::Unauthorized { .. })
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Login / registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected locally, before any request was made.
    #[error("Validation error: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The server refused the registration (e.g. email already taken).
    #[error("Registration rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Errors from record list and insight view operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Rejected locally, before any request was made.
    #[error("Validation error: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// The entry is not in the current list.
    #[error("Unknown entry: {0}")]
    UnknownEntry(EntryId),

    /// The session was revoked while the request was in flight; the
    /// response was dropped.
    #[error("Session ended")]
    SessionEnded,

    #[error(transparent)]
    Http(#[from] HttpError),
}

impl RecordError {
    pub fn is_auth(&self) -> bool {
        matches!(self, RecordError::Http(e) if e.is_auth())
    }
}

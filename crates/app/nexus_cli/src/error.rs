use nexus_client::{AuthError, HttpError, RecordError};
use nexus_core::validation::FieldError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("Invalid API URL: {}", .0)]
    Url(#[from] url::ParseError),

    #[error("{}", .0)]
    Auth(#[from] AuthError),

    #[error("{}", .0)]
    Record(#[from] RecordError),

    #[error("{}", .0)]
    Http(#[from] HttpError),

    #[error("Validation error")]
    Validation(Vec<FieldError>),
}

impl Error {
    /// Per-field messages when the failure was a local validation.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Error::Validation(errors)
            | Error::Auth(AuthError::Validation(errors))
            | Error::Record(RecordError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}

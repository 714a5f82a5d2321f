//! Failure taxonomy of the ingestion pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("message has no usable recipient address")]
    NoRecipient,

    #[error("no account registered for {0}")]
    UnknownRecipient(String),

    #[error("object store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("failed to persist message: {0}")]
    PersistFailure(#[from] sqlx::Error),

    #[error("{0} timed out")]
    TransientIOTimeout(String),
}

impl IngestError {
    /// Whether the source object must stay in place so the next run picks it up again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::MalformedMessage(_)
                | IngestError::StorageUnavailable(_)
                | IngestError::PersistFailure(_)
                | IngestError::TransientIOTimeout(_)
        )
    }

    /// Recipient failures drop the source object for good.
    pub fn is_undeliverable(&self) -> bool {
        matches!(
            self,
            IngestError::NoRecipient | IngestError::UnknownRecipient(_)
        )
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

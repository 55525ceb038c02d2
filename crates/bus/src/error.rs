use domain::MalformedInput;
use thiserror::Error;

/// Errors raised by a record source.
///
/// Every variant is treated as an unrecoverable disconnection by the
/// pipeline.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The bus reported the stream as gone.
    #[error("source '{source_name}' disconnected: {reason}")]
    Disconnected { source_name: String, reason: String },

    /// Reading from the underlying transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source only supports one subscriber.
    #[error("source '{0}' is already subscribed")]
    AlreadySubscribed(String),
}

/// Errors raised by a delta sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// A recoverable condition (timeout, temporary unavailability).
    #[error("transient publish failure: {0}")]
    Transient(String),

    /// The sink refused the publication for good.
    #[error("publication rejected: {0}")]
    Rejected(String),
}

impl PublishError {
    /// Returns true if the publication may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient(_))
    }
}

/// Errors raised while decoding an inbound record.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not a JSON order/shipment.
    #[error("unparsable record: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but failed validation.
    #[error("malformed record: {0}")]
    Malformed(#[from] MalformedInput),
}

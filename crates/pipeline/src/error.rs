//! Pipeline error types.

use common::ProductId;
use domain::StreamKind;
use thiserror::Error;

/// Fatal pipeline failures. Malformed records are not errors at this level;
/// they are counted and skipped by the workers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source stream signalled unrecoverable disconnection.
    #[error("{stream} source '{source_name}' disconnected: {reason}")]
    SourceDisconnected {
        stream: StreamKind,
        source_name: String,
        reason: String,
    },

    /// A delta could not be delivered to the sink.
    #[error("failed to deliver {product}:{value:+} after {attempts} attempt(s): {reason}")]
    Delivery {
        product: ProductId,
        value: i64,
        attempts: u32,
        reason: String,
    },

    /// A pipeline task panicked or was aborted.
    #[error("pipeline task failed: {0}")]
    Join(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

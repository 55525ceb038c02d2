use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{SourceError, SourceRecord};

/// A stream of inbound records.
///
/// An `Err` item means the source is gone for good; the end of the stream
/// means it was closed in an orderly way.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<SourceRecord, SourceError>> + Send>>;

/// An inbound event stream delivered by the bus.
///
/// Records must be yielded in the order the bus delivered them.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Name of the stream (topic) for logs and metrics.
    fn name(&self) -> &str;

    /// Opens the record stream.
    async fn subscribe(&self) -> Result<RecordStream, SourceError>;
}

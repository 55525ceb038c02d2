//! Message-bus seams for the reserved-stock pipeline.
//!
//! The bus itself is an external collaborator. This crate defines the shape
//! the pipeline needs from it:
//! - [`RecordSource`]: an ordered stream of keyed inbound records
//! - [`DeltaSink`]: keyed publication of signed deltas
//!
//! plus the record codec and two families of adapters: in-memory (tests,
//! benches) and JSON lines over any tokio reader/writer.

pub mod codec;
pub mod error;
pub mod lines;
pub mod memory;
pub mod record;
pub mod sink;
pub mod source;

pub use codec::{OutboundRecord, decode_record};
pub use error::{CodecError, PublishError, SourceError};
pub use lines::{JsonLinesSink, JsonLinesSource};
pub use memory::{InMemorySink, InMemorySource, SourceHandle};
pub use record::SourceRecord;
pub use sink::{DeltaSink, DeltaSinkExt};
pub use source::{RecordSource, RecordStream};

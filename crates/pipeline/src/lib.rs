//! The reserved-stock pipeline.
//!
//! Two [`SourceWorker`]s (orders, shipments) decode and expand inbound
//! records and feed their own channel. A single [`ReservationCombiner`]
//! fans both channels in, signs each pair and publishes it to the sink.
//! [`ReservationPipeline`] wires the three tasks together and owns
//! shutdown and failure propagation.

pub mod combiner;
pub mod config;
pub mod error;
pub mod retry;
pub mod shutdown;
pub mod stats;
pub mod supervisor;
pub mod worker;

pub use combiner::ReservationCombiner;
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use retry::RetryPolicy;
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use stats::{PipelineStats, StatsSnapshot};
pub use supervisor::ReservationPipeline;
pub use worker::{ExpandedLine, SourceWorker};

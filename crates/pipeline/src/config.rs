//! Tunables of the pipeline core.

use crate::retry::RetryPolicy;

/// Default capacity of each worker → combiner channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of each worker → combiner channel. A full channel applies
    /// backpressure to the worker, which then stops pulling records.
    pub channel_buffer: usize,
    /// Retry policy for transient publish failures.
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_channel_buffer(mut self, channel_buffer: usize) -> Self {
        self.channel_buffer = channel_buffer.max(1);
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
            retry: RetryPolicy::default(),
        }
    }
}

//! In-memory source and sink for tests and benchmarks.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, RecordKey};
use domain::ReservationDelta;
use futures_util::stream;
use tokio::sync::{Mutex, RwLock, mpsc};

use crate::{DeltaSink, PublishError, RecordSource, RecordStream, SourceError, SourceRecord};

type Item = Result<SourceRecord, SourceError>;

/// Producer side of an [`InMemorySource`].
///
/// Dropping the handle closes the stream in an orderly way.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    name: String,
    tx: mpsc::UnboundedSender<Item>,
}

impl SourceHandle {
    /// Delivers a record. Returns false once the subscriber is gone.
    pub fn push(&self, record: SourceRecord) -> bool {
        self.tx.send(Ok(record)).is_ok()
    }

    /// Delivers `value` serialized as JSON under `key`.
    pub fn push_json<T: serde::Serialize>(
        &self,
        key: impl Into<RecordKey>,
        value: &T,
    ) -> serde_json::Result<bool> {
        Ok(self.push(SourceRecord::json(key, value)?))
    }

    /// Delivers a raw payload under `key`.
    pub fn push_raw(&self, key: impl Into<RecordKey>, payload: impl Into<Vec<u8>>) -> bool {
        self.push(SourceRecord::new(key, payload))
    }

    /// Signals an unrecoverable disconnection to the subscriber.
    pub fn disconnect(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(SourceError::Disconnected {
            source_name: self.name.clone(),
            reason: reason.into(),
        }));
    }
}

/// Channel-backed record source supporting a single subscriber.
#[derive(Debug)]
pub struct InMemorySource {
    name: String,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Item>>>,
}

impl InMemorySource {
    /// Creates a source and the handle that feeds it.
    pub fn channel(name: impl Into<String>) -> (SourceHandle, Self) {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SourceHandle {
            name: name.clone(),
            tx,
        };
        let source = Self {
            name,
            rx: Mutex::new(Some(rx)),
        };
        (handle, source)
    }

    /// Creates a source that yields `records` and then closes.
    pub fn from_records(
        name: impl Into<String>,
        records: impl IntoIterator<Item = SourceRecord>,
    ) -> Self {
        let (handle, source) = Self::channel(name);
        for record in records {
            handle.push(record);
        }
        source
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe(&self) -> Result<RecordStream, SourceError> {
        let rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| SourceError::AlreadySubscribed(self.name.clone()))?;

        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    published: Vec<ReservationDelta>,
    attempts: u64,
    scripted_failures: VecDeque<PublishError>,
    reject_all: Option<String>,
}

/// Recording sink with failure injection.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    state: Arc<RwLock<InMemorySinkState>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next publish attempt fail with `error`. Calls queue up.
    pub async fn fail_next(&self, error: PublishError) {
        self.state.write().await.scripted_failures.push_back(error);
    }

    /// Makes every publish attempt fail with [`PublishError::Rejected`].
    pub async fn set_reject_all(&self, reason: Option<String>) {
        self.state.write().await.reject_all = reason;
    }

    /// Deltas accepted so far, in publication order.
    pub async fn published(&self) -> Vec<ReservationDelta> {
        self.state.read().await.published.clone()
    }

    pub async fn published_count(&self) -> usize {
        self.state.read().await.published.len()
    }

    /// Number of publish calls, successful or not.
    pub async fn attempts(&self) -> u64 {
        self.state.read().await.attempts
    }

    /// Sum of all accepted deltas for `product`.
    pub async fn net_quantity(&self, product: &ProductId) -> i64 {
        self.state
            .read()
            .await
            .published
            .iter()
            .filter(|d| &d.product == product)
            .map(|d| d.quantity)
            .sum()
    }
}

#[async_trait]
impl DeltaSink for InMemorySink {
    async fn publish(&self, key: &ProductId, value: i64) -> Result<(), PublishError> {
        let mut state = self.state.write().await;
        state.attempts += 1;

        if let Some(reason) = &state.reject_all {
            return Err(PublishError::Rejected(reason.clone()));
        }
        if let Some(error) = state.scripted_failures.pop_front() {
            return Err(error);
        }

        state
            .published
            .push(ReservationDelta::new(key.clone(), value));
        Ok(())
    }
}

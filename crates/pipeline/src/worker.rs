//! Source worker: pulls records from one stream, expands them and feeds the
//! combiner.

use std::sync::Arc;

use bus::{RecordSource, decode_record};
use common::ProductId;
use domain::{Quantity, StreamKind};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::shutdown::ShutdownSignal;
use crate::stats::PipelineStats;
use crate::{PipelineError, Result};

/// One expanded (product, quantity) pair, not yet signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedLine {
    pub product: ProductId,
    pub quantity: Quantity,
}

/// Consumes one source stream on its own task.
///
/// Records are handled strictly in the order the source yields them.
/// Malformed records are counted and skipped. A source error ends the
/// worker with [`PipelineError::SourceDisconnected`].
pub struct SourceWorker {
    kind: StreamKind,
    source: Arc<dyn RecordSource>,
    lines_tx: mpsc::Sender<ExpandedLine>,
    shutdown: ShutdownSignal,
    stats: Arc<PipelineStats>,
}

impl SourceWorker {
    pub fn new(
        kind: StreamKind,
        source: Arc<dyn RecordSource>,
        lines_tx: mpsc::Sender<ExpandedLine>,
        shutdown: ShutdownSignal,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            kind,
            source,
            lines_tx,
            shutdown,
            stats,
        }
    }

    /// Runs until the source closes, shutdown is requested, the combiner
    /// goes away, or the source disconnects.
    ///
    /// After shutdown is observed no further record is pulled. A record that
    /// was already pulled is forwarded completely.
    #[tracing::instrument(skip(self), fields(stream = %self.kind, source = %self.source.name()))]
    pub async fn run(self) -> Result<()> {
        let Self {
            kind,
            source,
            lines_tx,
            mut shutdown,
            stats,
        } = self;

        let disconnected = |reason: String| PipelineError::SourceDisconnected {
            stream: kind,
            source_name: source.name().to_string(),
            reason,
        };

        let mut records = source
            .subscribe()
            .await
            .map_err(|e| disconnected(e.to_string()))?;
        info!("source worker started");

        loop {
            let next = tokio::select! {
                biased;

                _ = shutdown.wait() => {
                    info!("source worker received shutdown signal");
                    break;
                }

                next = records.next() => next,
            };

            let record = match next {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    warn!(error = %e, "source disconnected");
                    return Err(disconnected(e.to_string()));
                }
                None => {
                    info!("source closed");
                    break;
                }
            };

            stats.record_received(kind);

            let stock = match decode_record(kind, &record) {
                Ok(stock) => stock,
                Err(e) => {
                    stats.record_rejected(kind);
                    warn!(key = %record.key, error = %e, "rejected malformed record");
                    continue;
                }
            };

            debug!(
                key = %record.key,
                id = stock.id(),
                line_items = stock.line_items().len(),
                "expanding record"
            );

            let total = stock.line_items().len();
            for (sent, (product, quantity)) in stock.expand().enumerate() {
                if lines_tx
                    .send(ExpandedLine { product, quantity })
                    .await
                    .is_err()
                {
                    let abandoned = (total - sent) as u64;
                    stats.deltas_undelivered(kind, abandoned);
                    warn!(key = %record.key, abandoned, "combiner stopped, source worker exiting");
                    return Ok(());
                }
            }
        }

        info!("source worker stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::{InMemorySource, SourceRecord};
    use crate::shutdown::ShutdownTrigger;

    fn order(key: &str, lines: &[(&str, i64)]) -> SourceRecord {
        let items: Vec<_> = lines
            .iter()
            .map(|(p, q)| serde_json::json!({"product": p, "quantity": q}))
            .collect();
        SourceRecord::json(key, &serde_json::json!({"id": key, "lineItems": items})).unwrap()
    }

    fn worker(
        source: InMemorySource,
        trigger: &ShutdownTrigger,
        buffer: usize,
    ) -> (SourceWorker, mpsc::Receiver<ExpandedLine>, Arc<PipelineStats>) {
        let (tx, rx) = mpsc::channel(buffer);
        let stats = Arc::new(PipelineStats::new());
        let worker = SourceWorker::new(
            StreamKind::Order,
            Arc::new(source),
            tx,
            trigger.signal(),
            stats.clone(),
        );
        (worker, rx, stats)
    }

    async fn drain(rx: &mut mpsc::Receiver<ExpandedLine>) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        while let Some(line) = rx.recv().await {
            out.push((line.product.to_string(), line.quantity.get()));
        }
        out
    }

    #[tokio::test]
    async fn forwards_lines_in_source_order() {
        let source = InMemorySource::from_records(
            "orders",
            vec![
                order("O1", &[("A", 3), ("B", 1)]),
                order("O2", &[("C", 7)]),
            ],
        );
        let trigger = ShutdownTrigger::new();
        let (worker, mut rx, stats) = worker(source, &trigger, 16);

        worker.run().await.unwrap();

        assert_eq!(
            drain(&mut rx).await,
            vec![("A".into(), 3), ("B".into(), 1), ("C".into(), 7)]
        );
        assert_eq!(stats.snapshot().orders_received, 2);
    }

    #[tokio::test]
    async fn skips_malformed_records_and_continues() {
        let source = InMemorySource::from_records(
            "orders",
            vec![
                order("O1", &[("A", 0)]),
                SourceRecord::new("O2", "{broken"),
                order("O3", &[("A", 1), ("B", -1)]),
                order("O4", &[("B", 2)]),
            ],
        );
        let trigger = ShutdownTrigger::new();
        let (worker, mut rx, stats) = worker(source, &trigger, 16);

        worker.run().await.unwrap();

        assert_eq!(drain(&mut rx).await, vec![("B".into(), 2)]);
        let snap = stats.snapshot();
        assert_eq!(snap.orders_received, 4);
        assert_eq!(snap.orders_rejected, 3);
    }

    #[tokio::test]
    async fn disconnect_is_fatal() {
        let (handle, source) = InMemorySource::channel("orders");
        handle.push(order("O1", &[("A", 1)]));
        handle.disconnect("partition lost");

        let trigger = ShutdownTrigger::new();
        let (worker, mut rx, _stats) = worker(source, &trigger, 16);

        let err = worker.run().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SourceDisconnected { stream: StreamKind::Order, ref reason, .. }
                if reason.contains("partition lost")
        ));
        assert_eq!(drain(&mut rx).await, vec![("A".into(), 1)]);
    }

    #[tokio::test]
    async fn stops_pulling_after_shutdown() {
        let (handle, source) = InMemorySource::channel("orders");
        let trigger = ShutdownTrigger::new();
        let (worker, mut rx, stats) = worker(source, &trigger, 16);

        let task = tokio::spawn(worker.run());
        handle.push(order("O1", &[("A", 1)]));
        assert_eq!(rx.recv().await.map(|l| l.quantity.get()), Some(1));

        trigger.trigger();
        task.await.unwrap().unwrap();

        handle.push(order("O2", &[("B", 1)]));
        assert!(rx.recv().await.is_none());
        assert_eq!(stats.snapshot().orders_received, 1);
    }

    #[tokio::test]
    async fn exits_quietly_when_combiner_is_gone() {
        let source = InMemorySource::from_records("orders", vec![order("O1", &[("A", 1)])]);
        let trigger = ShutdownTrigger::new();
        let (worker, rx, stats) = worker(source, &trigger, 1);
        drop(rx);

        assert!(worker.run().await.is_ok());
        assert_eq!(stats.snapshot().reservations_undelivered, 1);
    }

    #[tokio::test]
    async fn counts_the_rest_of_a_record_it_cannot_hand_over() {
        let source =
            InMemorySource::from_records("orders", vec![order("O1", &[("A", 1), ("B", 2), ("C", 3)])]);
        let trigger = ShutdownTrigger::new();
        let (worker, mut rx, stats) = worker(source, &trigger, 1);

        let task = tokio::spawn(worker.run());
        assert_eq!(rx.recv().await.map(|l| l.quantity.get()), Some(1));
        rx.close();
        let leftover = drain(&mut rx).await.len() as u64;

        task.await.unwrap().unwrap();
        assert_eq!(stats.snapshot().reservations_undelivered + leftover, 2);
    }
}

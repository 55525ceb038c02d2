//! Reservation combiner: fan-in of the order and shipment lines.

use std::sync::Arc;
use std::time::Instant;

use bus::{DeltaSink, DeltaSinkExt};
use domain::{ReservationDelta, StreamKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::retry::RetryPolicy;
use crate::stats::PipelineStats;
use crate::worker::ExpandedLine;
use crate::{PipelineError, Result};

/// Merges the two expanded line streams into one stream of signed deltas.
///
/// This is a structural merge: every line becomes exactly one delta, with
/// no buffering, summing or deduplication. Whichever channel has a line
/// ready first is served first, so lines from the same source keep their
/// order while the two sources interleave freely.
///
/// The combiner has no shutdown input of its own. It runs until both
/// channels are closed, which happens once both workers have stopped, so
/// every line a worker handed over gets a delivery attempt. After a fatal
/// delivery error it closes both channels and accounts for every pair still
/// queued as undelivered before returning the error.
pub struct ReservationCombiner {
    orders_rx: mpsc::Receiver<ExpandedLine>,
    shipments_rx: mpsc::Receiver<ExpandedLine>,
    sink: Arc<dyn DeltaSink>,
    retry: RetryPolicy,
    stats: Arc<PipelineStats>,
}

impl ReservationCombiner {
    pub fn new(
        orders_rx: mpsc::Receiver<ExpandedLine>,
        shipments_rx: mpsc::Receiver<ExpandedLine>,
        sink: Arc<dyn DeltaSink>,
        retry: RetryPolicy,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            orders_rx,
            shipments_rx,
            sink,
            retry,
            stats,
        }
    }

    /// Runs until both input channels are closed and drained.
    ///
    /// Returns the number of deltas published, or the first delivery
    /// failure.
    #[tracing::instrument(skip(self))]
    pub async fn run(mut self) -> Result<u64> {
        let mut orders_open = true;
        let mut shipments_open = true;
        let mut published: u64 = 0;

        info!("combiner started");

        while orders_open || shipments_open {
            let (kind, line) = tokio::select! {
                line = self.orders_rx.recv(), if orders_open => match line {
                    Some(line) => (StreamKind::Order, line),
                    None => {
                        debug!("order lines closed");
                        orders_open = false;
                        continue;
                    }
                },

                line = self.shipments_rx.recv(), if shipments_open => match line {
                    Some(line) => (StreamKind::Shipment, line),
                    None => {
                        debug!("shipment lines closed");
                        shipments_open = false;
                        continue;
                    }
                },

                else => break,
            };

            let delta = ReservationDelta::from_line(kind, line.product, line.quantity);
            if let Err(e) = self.deliver(kind, &delta).await {
                self.stats.deltas_undelivered(kind, 1);
                self.abandon_queued().await;
                return Err(e);
            }
            published += 1;
        }

        info!(published, "combiner stopped");
        Ok(published)
    }

    /// Closes both channels and counts the pairs left in them.
    ///
    /// Once closed, workers can no longer hand over pairs; they account for
    /// their own leftovers.
    async fn abandon_queued(&mut self) {
        self.orders_rx.close();
        self.shipments_rx.close();

        let mut orders: u64 = 0;
        while self.orders_rx.recv().await.is_some() {
            orders += 1;
        }
        let mut shipments: u64 = 0;
        while self.shipments_rx.recv().await.is_some() {
            shipments += 1;
        }

        self.stats.deltas_undelivered(StreamKind::Order, orders);
        self.stats.deltas_undelivered(StreamKind::Shipment, shipments);
        if orders + shipments > 0 {
            error!(orders, shipments, "abandoned queued pairs after delivery failure");
        }
    }

    /// Publishes one delta, retrying transient failures per the policy.
    async fn deliver(&self, kind: StreamKind, delta: &ReservationDelta) -> Result<()> {
        let mut attempt: u32 = 1;

        loop {
            let started = Instant::now();
            let result = self.sink.publish_delta(delta).await;
            metrics::histogram!("reserved_stock_publish_duration_seconds")
                .record(started.elapsed().as_secs_f64());

            match result {
                Ok(()) => {
                    self.stats.delta_published(kind);
                    debug!(stream = %kind, %delta, attempt, "delta published");
                    return Ok(());
                }
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.backoff(attempt);
                    self.stats.publish_retried();
                    warn!(
                        %delta,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(%delta, attempt, error = %e, "publish failed permanently");
                    return Err(PipelineError::Delivery {
                        product: delta.product.clone(),
                        value: delta.quantity,
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

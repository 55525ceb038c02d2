//! Pipeline supervisor: wires the workers and the combiner, owns shutdown.

use std::sync::Arc;

use bus::{DeltaSink, RecordSource};
use domain::StreamKind;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::combiner::ReservationCombiner;
use crate::config::PipelineConfig;
use crate::shutdown::{ShutdownSignal, ShutdownTrigger};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::worker::SourceWorker;
use crate::{PipelineError, Result};

#[derive(Debug, Clone, Copy)]
enum Task {
    Worker(StreamKind),
    Combiner,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Worker(kind) => write!(f, "{kind} worker"),
            Task::Combiner => f.write_str("combiner"),
        }
    }
}

/// The full orders + shipments → reserved-stock pipeline.
///
/// Built from live source and sink handles; [`run`](Self::run) spawns one
/// worker per source plus the combiner and supervises them:
/// - external shutdown stops the workers; the combiner drains what they
///   already handed over
/// - the first fatal error (source disconnect, delivery failure) stops the
///   whole pipeline and is returned
pub struct ReservationPipeline {
    orders: Arc<dyn RecordSource>,
    shipments: Arc<dyn RecordSource>,
    sink: Arc<dyn DeltaSink>,
    config: PipelineConfig,
    stats: Arc<PipelineStats>,
}

impl ReservationPipeline {
    pub fn new(
        orders: impl RecordSource + 'static,
        shipments: impl RecordSource + 'static,
        sink: impl DeltaSink + 'static,
        config: PipelineConfig,
    ) -> Self {
        Self {
            orders: Arc::new(orders),
            shipments: Arc::new(shipments),
            sink: Arc::new(sink),
            config,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Shared counters, live while the pipeline runs.
    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    /// Runs until both sources close, `shutdown` fires, or a fatal error
    /// occurs.
    #[tracing::instrument(skip_all, fields(orders = %self.orders.name(), shipments = %self.shipments.name()))]
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<StatsSnapshot> {
        let buffer = self.config.channel_buffer.max(1);
        let (orders_tx, orders_rx) = mpsc::channel(buffer);
        let (shipments_tx, shipments_rx) = mpsc::channel(buffer);

        let stop_workers = ShutdownTrigger::new();
        let mut tasks: JoinSet<(Task, Result<()>)> = JoinSet::new();

        for (kind, source, tx) in [
            (StreamKind::Order, self.orders.clone(), orders_tx),
            (StreamKind::Shipment, self.shipments.clone(), shipments_tx),
        ] {
            let worker =
                SourceWorker::new(kind, source, tx, stop_workers.signal(), self.stats.clone());
            tasks.spawn(async move { (Task::Worker(kind), worker.run().await) });
        }

        let combiner = ReservationCombiner::new(
            orders_rx,
            shipments_rx,
            self.sink.clone(),
            self.config.retry,
            self.stats.clone(),
        );
        tasks.spawn(async move { (Task::Combiner, combiner.run().await.map(|_| ())) });

        info!("reservation pipeline started");

        let mut first_error: Option<PipelineError> = None;
        let mut shutdown_seen = false;

        loop {
            tokio::select! {
                _ = shutdown.wait(), if !shutdown_seen => {
                    info!("shutdown requested, draining in-flight lines");
                    shutdown_seen = true;
                    stop_workers.trigger();
                }

                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((task, Ok(())))) => debug!(%task, "task finished"),
                    Some(Ok((task, Err(e)))) => {
                        error!(%task, error = %e, "pipeline task failed, stopping pipeline");
                        stop_workers.trigger();
                        first_error.get_or_insert(e);
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "pipeline task aborted, stopping pipeline");
                        stop_workers.trigger();
                        first_error.get_or_insert(PipelineError::Join(e.to_string()));
                    }
                },
            }
        }

        let snapshot = self.stats.snapshot();
        match first_error {
            Some(e) => Err(e),
            None => {
                info!(stats = %snapshot, "reservation pipeline stopped");
                Ok(snapshot)
            }
        }
    }

    /// Runs until both sources close or a fatal error occurs.
    pub async fn run_to_completion(self) -> Result<StatsSnapshot> {
        let never = ShutdownTrigger::new();
        self.run(never.signal()).await
    }
}

//! Pipeline counters.
//!
//! Every update is mirrored to the `metrics` facade; the atomics back
//! [`PipelineStats::snapshot`] for tests and the shutdown log.

use std::sync::atomic::{AtomicU64, Ordering};

use domain::StreamKind;

#[derive(Debug, Default)]
struct StreamCounters {
    received: AtomicU64,
    rejected: AtomicU64,
    published: AtomicU64,
    undelivered: AtomicU64,
}

/// Shared counters updated by the workers and the combiner.
#[derive(Debug, Default)]
pub struct PipelineStats {
    orders: StreamCounters,
    shipments: StreamCounters,
    publish_retries: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, kind: StreamKind) -> &StreamCounters {
        match kind {
            StreamKind::Order => &self.orders,
            StreamKind::Shipment => &self.shipments,
        }
    }

    pub(crate) fn record_received(&self, kind: StreamKind) {
        self.counters(kind).received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reserved_stock_records_received_total", "stream" => kind.as_str())
            .increment(1);
    }

    pub(crate) fn record_rejected(&self, kind: StreamKind) {
        self.counters(kind).rejected.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reserved_stock_records_rejected_total", "stream" => kind.as_str())
            .increment(1);
    }

    pub(crate) fn delta_published(&self, kind: StreamKind) {
        self.counters(kind).published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reserved_stock_deltas_published_total", "stream" => kind.as_str())
            .increment(1);
    }

    /// Records `count` accepted pairs that were abandoned without being
    /// published, after a fatal delivery error.
    pub(crate) fn deltas_undelivered(&self, kind: StreamKind, count: u64) {
        if count == 0 {
            return;
        }
        self.counters(kind)
            .undelivered
            .fetch_add(count, Ordering::Relaxed);
        metrics::counter!("reserved_stock_deltas_undelivered_total", "stream" => kind.as_str())
            .increment(count);
    }

    pub(crate) fn publish_retried(&self) {
        self.publish_retries.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reserved_stock_publish_retries_total").increment(1);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            orders_received: load(&self.orders.received),
            orders_rejected: load(&self.orders.rejected),
            shipments_received: load(&self.shipments.received),
            shipments_rejected: load(&self.shipments.rejected),
            reservations_published: load(&self.orders.published),
            releases_published: load(&self.shipments.published),
            reservations_undelivered: load(&self.orders.undelivered),
            releases_undelivered: load(&self.shipments.undelivered),
            publish_retries: load(&self.publish_retries),
        }
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub orders_received: u64,
    pub orders_rejected: u64,
    pub shipments_received: u64,
    pub shipments_rejected: u64,
    /// Positive deltas published (one per order line item).
    pub reservations_published: u64,
    /// Negative deltas published (one per shipment line item).
    pub releases_published: u64,
    /// Accepted order pairs abandoned after a fatal delivery error.
    pub reservations_undelivered: u64,
    /// Accepted shipment pairs abandoned after a fatal delivery error.
    pub releases_undelivered: u64,
    pub publish_retries: u64,
}

impl StatsSnapshot {
    pub fn deltas_published(&self) -> u64 {
        self.reservations_published + self.releases_published
    }

    pub fn records_rejected(&self) -> u64 {
        self.orders_rejected + self.shipments_rejected
    }

    pub fn deltas_undelivered(&self) -> u64 {
        self.reservations_undelivered + self.releases_undelivered
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "orders {}/{} rejected, shipments {}/{} rejected, deltas +{} -{}, retries {}, undelivered {}",
            self.orders_rejected,
            self.orders_received,
            self.shipments_rejected,
            self.shipments_received,
            self.reservations_published,
            self.releases_published,
            self.publish_retries,
            self.deltas_undelivered()
        )
    }
}

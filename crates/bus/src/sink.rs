use async_trait::async_trait;
use common::ProductId;
use domain::ReservationDelta;

use crate::PublishError;

/// Keyed publication of signed deltas.
///
/// `Ok` means the publication is durably queued for delivery. Callers await
/// each publish before handing over the next delta.
#[async_trait]
pub trait DeltaSink: Send + Sync {
    /// Publishes `value` under `key`.
    async fn publish(&self, key: &ProductId, value: i64) -> Result<(), PublishError>;
}

/// Extension trait providing convenience methods for sinks.
#[async_trait]
pub trait DeltaSinkExt: DeltaSink {
    /// Publishes a delta keyed by its product.
    async fn publish_delta(&self, delta: &ReservationDelta) -> Result<(), PublishError> {
        self.publish(&delta.product, delta.quantity).await
    }
}

impl<T: DeltaSink + ?Sized> DeltaSinkExt for T {}

//! The signed per-product change emitted for each consumed line item.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::stock::value_objects::{Quantity, StreamKind};

/// A signed per-product quantity change.
///
/// Positive deltas come from orders (stock reserved), negative deltas from
/// shipments (stock released). Deltas are independent; summing them is left
/// to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationDelta {
    pub product: ProductId,
    pub quantity: i64,
}

impl ReservationDelta {
    pub fn new(product: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product: product.into(),
            quantity,
        }
    }

    /// Builds the delta for one expanded line item read from `kind`.
    pub fn from_line(kind: StreamKind, product: ProductId, quantity: Quantity) -> Self {
        Self {
            product,
            quantity: quantity.signed(kind),
        }
    }

    pub fn is_reservation(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_release(&self) -> bool {
        self.quantity < 0
    }
}

impl std::fmt::Display for ReservationDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:+}", self.product, self.quantity)
    }
}

//! Domain error types.

use thiserror::Error;

/// Reasons an inbound record is rejected during validation.
///
/// `index` is the zero-based position of the offending line item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInput {
    /// The line item has no product, or a blank SKU.
    #[error("line item {index} has no product")]
    MissingProduct { index: usize },

    /// The line item has no quantity.
    #[error("line item {index} has no quantity")]
    MissingQuantity { index: usize },

    /// Quantity is zero or negative.
    #[error("line item {index} has invalid quantity {quantity} (must be greater than 0)")]
    NonPositiveQuantity { index: usize, quantity: i64 },

    /// Quantity does not fit the supported range.
    #[error("line item {index} has quantity {quantity} out of range (max {max})")]
    QuantityOutOfRange { index: usize, quantity: i64, max: u32 },
}

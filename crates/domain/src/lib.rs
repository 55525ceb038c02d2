//! Domain layer for the reserved-stock pipeline.
//!
//! This crate provides:
//! - Wire shapes of inbound order and shipment records
//! - Validated [`StockRecord`]s made of [`LineItem`]s
//! - The line-item expander ([`expand`])
//! - [`ReservationDelta`], the signed unit emitted per line item

pub mod error;
pub mod stock;

pub use common::{ProductId, RecordKey};
pub use error::MalformedInput;
pub use stock::{
    LineItem, Quantity, ReservationDelta, StockRecord, StreamKind, WireLineItem, WireRecord, expand,
};

//! Order/shipment records and the line-item expander.

mod delta;
mod expander;
mod record;
mod value_objects;

pub use delta::ReservationDelta;
pub use expander::expand;
pub use record::{StockRecord, WireLineItem, WireRecord};
pub use value_objects::{LineItem, Quantity, StreamKind};

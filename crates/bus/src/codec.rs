//! JSON codec for inbound records and outbound deltas.

use domain::{ReservationDelta, StockRecord, StreamKind, WireRecord};
use serde::{Deserialize, Serialize};

use crate::{CodecError, SourceRecord};

/// Decodes and validates an inbound record read from the `kind` stream.
pub fn decode_record(kind: StreamKind, record: &SourceRecord) -> Result<StockRecord, CodecError> {
    let wire: WireRecord = serde_json::from_slice(&record.payload)?;
    Ok(StockRecord::from_wire(kind, &record.key, wire)?)
}

/// Outbound record: key is the product SKU, value the signed quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRecord {
    pub key: String,
    pub value: i64,
}

impl From<&ReservationDelta> for OutboundRecord {
    fn from(delta: &ReservationDelta) -> Self {
        Self {
            key: delta.product.as_str().to_string(),
            value: delta.quantity,
        }
    }
}

impl From<OutboundRecord> for ReservationDelta {
    fn from(record: OutboundRecord) -> Self {
        ReservationDelta::new(record.key, record.value)
    }
}

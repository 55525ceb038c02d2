//! Inbound record envelope.

use common::RecordKey;

/// A keyed inbound record as delivered by the bus, payload still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub key: RecordKey,
    pub payload: Vec<u8>,
}

impl SourceRecord {
    pub fn new(key: impl Into<RecordKey>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
        }
    }

    /// Serializes `value` as the JSON payload of a new record.
    pub fn json<T: serde::Serialize>(
        key: impl Into<RecordKey>,
        value: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            key: key.into(),
            payload: serde_json::to_vec(value)?,
        })
    }
}

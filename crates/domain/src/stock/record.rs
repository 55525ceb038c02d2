//! Inbound record shapes and the validated [`StockRecord`].

use common::{ProductId, RecordKey};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::MalformedInput;
use crate::stock::expander;
use crate::stock::value_objects::{LineItem, Quantity, StreamKind};

/// A line item as it appears on the wire, before validation.
///
/// `product` is either a bare SKU string or a product object carrying a
/// `sku` (or `id`) field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLineItem {
    #[serde(default, deserialize_with = "product_ref")]
    pub product: Option<ProductId>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProductRef {
    Sku(ProductId),
    Object {
        #[serde(alias = "id")]
        sku: ProductId,
    },
}

fn product_ref<'de, D>(deserializer: D) -> Result<Option<ProductId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ProductRef>::deserialize(deserializer)?.map(|product| match product {
        ProductRef::Sku(sku) | ProductRef::Object { sku } => sku,
    }))
}

/// An order or shipment as it appears on the wire, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "orderEntries")]
    pub line_items: Vec<WireLineItem>,
}

/// A validated order or shipment.
///
/// Only constructed through [`StockRecord::from_wire`] or
/// [`StockRecord::new`], so every line item is known to be well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    kind: StreamKind,
    id: String,
    line_items: Vec<LineItem>,
}

impl StockRecord {
    pub fn new(kind: StreamKind, id: impl Into<String>, line_items: Vec<LineItem>) -> Self {
        Self {
            kind,
            id: id.into(),
            line_items,
        }
    }

    /// Validates a wire record read under `key` from the `kind` stream.
    ///
    /// The record is rejected as a whole if any line item is malformed. The
    /// payload `id` wins over the record key when both are present.
    pub fn from_wire(
        kind: StreamKind,
        key: &RecordKey,
        wire: WireRecord,
    ) -> Result<Self, MalformedInput> {
        let line_items = wire
            .line_items
            .into_iter()
            .enumerate()
            .map(|(index, item)| LineItem::from_wire(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind,
            id: wire.id.unwrap_or_else(|| key.as_str().to_string()),
            line_items,
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Expands this record into one (product, quantity) pair per line item.
    pub fn expand(&self) -> impl Iterator<Item = (ProductId, Quantity)> + '_ {
        expander::expand(self)
    }
}

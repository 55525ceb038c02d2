//! Value objects for stock records.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::MalformedInput;
use crate::stock::record::WireLineItem;

/// The stream a record was read from.
///
/// Orders reserve stock, shipments release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Order,
    Shipment,
}

impl StreamKind {
    /// Sign applied to line-item quantities from this stream.
    pub fn sign(&self) -> i64 {
        match self {
            StreamKind::Order => 1,
            StreamKind::Shipment => -1,
        }
    }

    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Order => "order",
            StreamKind::Shipment => "shipment",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strictly positive line-item quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Returns `None` for zero.
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Applies the sign of `kind`.
    pub fn signed(&self, kind: StreamKind) -> i64 {
        kind.sign() * i64::from(self.0)
    }

    fn from_wire(index: usize, value: Option<i64>) -> Result<Self, MalformedInput> {
        let quantity = value.ok_or(MalformedInput::MissingQuantity { index })?;
        if quantity <= 0 {
            return Err(MalformedInput::NonPositiveQuantity { index, quantity });
        }
        u32::try_from(quantity)
            .ok()
            .and_then(Self::new)
            .ok_or(MalformedInput::QuantityOutOfRange {
                index,
                quantity,
                max: u32::MAX,
            })
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated (product, quantity) commitment within an order or shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub product: ProductId,
    pub quantity: Quantity,
}

impl LineItem {
    /// Creates a line item from already valid parts.
    pub fn new(product: impl Into<ProductId>, quantity: Quantity) -> Self {
        Self {
            product: product.into(),
            quantity,
        }
    }

    /// Validates the wire line item found at `index` within its record.
    pub fn from_wire(index: usize, wire: WireLineItem) -> Result<Self, MalformedInput> {
        let product = wire
            .product
            .filter(|p| !p.is_blank())
            .ok_or(MalformedInput::MissingProduct { index })?;
        let quantity = Quantity::from_wire(index, wire.quantity)?;
        Ok(Self { product, quantity })
    }
}

impl TryFrom<WireLineItem> for LineItem {
    type Error = MalformedInput;

    fn try_from(wire: WireLineItem) -> Result<Self, Self::Error> {
        Self::from_wire(0, wire)
    }
}

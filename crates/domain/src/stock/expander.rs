//! Line-item expander.

use common::ProductId;

use crate::stock::record::StockRecord;
use crate::stock::value_objects::Quantity;

/// Expands a record into one (product, quantity) pair per line item.
///
/// The iterator is lazy and follows line-item order. Validation already
/// happened when the [`StockRecord`] was built, so a malformed record can
/// never be partially expanded. The sign is not applied here; see
/// [`ReservationDelta::from_line`](crate::ReservationDelta::from_line).
pub fn expand(record: &StockRecord) -> impl Iterator<Item = (ProductId, Quantity)> + '_ {
    record
        .line_items()
        .iter()
        .map(|item| (item.product.clone(), item.quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LineItem, StreamKind};

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn order_o1() -> StockRecord {
        StockRecord::new(
            StreamKind::Order,
            "O1",
            vec![
                LineItem::new("ProductA", qty(3)),
                LineItem::new("ProductB", qty(1)),
            ],
        )
    }

    #[test]
    fn expands_one_pair_per_line_item() {
        let pairs: Vec<_> = expand(&order_o1()).collect();
        assert_eq!(
            pairs,
            vec![
                (ProductId::new("ProductA"), qty(3)),
                (ProductId::new("ProductB"), qty(1)),
            ]
        );
    }

    #[test]
    fn repeated_products_are_not_merged() {
        let record = StockRecord::new(
            StreamKind::Shipment,
            "S1",
            vec![
                LineItem::new("ProductA", qty(2)),
                LineItem::new("ProductA", qty(5)),
            ],
        );
        assert_eq!(expand(&record).count(), 2);
    }

    #[test]
    fn empty_record_expands_to_nothing() {
        let record = StockRecord::new(StreamKind::Order, "O0", vec![]);
        assert_eq!(expand(&record).next(), None);
    }

    #[test]
    fn expansion_is_repeatable() {
        let record = order_o1();
        let first: Vec<_> = record.expand().collect();
        let second: Vec<_> = record.expand().collect();
        assert_eq!(first, second);
    }
}

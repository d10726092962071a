//! # Stock Arithmetic
//!
//! Pure helpers behind the stock ledger: applying an action to a stock
//! level, folding duplicate order lines into per-product demand, and the
//! per-product difference between two versions of an order's lines.

use std::collections::HashMap;

use crate::types::{OrderLine, StockAction};

/// Stock after applying `action`, or `None` when a reduction would go
/// below zero.
///
/// ```rust
/// use tarpal_core::stock::next_stock;
/// use tarpal_core::StockAction;
///
/// assert_eq!(next_stock(10, StockAction::Add, 5), Some(15));
/// assert_eq!(next_stock(10, StockAction::Reduce, 10), Some(0));
/// assert_eq!(next_stock(10, StockAction::Reduce, 20), None);
/// ```
pub fn next_stock(previous: i64, action: StockAction, quantity: i64) -> Option<i64> {
    match action {
        StockAction::Add => previous.checked_add(quantity),
        StockAction::Reduce if previous >= quantity => Some(previous - quantity),
        StockAction::Reduce => None,
    }
}

/// Total quantity per product, in the order products first appear.
///
/// Two lines for the same product must be checked against stock as one
/// demand, otherwise each could pass alone while the sum oversells.
pub fn aggregate_demand(lines: &[OrderLine]) -> Vec<(String, i64)> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for line in lines {
        let entry = totals.entry(line.product_id.as_str()).or_insert_with(|| {
            order.push(line.product_id.clone());
            0
        });
        *entry += line.quantity;
    }
    order
        .into_iter()
        .map(|id| {
            let qty = totals.get(id.as_str()).copied().unwrap_or_default();
            (id, qty)
        })
        .collect()
}

/// Signed per-product change from `old` lines to `new` lines.
///
/// Positive means more units are now ordered (stock must go down),
/// negative means units were removed (stock goes back up). Products with
/// no change are omitted.
pub fn quantity_deltas(old: &[OrderLine], new: &[OrderLine]) -> Vec<(String, i64)> {
    let old_demand: HashMap<String, i64> = aggregate_demand(old).into_iter().collect();
    let new_demand = aggregate_demand(new);

    let mut deltas: Vec<(String, i64)> = new_demand
        .iter()
        .map(|(id, qty)| (id.clone(), qty - old_demand.get(id).copied().unwrap_or(0)))
        .collect();

    for (id, qty) in aggregate_demand(old) {
        if !new_demand.iter().any(|(n, _)| *n == id) {
            deltas.push((id, -qty));
        }
    }

    deltas.retain(|(_, delta)| *delta != 0);
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_stock() {
        assert_eq!(next_stock(0, StockAction::Add, 3), Some(3));
        assert_eq!(next_stock(3, StockAction::Reduce, 4), None);
        assert_eq!(next_stock(i64::MAX, StockAction::Add, 1), None);
    }

    #[test]
    fn test_aggregate_demand_merges_duplicates() {
        let lines = vec![
            OrderLine::new("a", 2),
            OrderLine::new("b", 1),
            OrderLine::new("a", 3),
        ];
        assert_eq!(
            aggregate_demand(&lines),
            vec![("a".to_string(), 5), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_quantity_deltas() {
        let old = vec![OrderLine::new("a", 2), OrderLine::new("b", 4)];
        let new = vec![
            OrderLine::new("a", 5),
            OrderLine::new("c", 1),
            OrderLine::new("b", 4),
        ];
        assert_eq!(
            quantity_deltas(&old, &new),
            vec![("a".to_string(), 3), ("c".to_string(), 1)]
        );

        let removed = quantity_deltas(&old, &[OrderLine::new("a", 1)]);
        assert_eq!(
            removed,
            vec![("a".to_string(), -1), ("b".to_string(), -4)]
        );
    }
}

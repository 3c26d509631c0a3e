//! Order pricing. All amounts are integers in minor currency units, so the
//! arithmetic is exact.

use crate::entities::order_item;

/// Result of pricing an order's line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub total_amount: i64,
}

/// Computes an order's totals from `(unit_price, quantity)` pairs.
///
/// Pure function with no side effects. The order lifecycle manager re-invokes
/// it on every persistence of an order; stored or client-supplied totals are
/// never trusted. An empty sequence prices to a zero subtotal; rejecting
/// zero-item orders is the caller's job.
pub fn compute_totals<I>(items: I, shipping_fee: i64) -> OrderTotals
where
    I: IntoIterator<Item = (i64, i32)>,
{
    let subtotal: i64 = items
        .into_iter()
        .map(|(unit_price, quantity)| unit_price * i64::from(quantity))
        .sum();

    OrderTotals {
        subtotal,
        total_amount: subtotal + shipping_fee,
    }
}

/// Prices persisted line items.
pub fn totals_for_items(items: &[order_item::Model], shipping_fee: i64) -> OrderTotals {
    compute_totals(
        items.iter().map(|item| (item.unit_price, item.quantity)),
        shipping_fee,
    )
}

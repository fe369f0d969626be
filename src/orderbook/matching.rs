//! Price-time priority matching algorithm.
//!
//! The matcher walks the resting side opposite the aggressor from best price
//! outward, filling FIFO within each price level, until the aggressor is
//! exhausted or no crossing price remains. Every execution prints at the
//! *resting* order's price (price improvement always favors the maker).

use crate::order::{Order, Side};
use crate::orderbook::book::OrderBook;
use crate::trade::Trade;

/// Outcome of submitting one aggressor order to [`match_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Trades generated, in execution order.
    pub trades: Vec<Trade>,
    /// The aggressor order after all fills (may still have remaining quantity).
    pub aggressor: Order,
    /// Every resting order whose state changed, post-fill, in the order they
    /// were touched. Includes orders fully filled and removed from the book.
    pub touched_resting: Vec<Order>,
}

/// Returns `true` if `aggressor_price` crosses `resting_price` for a
/// resting order on `resting_side`.
fn crosses(aggressor_side: Side, aggressor_price: crate::price::Price, resting_price: crate::price::Price) -> bool {
    match aggressor_side {
        Side::Buy => aggressor_price >= resting_price,
        Side::Sell => aggressor_price <= resting_price,
    }
}

/// Matches `aggressor` against the resting side of `book` opposite its own,
/// generating trades and mutating or removing resting orders as they fill.
/// Any unfilled remainder of `aggressor` is left up to the caller to insert
/// as a new resting order.
pub fn match_order(book: &mut OrderBook, mut aggressor: Order, now_ms: u64) -> MatchOutcome {
    let resting_side = aggressor.side.opposite();
    let mut trades = Vec::new();
    let mut touched_resting = Vec::new();

    while aggressor.remaining_quantity > 0 {
        let Some(resting) = book.peek_best(resting_side) else {
            break;
        };
        if !crosses(aggressor.side, aggressor.price, resting.price) {
            break;
        }

        let resting_id = resting.id;
        let resting_price = resting.price;
        let fill_qty = aggressor.remaining_quantity.min(resting.remaining_quantity);

        aggressor.apply_fill(fill_qty, resting_price, now_ms);
        let resting_order = book
            .get_mut(resting_id)
            .expect("resting order peeked above must still be indexed");
        resting_order.apply_fill(fill_qty, resting_price, now_ms);
        let resting_filled = resting_order.remaining_quantity == 0;

        let (bid_order_id, ask_order_id) = match aggressor.side {
            Side::Buy => (aggressor.id, resting_id),
            Side::Sell => (resting_id, aggressor.id),
        };
        trades.push(Trade::new(resting_price, fill_qty, bid_order_id, ask_order_id, now_ms));

        if resting_filled {
            touched_resting.push(book.advance_best(resting_side).expect("just peeked"));
        } else {
            touched_resting.push(resting_order.clone());
        }
    }

    MatchOutcome {
        trades,
        aggressor,
        touched_resting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderId, UserId};
    use crate::price::Price;
    use uuid::Uuid;

    fn mk(side: Side, price_hundredths: u64, qty: u64) -> Order {
        Order::new(
            OrderId::new(),
            side,
            Price::from_hundredths(price_hundredths).unwrap(),
            qty,
            UserId(Uuid::nil()),
            0,
        )
    }

    #[test]
    fn non_crossing_aggressor_rests_untouched() {
        let mut book = OrderBook::new();
        book.insert(mk(Side::Sell, 10_100, 5)).unwrap();
        let aggressor = mk(Side::Buy, 10_000, 5);
        let outcome = match_order(&mut book, aggressor, 1);
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.aggressor.remaining_quantity, 5);
    }

    #[test]
    fn crossing_aggressor_fills_at_resting_price() {
        let mut book = OrderBook::new();
        book.insert(mk(Side::Sell, 10_000, 5)).unwrap();
        let aggressor = mk(Side::Buy, 10_050, 5);
        let outcome = match_order(&mut book, aggressor, 1);
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price.as_hundredths(), 10_000);
        assert_eq!(outcome.trades[0].quantity, 5);
        assert_eq!(outcome.aggressor.remaining_quantity, 0);
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn partial_fill_walks_multiple_levels_fifo() {
        let mut book = OrderBook::new();
        book.insert(mk(Side::Sell, 10_000, 3)).unwrap();
        book.insert(mk(Side::Sell, 10_010, 3)).unwrap();
        let aggressor = mk(Side::Buy, 10_020, 5);
        let outcome = match_order(&mut book, aggressor, 1);
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].price.as_hundredths(), 10_000);
        assert_eq!(outcome.trades[0].quantity, 3);
        assert_eq!(outcome.trades[1].price.as_hundredths(), 10_010);
        assert_eq!(outcome.trades[1].quantity, 2);
        assert_eq!(outcome.aggressor.remaining_quantity, 0);
        let remaining = book.peek_best(Side::Sell).unwrap();
        assert_eq!(remaining.remaining_quantity, 1);
    }

    #[test]
    fn fifo_priority_within_level_fills_earliest_first() {
        let mut book = OrderBook::new();
        let first = mk(Side::Sell, 10_000, 2);
        let first_id = first.id;
        book.insert(first).unwrap();
        book.insert(mk(Side::Sell, 10_000, 2)).unwrap();
        let aggressor = mk(Side::Buy, 10_000, 2);
        let outcome = match_order(&mut book, aggressor, 1);
        assert_eq!(outcome.trades[0].ask_order_id, first_id);
    }
}

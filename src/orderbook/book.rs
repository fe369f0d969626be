//! The in-memory price-level index: the `OrderBook` itself.
//!
//! `OrderBook` is a pure data structure with no I/O. It is owned exclusively
//! by the `Engine`'s single writer task (see `crate::engine`); every method
//! here is non-blocking and runs to completion synchronously.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::order::{Order, OrderId, Side};
use crate::orderbook::error::OrderBookError;
use crate::price::Price;

/// One aggregated price level as reported by [`OrderBook::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelView {
    /// The price of this level.
    pub price: Price,
    /// Sum of remaining quantity across every order resting at this price.
    pub total_quantity: u64,
    /// Number of resting orders at this price.
    pub order_count: usize,
}

/// A depth-limited view of both sides of the book at one logical instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSnapshot {
    /// Bid levels, best (highest price) first.
    pub bids: Vec<LevelView>,
    /// Ask levels, best (lowest price) first.
    pub asks: Vec<LevelView>,
}

/// The central limit order book for a single instrument.
///
/// Bids and asks are each kept as an ordered map from price to a FIFO queue
/// of order ids resting at that price. `BTreeMap` gives O(1) access to the
/// best price (the last key for bids, the first for asks) without having to
/// separately track and invalidate a cached extreme.
#[derive(Debug, Default, Clone)]
pub struct OrderBook {
    bids: BTreeMap<Price, VecDeque<OrderId>>,
    asks: BTreeMap<Price, VecDeque<OrderId>>,
    orders: HashMap<OrderId, Order>,
}

impl OrderBook {
    /// Creates an empty order book.
    pub fn new() -> Self {
        Self::default()
    }

    fn side_levels(&self, side: Side) -> &BTreeMap<Price, VecDeque<OrderId>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_levels_mut(&mut self, side: Side) -> &mut BTreeMap<Price, VecDeque<OrderId>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Best bid price, the maximum key of the bid side, or `None` if empty.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.last_key_value().map(|(p, _)| *p)
    }

    /// Best ask price, the minimum key of the ask side, or `None` if empty.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first_key_value().map(|(p, _)| *p)
    }

    /// Looks up a resting order by id, regardless of side.
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// Looks up a resting order by id for mutation (used by the matcher).
    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    /// True iff no orders rest on either side.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Inserts a resting order at the tail of its price level's FIFO queue.
    ///
    /// # Errors
    /// Returns [`OrderBookError::ZeroQuantity`] if `order.remaining_quantity == 0`,
    /// or [`OrderBookError::DuplicateOrder`] if `order.id` is already indexed.
    pub fn insert(&mut self, order: Order) -> Result<(), OrderBookError> {
        if order.remaining_quantity == 0 {
            return Err(OrderBookError::ZeroQuantity(order.id));
        }
        if self.orders.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrder(order.id));
        }
        let side = order.side;
        let price = order.price;
        let id = order.id;
        self.orders.insert(id, order);
        self.side_levels_mut(side).entry(price).or_default().push_back(id);
        Ok(())
    }

    /// Removes an order from the book by id, wherever it sits in its level's
    /// queue. Returns the removed order, or `None` if the id is unknown.
    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&id)?;
        let levels = self.side_levels_mut(order.side);
        if let Some(queue) = levels.get_mut(&order.price) {
            queue.retain(|queued_id| *queued_id != id);
            if queue.is_empty() {
                levels.remove(&order.price);
            }
        }
        Some(order)
    }

    /// Returns the order at the head of the best-price queue for `side`, if any.
    pub fn peek_best(&self, side: Side) -> Option<&Order> {
        let levels = self.side_levels(side);
        let (_, queue) = match side {
            Side::Buy => levels.last_key_value(),
            Side::Sell => levels.first_key_value(),
        }?;
        let id = *queue.front()?;
        self.orders.get(&id)
    }

    /// Pops the order at the head of the best-price queue for `side` out of
    /// the book entirely (used once a resting order is fully filled).
    /// Removes the price level if it becomes empty. Returns the popped order.
    pub fn advance_best(&mut self, side: Side) -> Option<Order> {
        let levels = self.side_levels_mut(side);
        let best_price = match side {
            Side::Buy => *levels.last_key_value()?.0,
            Side::Sell => *levels.first_key_value()?.0,
        };
        let queue = levels.get_mut(&best_price)?;
        let id = queue.pop_front()?;
        if queue.is_empty() {
            levels.remove(&best_price);
        }
        self.orders.remove(&id)
    }

    /// Produces a depth-limited, aggregated view of both sides.
    ///
    /// `depth` is clamped to at least 1; callers are expected to validate the
    /// `1..=20` range from §6 before calling this.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let depth = depth.max(1);
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, queue)| self.aggregate_level(*price, queue))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, queue)| self.aggregate_level(*price, queue))
            .collect();
        BookSnapshot { bids, asks }
    }

    fn aggregate_level(&self, price: Price, queue: &VecDeque<OrderId>) -> LevelView {
        let mut total_quantity = 0u64;
        for id in queue {
            if let Some(order) = self.orders.get(id) {
                total_quantity += order.remaining_quantity;
            }
        }
        LevelView {
            price,
            total_quantity,
            order_count: queue.len(),
        }
    }

    /// True iff best_bid < best_ask (or one side is empty); a crossed book is
    /// always a bug in the matcher, never a legal state.
    pub fn is_non_crossing(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid < ask,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::UserId;
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
    fn insert_updates_best_of_book() {
        let mut book = OrderBook::new();
        book.insert(mk(Side::Buy, 10_000, 5)).unwrap();
        assert_eq!(book.best_bid().unwrap().as_hundredths(), 10_000);
        book.insert(mk(Side::Buy, 10_050, 5)).unwrap();
        assert_eq!(book.best_bid().unwrap().as_hundredths(), 10_050);
    }

    #[test]
    fn remove_unknown_returns_none() {
        let mut book = OrderBook::new();
        assert!(book.remove(OrderId::new()).is_none());
    }

    #[test]
    fn remove_empties_level_and_recomputes_best() {
        let mut book = OrderBook::new();
        let a = mk(Side::Sell, 10_000, 5);
        let id_a = a.id;
        book.insert(a).unwrap();
        book.insert(mk(Side::Sell, 10_050, 5)).unwrap();
        assert_eq!(book.best_ask().unwrap().as_hundredths(), 10_000);
        book.remove(id_a).unwrap();
        assert_eq!(book.best_ask().unwrap().as_hundredths(), 10_050);
    }

    #[test]
    fn fifo_order_within_level() {
        let mut book = OrderBook::new();
        let first = mk(Side::Sell, 10_000, 2);
        let second = mk(Side::Sell, 10_000, 2);
        let first_id = first.id;
        book.insert(first).unwrap();
        book.insert(second).unwrap();
        assert_eq!(book.peek_best(Side::Sell).unwrap().id, first_id);
    }

    #[test]
    fn advance_best_pops_head_and_cleans_up_empty_level() {
        let mut book = OrderBook::new();
        book.insert(mk(Side::Sell, 10_000, 2)).unwrap();
        let popped = book.advance_best(Side::Sell).unwrap();
        assert_eq!(popped.price.as_hundredths(), 10_000);
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn snapshot_aggregates_quantity_and_count() {
        let mut book = OrderBook::new();
        book.insert(mk(Side::Buy, 10_000, 3)).unwrap();
        book.insert(mk(Side::Buy, 10_000, 4)).unwrap();
        book.insert(mk(Side::Buy, 9_950, 1)).unwrap();
        let snap = book.snapshot(1);
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.bids[0].price.as_hundredths(), 10_000);
        assert_eq!(snap.bids[0].total_quantity, 7);
        assert_eq!(snap.bids[0].order_count, 2);
    }

    #[test]
    fn non_crossing_check() {
        let mut book = OrderBook::new();
        book.insert(mk(Side::Buy, 10_000, 3)).unwrap();
        book.insert(mk(Side::Sell, 10_050, 3)).unwrap();
        assert!(book.is_non_crossing());
    }
}

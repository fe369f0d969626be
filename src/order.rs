//! Order domain type and its lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::price::Price;

/// Maximum order quantity accepted by the book.
pub const MAX_QUANTITY: u64 = 1_000_000;

/// Process-unique identifier for an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    /// Generates a fresh, random order id.
    pub fn new() -> Self {
        OrderId(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for the user who owns an order. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The side of the book an order rests on, or the direction it aggresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A buy order.
    Buy,
    /// A sell order.
    Sell,
}

impl Side {
    /// The opposite side: `Buy` matches against `Sell` resting orders and vice versa.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Lifecycle status of an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Resting, untouched by any fill.
    Active,
    /// Resting or not, with some but not all quantity traded.
    PartiallyFilled,
    /// Fully traded; a terminal state.
    Filled,
    /// Cancelled before being fully traded; a terminal state.
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses can never be mutated again (modified, cancelled, or matched).
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Active => "ACTIVE",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// A resting or historical limit order.
///
/// Invariants (enforced by the mutating methods below, never by callers
/// reaching into the fields directly from outside this crate):
/// - `quantity == remaining_quantity + traded_quantity`
/// - `status` always agrees with the remaining/traded split (see [`OrderStatus`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for this order.
    pub id: OrderId,
    /// Buy or sell.
    pub side: Side,
    /// Limit price.
    pub price: Price,
    /// Original quantity requested.
    pub quantity: u64,
    /// Quantity still unfilled.
    pub remaining_quantity: u64,
    /// Quantity filled so far.
    pub traded_quantity: u64,
    /// Running numerator of the VWAP, in (price-hundredths * quantity) units.
    /// Dividing by `traded_quantity` yields the VWAP in hundredths.
    vwap_numerator: u128,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Owning user.
    pub user_id: UserId,
    /// Creation timestamp, milliseconds since the Unix epoch. Also used as
    /// the order's time-priority key within a price level.
    pub created_at: u64,
    /// Last-mutation timestamp, milliseconds since the Unix epoch.
    pub updated_at: u64,
}

impl Order {
    /// Creates a new ACTIVE order with `remaining_quantity == quantity` and no fills.
    pub fn new(
        id: OrderId,
        side: Side,
        price: Price,
        quantity: u64,
        user_id: UserId,
        now_ms: u64,
    ) -> Self {
        Order {
            id,
            side,
            price,
            quantity,
            remaining_quantity: quantity,
            traded_quantity: 0,
            vwap_numerator: 0,
            status: OrderStatus::Active,
            user_id,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// True iff the order is resting-eligible: active status and unfilled quantity remains.
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::Active | OrderStatus::PartiallyFilled)
    }

    /// Volume-weighted average traded price, in hundredths. Zero if nothing has traded.
    pub fn vwap_hundredths(&self) -> u64 {
        if self.traded_quantity == 0 {
            0
        } else {
            (self.vwap_numerator / self.traded_quantity as u128) as u64
        }
    }

    /// Applies a single fill of `qty` at `price` to this order, updating
    /// remaining/traded quantities, VWAP and status.
    ///
    /// # Panics
    /// Panics if `qty` exceeds `remaining_quantity`; the matcher must never
    /// request more than what is available.
    pub fn apply_fill(&mut self, qty: u64, price: Price, now_ms: u64) {
        assert!(
            qty <= self.remaining_quantity,
            "fill quantity {qty} exceeds remaining {0}",
            self.remaining_quantity
        );
        self.remaining_quantity -= qty;
        self.traded_quantity += qty;
        self.vwap_numerator += price.as_hundredths() as u128 * qty as u128;
        self.status = if self.remaining_quantity == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = now_ms;
    }

    /// Marks the order cancelled: remaining quantity is zeroed (logically
    /// withdrawn) and status becomes terminal.
    pub fn cancel(&mut self, now_ms: u64) {
        self.remaining_quantity = 0;
        self.status = OrderStatus::Cancelled;
        self.updated_at = now_ms;
    }

    /// Re-prices the order and resets its time priority to `now_ms`, per the
    /// modify semantics in §4.3 (cancel-from-book + reinsert-at-new-time).
    pub fn reprice(&mut self, new_price: Price, now_ms: u64) {
        self.price = new_price;
        self.created_at = now_ms;
        self.updated_at = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(qty: u64) -> Order {
        Order::new(
            OrderId::new(),
            Side::Buy,
            Price::from_hundredths(10_000).unwrap(),
            qty,
            UserId(Uuid::nil()),
            0,
        )
    }

    #[test]
    fn new_order_is_active_and_unfilled() {
        let o = order(10);
        assert_eq!(o.status, OrderStatus::Active);
        assert!(o.is_active());
        assert_eq!(o.remaining_quantity, 10);
        assert_eq!(o.traded_quantity, 0);
        assert_eq!(o.vwap_hundredths(), 0);
    }

    #[test]
    fn partial_fill_updates_vwap_and_status() {
        let mut o = order(10);
        o.apply_fill(4, Price::from_hundredths(10_000).unwrap(), 1);
        assert_eq!(o.status, OrderStatus::PartiallyFilled);
        assert_eq!(o.remaining_quantity, 6);
        assert_eq!(o.traded_quantity, 4);
        assert_eq!(o.vwap_hundredths(), 10_000);
        assert_eq!(o.quantity, o.remaining_quantity + o.traded_quantity);
    }

    #[test]
    fn full_fill_marks_filled() {
        let mut o = order(10);
        o.apply_fill(10, Price::from_hundredths(10_050).unwrap(), 1);
        assert_eq!(o.status, OrderStatus::Filled);
        assert!(!o.is_active());
        assert_eq!(o.remaining_quantity, 0);
    }

    #[test]
    fn mixed_price_fills_compute_weighted_average() {
        let mut o = order(10);
        o.apply_fill(4, Price::from_hundredths(10_000).unwrap(), 1);
        o.apply_fill(4, Price::from_hundredths(10_050).unwrap(), 2);
        o.apply_fill(2, Price::from_hundredths(10_100).unwrap(), 3);
        // (4*10000 + 4*10050 + 2*10100) / 10 = 10040
        assert_eq!(o.vwap_hundredths(), 10_040);
        assert_eq!(o.status, OrderStatus::Filled);
    }

    #[test]
    fn cancel_zeroes_remaining_and_is_terminal() {
        let mut o = order(10);
        o.cancel(5);
        assert_eq!(o.status, OrderStatus::Cancelled);
        assert!(o.status.is_terminal());
        assert_eq!(o.remaining_quantity, 0);
        assert!(!o.is_active());
    }

    #[test]
    fn reprice_resets_time_priority() {
        let mut o = order(10);
        o.reprice(Price::from_hundredths(9_900).unwrap(), 42);
        assert_eq!(o.created_at, 42);
        assert_eq!(o.price.as_hundredths(), 9_900);
    }
}

//! Trade domain type: the immutable record of one execution.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::OrderId;
use crate::price::Price;

/// Unique identifier for a [`Trade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub Uuid);

impl TradeId {
    /// Generates a fresh, random trade id.
    pub fn new() -> Self {
        TradeId(Uuid::new_v4())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single execution between a resting order and an aggressor.
///
/// Once persisted, only the settlement fields ever change; `price`,
/// `quantity` and the order references are immutable for the trade's life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for this trade.
    pub id: TradeId,
    /// Execution price: always the *resting* order's price (price improvement rule).
    pub price: Price,
    /// Quantity executed. Always positive.
    pub quantity: u64,
    /// The buy-side order involved.
    pub bid_order_id: OrderId,
    /// The sell-side order involved.
    pub ask_order_id: OrderId,
    /// Execution timestamp, milliseconds since the Unix epoch.
    pub executed_at: u64,
    /// Whether this trade has been settled.
    pub is_settled: bool,
    /// Settlement timestamp, if settled.
    pub settled_at: Option<u64>,
}

impl Trade {
    /// Builds a new, unsettled trade record.
    pub fn new(
        price: Price,
        quantity: u64,
        bid_order_id: OrderId,
        ask_order_id: OrderId,
        executed_at: u64,
    ) -> Self {
        Trade {
            id: TradeId::new(),
            price,
            quantity,
            bid_order_id,
            ask_order_id,
            executed_at,
            is_settled: false,
            settled_at: None,
        }
    }

    /// Marks the trade settled at `now_ms`. Returns `false` (no-op) if the
    /// trade was already settled.
    pub fn mark_settled(&mut self, now_ms: u64) -> bool {
        if self.is_settled {
            return false;
        }
        self.is_settled = true;
        self.settled_at = Some(now_ms);
        true
    }
}

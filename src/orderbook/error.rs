//! Order book error types.

use std::fmt;

use crate::order::OrderId;
use crate::price::Price;

/// Errors that can occur within the [`super::book::OrderBook`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OrderBookError {
    /// Attempted to insert an order whose id is already indexed.
    DuplicateOrder(OrderId),
    /// Attempted to insert an order with zero remaining quantity.
    ZeroQuantity(OrderId),
    /// Order not found in the book.
    OrderNotFound(OrderId),
    /// A committed book state would have crossed (best_bid >= best_ask).
    CrossedBook {
        /// Best bid price at the time of the check.
        best_bid: Price,
        /// Best ask price at the time of the check.
        best_ask: Price,
    },
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::DuplicateOrder(id) => write!(f, "order {id} already indexed"),
            OrderBookError::ZeroQuantity(id) => {
                write!(f, "order {id} has zero remaining quantity")
            }
            OrderBookError::OrderNotFound(id) => write!(f, "order {id} not found in book"),
            OrderBookError::CrossedBook { best_bid, best_ask } => write!(
                f,
                "book would cross: best_bid {best_bid} >= best_ask {best_ask}"
            ),
        }
    }
}

impl std::error::Error for OrderBookError {}

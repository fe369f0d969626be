//! The order book: price-level storage and price-time priority matching.

pub mod book;
pub mod error;
pub mod matching;

pub use book::{BookSnapshot, LevelView, OrderBook};
pub use error::OrderBookError;
pub use matching::{match_order, MatchOutcome};

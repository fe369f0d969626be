//! Error taxonomy surfaced by the [`super::Engine`].

use std::fmt;

use crate::orderbook::OrderBookError;
use crate::repository::RepositoryError;

/// Errors a command submitted to the [`super::Engine`] can fail with.
#[derive(Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// Caller-supplied input failed validation (bad price, quantity, depth, ...).
    Validation(String),
    /// The referenced order or trade does not exist.
    NotFound,
    /// The command targets an order/trade whose state forbids it (terminal order, settled trade).
    StateConflict(String),
    /// The command was still queued when its deadline elapsed.
    Timeout,
    /// An unexpected failure: store unavailable, invariant violated at commit.
    Internal(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation error: {msg}"),
            EngineError::NotFound => write!(f, "not found"),
            EngineError::StateConflict(msg) => write!(f, "state conflict: {msg}"),
            EngineError::Timeout => write!(f, "command timed out while queued"),
            EngineError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TradeNotFound => EngineError::NotFound,
            RepositoryError::AlreadySettled => {
                EngineError::StateConflict("trade already settled".to_string())
            }
            RepositoryError::Journal(e) => EngineError::Internal(e.to_string()),
        }
    }
}

impl From<OrderBookError> for EngineError {
    fn from(err: OrderBookError) -> Self {
        EngineError::Internal(format!("order book invariant violated: {err}"))
    }
}

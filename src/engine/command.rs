//! The serial command protocol consumed by the Engine's writer task.

use tokio::sync::oneshot;

use crate::order::{OrderId, OrderStatus, Side, UserId};
use crate::price::Price;
use crate::trade::Trade;

use super::error::EngineError;

/// Result of a successful [`super::Engine::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceResult {
    /// The id assigned to the newly created order.
    pub order_id: OrderId,
    /// The order's status after any immediate matching.
    pub status: OrderStatus,
    /// Trades produced by this command, in execution order.
    pub trades: Vec<Trade>,
}

/// Result of a successful [`super::Engine::modify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifyResult {
    /// The modified order's id.
    pub order_id: OrderId,
    /// The order's new price.
    pub new_price: Price,
    /// The order's status after the modify (and any resulting match).
    pub status: OrderStatus,
}

/// Result of a successful [`super::Engine::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelResult {
    /// The cancelled order's id.
    pub order_id: OrderId,
    /// Always [`OrderStatus::Cancelled`] on success.
    pub status: OrderStatus,
}

/// One command accepted by the writer task, carrying its own reply channel.
pub(super) enum Command {
    /// Create and immediately attempt to match a new order.
    Place {
        /// Owning user.
        user_id: UserId,
        /// Buy or sell.
        side: Side,
        /// Limit price.
        price: Price,
        /// Requested quantity.
        quantity: u64,
        /// Channel the writer replies on.
        reply: oneshot::Sender<Result<PlaceResult, EngineError>>,
    },
    /// Re-price a resting order, resetting its time priority, then re-match.
    Modify {
        /// The order to modify.
        order_id: OrderId,
        /// The order's new limit price.
        new_price: Price,
        /// Channel the writer replies on.
        reply: oneshot::Sender<Result<ModifyResult, EngineError>>,
    },
    /// Withdraw a resting order.
    Cancel {
        /// The order to cancel.
        order_id: OrderId,
        /// Channel the writer replies on.
        reply: oneshot::Sender<Result<CancelResult, EngineError>>,
    },
}

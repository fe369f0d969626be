//! Durable storage of orders and trades.

pub mod error;
pub mod journal;
mod journaled;
mod memory;

pub use error::{JournalError, RepositoryError};
pub use journaled::JournaledRepository;
pub use memory::InMemoryRepository;

use crate::order::{Order, OrderId, OrderStatus, Side, UserId};
use crate::trade::{Trade, TradeId};

/// Page selector: 1-indexed page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-indexed page number.
    pub page: usize,
    /// Maximum items per page.
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination { page: 1, page_size: 20 }
    }
}

/// A single page of query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// The items on this page, in the query's natural order.
    pub items: Vec<T>,
    /// Total number of items matching the filter, across all pages.
    pub total: usize,
    /// The page number this page corresponds to.
    pub page: usize,
    /// The page size used to produce this page.
    pub page_size: usize,
}

/// Filter predicate for [`Repository::query_orders`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Restrict to orders with this status.
    pub status: Option<OrderStatus>,
    /// Restrict to orders on this side.
    pub side: Option<Side>,
    /// Restrict to orders owned by this user.
    pub user_id: Option<UserId>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| s == order.status)
            && self.side.is_none_or(|s| s == order.side)
            && self.user_id.is_none_or(|u| u == order.user_id)
    }
}

/// Filter predicate for [`Repository::query_trades`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeFilter {
    /// Restrict to trades with this settlement state.
    pub is_settled: Option<bool>,
}

impl TradeFilter {
    fn matches(&self, trade: &Trade) -> bool {
        self.is_settled.is_none_or(|s| s == trade.is_settled)
    }
}

/// Durable read/write access to orders and trades.
///
/// Implementations must make `save_order`/`save_trade`/`mark_trade_settled`
/// durable (survive a process restart) before returning `Ok`, and must keep
/// reads consistent with the most recently committed write from the same
/// caller.
pub trait Repository: Send + Sync {
    /// Upserts an order by its id.
    fn save_order(&self, order: Order) -> Result<(), RepositoryError>;

    /// Inserts a new trade. Trade ids are never reused.
    fn save_trade(&self, trade: Trade) -> Result<(), RepositoryError>;

    /// Looks up a single order by id.
    fn get_order(&self, id: OrderId) -> Option<Order>;

    /// Looks up a single trade by id.
    fn get_trade(&self, id: TradeId) -> Option<Trade>;

    /// Returns every order with `is_active() == true`, ordered by
    /// `created_at` ascending (preserving time priority within any one
    /// `(side, price)` group, which is all the Engine's recovery scan needs).
    fn load_active_orders(&self) -> Vec<Order>;

    /// Paginated, filtered listing of orders.
    fn query_orders(&self, filter: OrderFilter, pagination: Pagination) -> Page<Order>;

    /// Paginated, filtered listing of trades.
    fn query_trades(&self, filter: TradeFilter, pagination: Pagination) -> Page<Trade>;

    /// Marks a trade settled at `now_ms`.
    ///
    /// # Errors
    /// Returns [`RepositoryError::TradeNotFound`] if the id is unknown, or
    /// [`RepositoryError::AlreadySettled`] if it was already settled.
    fn mark_trade_settled(&self, trade_id: TradeId, now_ms: u64) -> Result<Trade, RepositoryError>;
}

fn paginate<T: Clone>(mut items: Vec<T>, pagination: Pagination) -> Page<T> {
    let total = items.len();
    let page = pagination.page.max(1);
    let page_size = pagination.page_size.max(1);
    let start = (page - 1).saturating_mul(page_size);
    let page_items = if start >= items.len() {
        Vec::new()
    } else {
        let end = (start + page_size).min(items.len());
        items.drain(start..end).collect()
    };
    Page {
        items: page_items,
        total,
        page,
        page_size,
    }
}

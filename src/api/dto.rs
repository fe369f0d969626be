//! JSON request/response bodies for the command API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::engine::{CancelResult, ModifyResult, PlaceResult};
use crate::order::{Order, OrderId, OrderStatus, Side, UserId};
use crate::price::Price;
use crate::repository::{Page, Pagination};
use crate::trade::{Trade, TradeId};

fn parse_side(raw: &str) -> Result<Side, ApiError> {
    match raw {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        other => Err(ApiError::Validation(format!(
            "side must be \"buy\" or \"sell\", got {other:?}"
        ))),
    }
}

fn parse_price(raw: &str) -> Result<Price, ApiError> {
    Price::parse_decimal(raw).map_err(|e| ApiError::Validation(e.to_string()))
}

fn parse_quantity(raw: u64) -> Result<u64, ApiError> {
    if raw == 0 || raw > crate::order::MAX_QUANTITY {
        return Err(ApiError::Validation(format!(
            "quantity must be in 1..={}",
            crate::order::MAX_QUANTITY
        )));
    }
    Ok(raw)
}

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    /// Owning user.
    pub user_id: Uuid,
    /// `"buy"` or `"sell"`.
    pub side: String,
    /// Limit price, as a decimal string with at most 2 places.
    pub price: String,
    /// Requested quantity, 1..=1,000,000.
    pub quantity: u64,
}

impl PlaceOrderRequest {
    pub(crate) fn parse(self) -> Result<(UserId, Side, Price, u64), ApiError> {
        Ok((
            UserId(self.user_id),
            parse_side(&self.side)?,
            parse_price(&self.price)?,
            parse_quantity(self.quantity)?,
        ))
    }
}

/// Body of `PATCH /orders/:id`.
#[derive(Debug, Deserialize)]
pub struct ModifyOrderRequest {
    /// The order's new limit price.
    pub new_price: String,
}

/// Response for `PlaceOrder`.
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    /// The new order's id.
    pub order_id: Uuid,
    /// Status after any immediate matching.
    pub status: OrderStatus,
    /// Trades produced by this command.
    pub trades: Vec<TradeResponse>,
}

impl From<PlaceResult> for PlaceOrderResponse {
    fn from(result: PlaceResult) -> Self {
        PlaceOrderResponse {
            order_id: result.order_id.0,
            status: result.status,
            trades: result.trades.into_iter().map(TradeResponse::from).collect(),
        }
    }
}

/// Response for `ModifyOrder`.
#[derive(Debug, Serialize)]
pub struct ModifyOrderResponse {
    /// The modified order's id.
    pub order_id: Uuid,
    /// The order's new price.
    pub new_price: String,
    /// Status after the modify (and any resulting match).
    pub status: OrderStatus,
}

impl From<ModifyResult> for ModifyOrderResponse {
    fn from(result: ModifyResult) -> Self {
        ModifyOrderResponse {
            order_id: result.order_id.0,
            new_price: result.new_price.to_decimal_string(),
            status: result.status,
        }
    }
}

/// Response for `CancelOrder`.
#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    /// The cancelled order's id.
    pub order_id: Uuid,
    /// Always `"CANCELLED"` on success.
    pub status: OrderStatus,
}

impl From<CancelResult> for CancelOrderResponse {
    fn from(result: CancelResult) -> Self {
        CancelOrderResponse {
            order_id: result.order_id.0,
            status: result.status,
        }
    }
}

/// Full order record, as returned by `GetOrder`/`ListOrders`.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// The order's id.
    pub order_id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Buy or sell.
    pub side: Side,
    /// Limit price.
    pub price: String,
    /// Original requested quantity.
    pub quantity: u64,
    /// Quantity still unfilled.
    pub remaining_quantity: u64,
    /// Quantity filled so far.
    pub traded_quantity: u64,
    /// Volume-weighted average traded price, or `None` if nothing has traded.
    pub vwap: Option<String>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Creation timestamp, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Last-mutation timestamp, milliseconds since the Unix epoch.
    pub updated_at: u64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let vwap = (order.traded_quantity > 0)
            .then(|| Price::from_hundredths(order.vwap_hundredths()).unwrap().to_decimal_string());
        OrderResponse {
            order_id: order.id.0,
            user_id: order.user_id.0,
            side: order.side,
            price: order.price.to_decimal_string(),
            quantity: order.quantity,
            remaining_quantity: order.remaining_quantity,
            traded_quantity: order.traded_quantity,
            vwap,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Trade record, as returned by `ListTrades`/`SettleTrade` and embedded in `PlaceOrder`.
#[derive(Debug, Serialize)]
pub struct TradeResponse {
    /// The trade's id.
    pub trade_id: Uuid,
    /// Execution price.
    pub price: String,
    /// Quantity executed.
    pub quantity: u64,
    /// The buy-side order involved.
    pub bid_order_id: Uuid,
    /// The sell-side order involved.
    pub ask_order_id: Uuid,
    /// Execution timestamp, milliseconds since the Unix epoch.
    pub executed_at: u64,
    /// Whether this trade has been settled.
    pub is_settled: bool,
    /// Settlement timestamp, if settled.
    pub settled_at: Option<u64>,
}

impl From<Trade> for TradeResponse {
    fn from(trade: Trade) -> Self {
        TradeResponse {
            trade_id: trade.id.0,
            price: trade.price.to_decimal_string(),
            quantity: trade.quantity,
            bid_order_id: trade.bid_order_id.0,
            ask_order_id: trade.ask_order_id.0,
            executed_at: trade.executed_at,
            is_settled: trade.is_settled,
            settled_at: trade.settled_at,
        }
    }
}

/// A page of results, mirroring [`Page`] but with JSON-friendly items.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items matching the filter, across all pages.
    pub total: usize,
    /// The page number this page corresponds to.
    pub page: usize,
    /// The page size used to produce this page.
    pub page_size: usize,
}

impl<T, U: From<T>> From<Page<T>> for PageResponse<U> {
    fn from(page: Page<T>) -> Self {
        PageResponse {
            items: page.items.into_iter().map(U::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

/// Common pagination query params: `?page=1&page_size=20`.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    /// 1-indexed page number; defaults to 1.
    pub page: Option<usize>,
    /// Page size; defaults to 20, capped at 100 per §6.
    pub page_size: Option<usize>,
}

impl PaginationQuery {
    pub(crate) fn into_pagination(self) -> Result<Pagination, ApiError> {
        let page_size = self.page_size.unwrap_or(20);
        if page_size == 0 || page_size > 100 {
            return Err(ApiError::Validation("page_size must be in 1..=100".to_string()));
        }
        Ok(Pagination {
            page: self.page.unwrap_or(1).max(1),
            page_size,
        })
    }
}

/// Query params for `ListOrders`.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Restrict to this status, if set.
    pub status: Option<OrderStatus>,
    /// Restrict to this side, if set.
    pub side: Option<Side>,
    /// Restrict to this owning user, if set.
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    /// Page selector.
    pub pagination: PaginationQuery,
}

/// Query params for `GetSnapshot`.
#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    /// Requested depth, 1..=20.
    pub depth: Option<usize>,
}

/// Path extractor alias so handlers can accept an order id by UUID.
pub(crate) fn order_id(raw: Uuid) -> OrderId {
    OrderId(raw)
}

pub(crate) fn trade_id(raw: Uuid) -> TradeId {
    TradeId(raw)
}

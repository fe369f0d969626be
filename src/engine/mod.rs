//! The serial, single-writer coordinator tying the book, matcher and store together.

mod command;
mod error;

pub use command::{CancelResult, ModifyResult, PlaceResult};
pub use error::EngineError;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, instrument, warn};

use crate::order::{Order, OrderId, Side, UserId, MAX_QUANTITY};
#[cfg(test)]
use crate::order::OrderStatus;
use crate::orderbook::{match_order, OrderBook};
use crate::price::Price;
use crate::repository::{OrderFilter, Page, Pagination, Repository, TradeFilter};
use crate::time::now_ms;
use crate::trade::{Trade, TradeId};

use command::Command;

/// The top-level coordinator: a handle to the single writer task plus direct,
/// lock-free read access to the Repository for queries.
#[derive(Clone)]
pub struct Engine {
    repo: Arc<dyn Repository>,
    tx: mpsc::Sender<Command>,
}

impl Engine {
    /// Recovers the book from `repo` and spawns the dedicated writer task.
    /// Commands enqueued beyond `channel_capacity` block the caller (backpressure).
    pub fn spawn(repo: Arc<dyn Repository>, channel_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let writer_repo = Arc::clone(&repo);
        tokio::spawn(run_writer(writer_repo, rx));
        Engine { repo, tx }
    }

    /// Places a new order, persists it ACTIVE, runs the matcher, and persists
    /// every trade and resting-order mutation the match produced.
    #[instrument(skip(self))]
    pub async fn place(
        &self,
        user_id: UserId,
        side: Side,
        price: Price,
        quantity: u64,
    ) -> Result<PlaceResult, EngineError> {
        if quantity == 0 || quantity > MAX_QUANTITY {
            return Err(EngineError::Validation(format!(
                "quantity must be in 1..={MAX_QUANTITY}"
            )));
        }
        let (reply, reply_rx) = oneshot::channel();
        self.send(Command::Place {
            user_id,
            side,
            price,
            quantity,
            reply,
        })
        .await?;
        await_reply(reply_rx).await
    }

    /// Re-prices a resting order and resets its time priority, then re-matches it.
    #[instrument(skip(self))]
    pub async fn modify(&self, order_id: OrderId, new_price: Price) -> Result<ModifyResult, EngineError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(Command::Modify {
            order_id,
            new_price,
            reply,
        })
        .await?;
        await_reply(reply_rx).await
    }

    /// Withdraws a resting order.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<CancelResult, EngineError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(Command::Cancel { order_id, reply }).await?;
        await_reply(reply_rx).await
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| EngineError::Internal("engine writer task is no longer running".to_string()))
    }

    /// Pure query: fetches a single order by id.
    pub fn get_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.repo.get_order(order_id).ok_or(EngineError::NotFound)
    }

    /// Pure query: fetches a single trade by id.
    pub fn get_trade(&self, trade_id: TradeId) -> Result<Trade, EngineError> {
        self.repo.get_trade(trade_id).ok_or(EngineError::NotFound)
    }

    /// Pure query: paginated, filtered order listing.
    pub fn list_orders(&self, filter: OrderFilter, pagination: Pagination) -> Page<Order> {
        self.repo.query_orders(filter, pagination)
    }

    /// Pure query: paginated, filtered trade listing.
    pub fn list_trades(&self, filter: TradeFilter, pagination: Pagination) -> Page<Trade> {
        self.repo.query_trades(filter, pagination)
    }

    /// Marks a trade settled. Settlement is orthogonal to matching and does
    /// not need to go through the writer's serial queue.
    pub fn settle_trade(&self, trade_id: TradeId) -> Result<Trade, EngineError> {
        self.repo
            .mark_trade_settled(trade_id, now_ms())
            .map_err(EngineError::from)
    }

    /// A handle to the underlying store, for read paths (e.g. the
    /// snapshot service) that don't need to go through the writer.
    pub fn repository(&self) -> Arc<dyn Repository> {
        Arc::clone(&self.repo)
    }
}

async fn await_reply<T>(reply_rx: oneshot::Receiver<Result<T, EngineError>>) -> Result<T, EngineError> {
    reply_rx
        .await
        .map_err(|_| EngineError::Internal("engine writer task dropped the reply channel".to_string()))?
}

/// Maps a book miss during modify/cancel to the correct taxonomy: unknown
/// entirely is NotFound, known-but-terminal is a StateConflict, and
/// known-but-supposedly-active-yet-absent-from-the-book is a bug.
fn classify_book_miss(repo: &Arc<dyn Repository>, order_id: OrderId) -> EngineError {
    match repo.get_order(order_id) {
        None => EngineError::NotFound,
        Some(order) if order.status.is_terminal() => {
            EngineError::StateConflict(format!("order is {}", order.status))
        }
        Some(_) => EngineError::Internal("active order missing from book".to_string()),
    }
}

async fn run_writer(repo: Arc<dyn Repository>, mut rx: mpsc::Receiver<Command>) {
    let mut book = OrderBook::new();
    let mut recovered = repo.load_active_orders();
    recovered.sort_by_key(|o| o.created_at);
    let recovered_count = recovered.len();
    for order in recovered {
        if let Err(e) = book.insert(order) {
            error!(error = %e, "failed to reinsert recovered order into book");
        }
    }
    info!(recovered_count, "engine writer task started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Place {
                user_id,
                side,
                price,
                quantity,
                reply,
            } => {
                let result = handle_place(&repo, &mut book, user_id, side, price, quantity);
                let _ = reply.send(result);
            }
            Command::Modify {
                order_id,
                new_price,
                reply,
            } => {
                let result = handle_modify(&repo, &mut book, order_id, new_price);
                let _ = reply.send(result);
            }
            Command::Cancel { order_id, reply } => {
                let result = handle_cancel(&repo, &mut book, order_id);
                let _ = reply.send(result);
            }
        }
    }
    warn!("engine writer task shutting down: command channel closed");
}

/// Runs a match on a scratch copy of `book` and, only once every effect of
/// the match has been durably committed to `repo`, swaps the scratch copy in
/// as the live book. If any commit fails partway through, `book` is left
/// exactly as it was before this call: no trade or order mutation the match
/// produced is ever visible in the live book without first being persisted.
fn commit_match(
    repo: &Arc<dyn Repository>,
    book: &mut OrderBook,
    order: Order,
    now: u64,
) -> Result<(Order, Vec<Trade>), EngineError> {
    let mut scratch = book.clone();
    let outcome = match_order(&mut scratch, order, now);

    let aggressor = outcome.aggressor;
    if aggressor.remaining_quantity > 0 {
        scratch.insert(aggressor.clone())?;
    }

    persist_match_outcome(repo, &outcome.trades, &outcome.touched_resting)?;
    repo.save_order(aggressor.clone())?;

    *book = scratch;
    Ok((aggressor, outcome.trades))
}

fn handle_place(
    repo: &Arc<dyn Repository>,
    book: &mut OrderBook,
    user_id: UserId,
    side: Side,
    price: Price,
    quantity: u64,
) -> Result<PlaceResult, EngineError> {
    let now = now_ms();
    let order = Order::new(OrderId::new(), side, price, quantity, user_id, now);
    let (aggressor, trades) = commit_match(repo, book, order, now)?;

    Ok(PlaceResult {
        order_id: aggressor.id,
        status: aggressor.status,
        trades,
    })
}

fn handle_modify(
    repo: &Arc<dyn Repository>,
    book: &mut OrderBook,
    order_id: OrderId,
    new_price: Price,
) -> Result<ModifyResult, EngineError> {
    let original = book.remove(order_id).ok_or_else(|| classify_book_miss(repo, order_id))?;
    let now = now_ms();
    let mut repriced = original.clone();
    repriced.reprice(new_price, now);

    match commit_match(repo, book, repriced, now) {
        Ok((aggressor, _trades)) => Ok(ModifyResult {
            order_id: aggressor.id,
            new_price,
            status: aggressor.status,
        }),
        Err(e) => {
            // Nothing about this match was committed; restore the book to
            // exactly its pre-modify state rather than leaving the order
            // absent from the book while still resting (stale) in the repo.
            let _ = book.insert(original);
            Err(e)
        }
    }
}

fn handle_cancel(
    repo: &Arc<dyn Repository>,
    book: &mut OrderBook,
    order_id: OrderId,
) -> Result<CancelResult, EngineError> {
    let original = book.remove(order_id).ok_or_else(|| classify_book_miss(repo, order_id))?;
    let mut cancelled = original.clone();
    cancelled.cancel(now_ms());

    if let Err(e) = repo.save_order(cancelled.clone()) {
        let _ = book.insert(original);
        return Err(e.into());
    }

    Ok(CancelResult {
        order_id: cancelled.id,
        status: cancelled.status,
    })
}

fn persist_match_outcome(
    repo: &Arc<dyn Repository>,
    trades: &[Trade],
    touched_resting: &[Order],
) -> Result<(), EngineError> {
    for trade in trades {
        repo.save_trade(trade.clone())?;
    }
    for resting in touched_resting {
        repo.save_order(resting.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::Price;
    use crate::repository::{InMemoryRepository, OrderFilter, Pagination, RepositoryError, TradeFilter};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use uuid::Uuid;

    fn user() -> UserId {
        UserId(Uuid::new_v4())
    }

    /// Wraps an [`InMemoryRepository`] and fails the Nth call to `save_order`
    /// or `save_trade` (1-indexed across both), to exercise the Engine's
    /// rollback path when a commit fails partway through a match.
    #[derive(Debug)]
    struct FlakyRepository {
        inner: InMemoryRepository,
        fail_on_write: usize,
        writes_seen: AtomicUsize,
    }

    impl FlakyRepository {
        fn new(fail_on_write: usize) -> Self {
            FlakyRepository {
                inner: InMemoryRepository::new(),
                fail_on_write,
                writes_seen: AtomicUsize::new(0),
            }
        }

        fn next_write_should_fail(&self) -> bool {
            self.writes_seen.fetch_add(1, AtomicOrdering::SeqCst) + 1 == self.fail_on_write
        }
    }

    impl Repository for FlakyRepository {
        fn save_order(&self, order: Order) -> Result<(), RepositoryError> {
            if self.next_write_should_fail() {
                return Err(RepositoryError::Journal(crate::repository::JournalError::Io {
                    message: "simulated disk failure".to_string(),
                    path: None,
                }));
            }
            self.inner.save_order(order)
        }

        fn save_trade(&self, trade: Trade) -> Result<(), RepositoryError> {
            if self.next_write_should_fail() {
                return Err(RepositoryError::Journal(crate::repository::JournalError::Io {
                    message: "simulated disk failure".to_string(),
                    path: None,
                }));
            }
            self.inner.save_trade(trade)
        }

        fn get_order(&self, id: OrderId) -> Option<Order> {
            self.inner.get_order(id)
        }

        fn get_trade(&self, id: TradeId) -> Option<Trade> {
            self.inner.get_trade(id)
        }

        fn load_active_orders(&self) -> Vec<Order> {
            self.inner.load_active_orders()
        }

        fn query_orders(&self, filter: OrderFilter, pagination: Pagination) -> Page<Order> {
            self.inner.query_orders(filter, pagination)
        }

        fn query_trades(&self, filter: TradeFilter, pagination: Pagination) -> Page<Trade> {
            self.inner.query_trades(filter, pagination)
        }

        fn mark_trade_settled(&self, trade_id: TradeId, now_ms: u64) -> Result<Trade, RepositoryError> {
            self.inner.mark_trade_settled(trade_id, now_ms)
        }
    }

    #[tokio::test]
    async fn failed_commit_leaves_book_and_repo_unchanged() {
        // The 2nd write across the whole session is the trade save inside
        // the crossing buy's commit; force it to fail.
        let repo: Arc<dyn Repository> = Arc::new(FlakyRepository::new(2));
        let engine = Engine::spawn(Arc::clone(&repo), 16);

        let sell = engine
            .place(user(), Side::Sell, Price::parse_decimal("101.00").unwrap(), 5)
            .await
            .unwrap();

        let err = engine
            .place(user(), Side::Buy, Price::parse_decimal("101.50").unwrap(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));

        // Nothing from the failed match was committed: no trade, and the
        // resting sell order is exactly as it was before the attempt.
        assert!(engine.list_trades(TradeFilter::default(), Pagination::default()).items.is_empty());
        let sell_order = engine.get_order(sell.order_id).unwrap();
        assert_eq!(sell_order.status, OrderStatus::Active);
        assert_eq!(sell_order.remaining_quantity, 5);

        // The engine is still fully functional afterward: the untouched
        // resting order matches correctly against a later command.
        let buy = engine
            .place(user(), Side::Buy, Price::parse_decimal("101.50").unwrap(), 5)
            .await
            .unwrap();
        assert_eq!(buy.status, OrderStatus::Filled);
        assert_eq!(buy.trades.len(), 1);
    }

    #[tokio::test]
    async fn failed_modify_commit_restores_book() {
        // Writes 1 and 2 are the two resting placements below; write 3 is
        // the trade save inside the re-priced order's re-match. Force that
        // one to fail so the modify rolls back.
        let repo: Arc<dyn Repository> = Arc::new(FlakyRepository::new(3));
        let engine = Engine::spawn(Arc::clone(&repo), 16);

        let sell = engine
            .place(user(), Side::Sell, Price::parse_decimal("100.00").unwrap(), 2)
            .await
            .unwrap();
        let buy = engine
            .place(user(), Side::Buy, Price::parse_decimal("99.00").unwrap(), 2)
            .await
            .unwrap();
        assert!(buy.trades.is_empty());

        let err = engine
            .modify(sell.order_id, Price::parse_decimal("99.00").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));

        // The modify never committed: the order is still resting at its
        // original price, unfilled, and the buy order it would have crossed
        // is untouched too.
        let sell_order = engine.get_order(sell.order_id).unwrap();
        assert_eq!(sell_order.price, Price::parse_decimal("100.00").unwrap());
        assert_eq!(sell_order.remaining_quantity, 2);
        let buy_order = engine.get_order(buy.order_id).unwrap();
        assert_eq!(buy_order.status, OrderStatus::Active);
        assert_eq!(buy_order.remaining_quantity, 2);
    }

    #[tokio::test]
    async fn place_resting_order_has_no_trades() {
        let engine = Engine::spawn(Arc::new(InMemoryRepository::new()), 16);
        let result = engine
            .place(user(), Side::Buy, Price::parse_decimal("100.00").unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(result.status, OrderStatus::Active);
        assert!(result.trades.is_empty());
    }

    #[tokio::test]
    async fn crossing_orders_produce_a_trade_at_resting_price() {
        let engine = Engine::spawn(Arc::new(InMemoryRepository::new()), 16);
        engine
            .place(user(), Side::Sell, Price::parse_decimal("101.00").unwrap(), 5)
            .await
            .unwrap();
        let buy = engine
            .place(user(), Side::Buy, Price::parse_decimal("101.50").unwrap(), 5)
            .await
            .unwrap();
        assert_eq!(buy.status, OrderStatus::Filled);
        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].price.as_hundredths(), 10_100);
    }

    #[tokio::test]
    async fn cancel_unknown_order_is_not_found() {
        let engine = Engine::spawn(Arc::new(InMemoryRepository::new()), 16);
        let err = engine.cancel(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound));
    }

    #[tokio::test]
    async fn cancel_already_filled_order_is_state_conflict() {
        let engine = Engine::spawn(Arc::new(InMemoryRepository::new()), 16);
        let sell = engine
            .place(user(), Side::Sell, Price::parse_decimal("100.00").unwrap(), 5)
            .await
            .unwrap();
        engine
            .place(user(), Side::Buy, Price::parse_decimal("100.00").unwrap(), 5)
            .await
            .unwrap();
        let err = engine.cancel(sell.order_id).await.unwrap_err();
        assert!(matches!(err, EngineError::StateConflict(_)));
    }

    #[tokio::test]
    async fn modify_resets_time_priority() {
        let engine = Engine::spawn(Arc::new(InMemoryRepository::new()), 16);
        let a = engine
            .place(user(), Side::Sell, Price::parse_decimal("100.00").unwrap(), 2)
            .await
            .unwrap();
        let _b = engine
            .place(user(), Side::Sell, Price::parse_decimal("100.00").unwrap(), 2)
            .await
            .unwrap();
        engine
            .modify(a.order_id, Price::parse_decimal("100.00").unwrap())
            .await
            .unwrap();
        let buy = engine
            .place(user(), Side::Buy, Price::parse_decimal("100.00").unwrap(), 2)
            .await
            .unwrap();
        assert_eq!(buy.trades[0].ask_order_id, _b.order_id);
    }
}

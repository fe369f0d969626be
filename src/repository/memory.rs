//! Plain in-process `Repository`, the read index behind [`super::JournaledRepository`]
//! and a standalone store for tests.

use dashmap::DashMap;

use crate::order::{Order, OrderId};
use crate::repository::{paginate, OrderFilter, Page, Pagination, Repository, RepositoryError, TradeFilter};
use crate::trade::{Trade, TradeId};

/// An in-memory [`Repository`] backed by concurrent hash maps.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    orders: DashMap<OrderId, Order>,
    trades: DashMap<TradeId, Trade>,
}

impl InMemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for InMemoryRepository {
    fn save_order(&self, order: Order) -> Result<(), RepositoryError> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    fn save_trade(&self, trade: Trade) -> Result<(), RepositoryError> {
        self.trades.insert(trade.id, trade);
        Ok(())
    }

    fn get_order(&self, id: OrderId) -> Option<Order> {
        self.orders.get(&id).map(|r| r.clone())
    }

    fn get_trade(&self, id: TradeId) -> Option<Trade> {
        self.trades.get(&id).map(|r| r.clone())
    }

    fn load_active_orders(&self) -> Vec<Order> {
        let mut active: Vec<Order> = self
            .orders
            .iter()
            .filter(|r| r.is_active() && r.remaining_quantity > 0)
            .map(|r| r.clone())
            .collect();
        active.sort_by_key(|o| o.created_at);
        active
    }

    fn query_orders(&self, filter: OrderFilter, pagination: Pagination) -> Page<Order> {
        let mut items: Vec<Order> = self
            .orders
            .iter()
            .map(|r| r.clone())
            .filter(|o| filter.matches(o))
            .collect();
        items.sort_by_key(|o| o.created_at);
        paginate(items, pagination)
    }

    fn query_trades(&self, filter: TradeFilter, pagination: Pagination) -> Page<Trade> {
        let mut items: Vec<Trade> = self
            .trades
            .iter()
            .map(|r| r.clone())
            .filter(|t| filter.matches(t))
            .collect();
        items.sort_by_key(|t| t.executed_at);
        paginate(items, pagination)
    }

    fn mark_trade_settled(&self, trade_id: TradeId, now_ms: u64) -> Result<Trade, RepositoryError> {
        let mut entry = self
            .trades
            .get_mut(&trade_id)
            .ok_or(RepositoryError::TradeNotFound)?;
        if !entry.mark_settled(now_ms) {
            return Err(RepositoryError::AlreadySettled);
        }
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Side, UserId};
    use crate::price::Price;
    use uuid::Uuid;

    fn order(created_at: u64) -> Order {
        Order::new(
            OrderId::new(),
            Side::Buy,
            Price::from_hundredths(10_000).unwrap(),
            5,
            UserId(Uuid::nil()),
            created_at,
        )
    }

    #[test]
    fn load_active_orders_excludes_terminal_and_sorts_by_time() {
        let repo = InMemoryRepository::new();
        let mut cancelled = order(1);
        cancelled.cancel(2);
        let mut later = order(10);
        let earlier = order(5);
        later.id = OrderId::new();
        repo.save_order(cancelled).unwrap();
        repo.save_order(later.clone()).unwrap();
        repo.save_order(earlier.clone()).unwrap();

        let active = repo.load_active_orders();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, earlier.id);
        assert_eq!(active[1].id, later.id);
    }

    #[test]
    fn mark_trade_settled_twice_fails() {
        let repo = InMemoryRepository::new();
        let trade = Trade::new(
            Price::from_hundredths(10_000).unwrap(),
            5,
            OrderId::new(),
            OrderId::new(),
            1,
        );
        let id = trade.id;
        repo.save_trade(trade).unwrap();
        repo.mark_trade_settled(id, 10).unwrap();
        assert!(matches!(
            repo.mark_trade_settled(id, 20),
            Err(RepositoryError::AlreadySettled)
        ));
    }

    #[test]
    fn mark_trade_settled_unknown_id_fails() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.mark_trade_settled(TradeId::new(), 1),
            Err(RepositoryError::TradeNotFound)
        ));
    }
}

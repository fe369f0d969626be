//! Depth-N book views and the 1 Hz push fan-out.
//!
//! Sourced from the Repository rather than the live book: eventually
//! consistent with the writer, which is acceptable for push streams and lets
//! reads run lock-free and concurrently with matching (see `crate::engine`).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::order::Side;
use crate::price::Price;
use crate::repository::{Pagination, Repository, TradeFilter};
use crate::trade::Trade;

/// Minimum allowed snapshot depth.
pub const MIN_DEPTH: usize = 1;
/// Maximum allowed snapshot depth.
pub const MAX_DEPTH: usize = 20;

/// One aggregated price level in a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLevel {
    /// The level's price.
    pub price: Price,
    /// Summed remaining quantity across every active order at this price.
    pub quantity: u64,
}

/// A depth-limited, point-in-time view of both sides of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Bid levels, best first.
    pub bids: Vec<SnapshotLevel>,
    /// Ask levels, best first.
    pub asks: Vec<SnapshotLevel>,
    /// Timestamp this snapshot was produced, milliseconds since the Unix epoch.
    pub ts: u64,
    /// The depth requested.
    pub depth: usize,
}

/// Message broadcast to push-stream subscribers once per interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushUpdate {
    /// A depth-5 book snapshot.
    pub snapshot: Snapshot,
    /// The most recently committed trades, newest last.
    pub recent_trades: Vec<Trade>,
}

/// Produces depth-N views of the book and recent trades, and drives the
/// periodic push fan-out over a broadcast channel.
pub struct SnapshotService {
    repo: Arc<dyn Repository>,
    push_depth: usize,
    push_trade_count: usize,
    sender: broadcast::Sender<PushUpdate>,
}

impl SnapshotService {
    /// Creates a service reading through `repo`. `push_depth` and
    /// `push_trade_count` size the periodic broadcast payload (§6 specifies
    /// depth 5 and the last 5 trades).
    pub fn new(repo: Arc<dyn Repository>, push_depth: usize, push_trade_count: usize) -> Self {
        let (sender, _) = broadcast::channel(64);
        SnapshotService {
            repo,
            push_depth,
            push_trade_count,
            sender,
        }
    }

    /// Subscribes to the push stream.
    pub fn subscribe(&self) -> broadcast::Receiver<PushUpdate> {
        self.sender.subscribe()
    }

    /// Produces a depth-`depth` view of both sides at the current instant.
    /// `depth` is clamped to [`MIN_DEPTH`]..=[`MAX_DEPTH`].
    pub fn snapshot(&self, depth: usize) -> Snapshot {
        let depth = depth.clamp(MIN_DEPTH, MAX_DEPTH);
        let active = self.repo.load_active_orders();

        let mut bid_levels: BTreeMap<Price, u64> = BTreeMap::new();
        let mut ask_levels: BTreeMap<Price, u64> = BTreeMap::new();
        for order in &active {
            let levels = match order.side {
                Side::Buy => &mut bid_levels,
                Side::Sell => &mut ask_levels,
            };
            *levels.entry(order.price).or_insert(0) += order.remaining_quantity;
        }

        let bids = bid_levels
            .into_iter()
            .rev()
            .take(depth)
            .map(|(price, quantity)| SnapshotLevel { price, quantity })
            .collect();
        let asks = ask_levels
            .into_iter()
            .take(depth)
            .map(|(price, quantity)| SnapshotLevel { price, quantity })
            .collect();

        Snapshot {
            bids,
            asks,
            ts: crate::time::now_ms(),
            depth,
        }
    }

    /// The `push_trade_count` most recently executed trades, oldest first.
    pub fn recent_trades(&self) -> Vec<Trade> {
        let page = self.repo.query_trades(
            TradeFilter::default(),
            Pagination {
                page: 1,
                page_size: usize::MAX,
            },
        );
        let mut trades = page.items;
        trades.sort_by_key(|t| t.executed_at);
        let skip = trades.len().saturating_sub(self.push_trade_count);
        trades.split_off(skip)
    }

    /// Runs the periodic push loop until the process shuts down. Intended to
    /// be spawned once as its own task.
    pub async fn run_push_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let update = PushUpdate {
                snapshot: self.snapshot(self.push_depth),
                recent_trades: self.recent_trades(),
            };
            // No subscribers is not an error; the update is simply dropped.
            let _ = self.sender.send(update);
        }
    }
}

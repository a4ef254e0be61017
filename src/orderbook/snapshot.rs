//! Depth snapshots of the book for observability and reporting.

use super::book::OrderBook;
use super::level::PriceLevel;
use crate::orders::{Price, Quantity};
use crate::utils::current_time_nanos;
use serde::{Deserialize, Serialize};

/// One price level as seen from outside: visible size only, hidden iceberg
/// reserve excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Level price.
    pub price: Price,
    /// Sum of displayed quantity at this price.
    pub visible_quantity: Quantity,
    /// Number of resting orders at this price.
    pub order_count: usize,
}

/// Point-in-time capture of the top of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Instrument the book trades.
    pub symbol: String,
    /// Capture time, nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Best bid at capture time.
    pub best_bid: Option<Price>,
    /// Best ask at capture time.
    pub best_ask: Option<Price>,
    /// Bid levels, best first.
    pub bids: Vec<LevelSnapshot>,
    /// Ask levels, best first.
    pub asks: Vec<LevelSnapshot>,
}

impl OrderBook {
    /// Captures the top `depth` levels of each side, best first.
    #[must_use]
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(&price, level)| self.level_snapshot(price, level))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(&price, level)| self.level_snapshot(price, level))
            .collect();

        OrderBookSnapshot {
            symbol: self.symbol().to_string(),
            timestamp: current_time_nanos(),
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            bids,
            asks,
        }
    }

    fn level_snapshot(&self, price: Price, level: &PriceLevel) -> LevelSnapshot {
        let visible_quantity = level
            .iter()
            .filter_map(|handle| self.arena.get(handle))
            .map(|order| order.display)
            .sum();
        LevelSnapshot {
            price,
            visible_quantity,
            order_count: level.order_count(),
        }
    }
}

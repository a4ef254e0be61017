//! Core order book state: price levels, id index, arena and collaborators.

use super::arena::{OrderArena, OrderHandle};
use super::level::PriceLevel;
use super::stops::StopOrderManager;
use crate::orders::{OrderId, Price};
use crate::risk::RiskManager;
use crate::ticks::TickSizeTable;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::error;

/// Stops executed per `add_order` invocation before the cascade is cut off.
pub const MAX_CASCADE_DEPTH: u32 = 3;

/// Order slots pre-allocated by [`OrderBook::new`].
pub const DEFAULT_POOL_CAPACITY: usize = 1 << 16;

/// Aggregate counters maintained across the book's lifetime.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BookStats {
    /// Orders submitted, including rejected ones.
    pub orders_received: u64,
    /// Fills produced.
    pub trades_executed: u64,
    /// Quantity traded across all fills.
    pub volume_traded: u64,
    /// Orders removed by cancel or self-trade prevention.
    pub orders_cancelled: u64,
    /// Orders refused by the risk gate.
    pub risk_rejected: u64,
    /// Stop orders converted to market orders.
    pub stops_triggered: u64,
    /// Stops that fired but were discarded by the cascade depth bound.
    pub stops_dropped: u64,
}

/// A single-instrument, price-time-priority limit order book.
///
/// One logical executor drives the book: every mutating call runs to
/// completion, including any stop cascade it provokes, before the next is
/// accepted. Embeddings that share a book across threads must serialize all
/// calls through one lock or a submission queue.
pub struct OrderBook {
    symbol: String,

    /// Bid levels; the best bid is the greatest key.
    pub(super) bids: BTreeMap<Price, PriceLevel>,
    /// Ask levels; the best ask is the smallest key.
    pub(super) asks: BTreeMap<Price, PriceLevel>,

    /// Live orders by id, resting and stop alike.
    pub(super) orders: HashMap<OrderId, OrderHandle>,

    pub(super) arena: OrderArena,
    pub(super) risk: RiskManager,
    pub(super) stops: StopOrderManager,
    pub(super) ticks: TickSizeTable,

    /// Stop ids being executed in the current cascade, to block re-entry.
    pub(super) processing_stops: HashSet<OrderId>,
    /// Stops executed so far in the current `add_order` invocation.
    pub(super) cascade_depth: u32,

    pub(super) stats: BookStats,
}

impl OrderBook {
    /// Creates an empty book with [`DEFAULT_POOL_CAPACITY`] order slots and
    /// the default tick table.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_capacity(symbol, DEFAULT_POOL_CAPACITY)
    }

    /// Creates an empty book with a caller-chosen arena capacity.
    #[must_use]
    pub fn with_capacity(symbol: impl Into<String>, pool_capacity: usize) -> Self {
        OrderBook {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::with_capacity(pool_capacity.min(1 << 20)),
            arena: OrderArena::with_capacity(pool_capacity),
            risk: RiskManager::new(),
            stops: StopOrderManager::default(),
            ticks: TickSizeTable::default(),
            processing_stops: HashSet::new(),
            cascade_depth: 0,
            stats: BookStats::default(),
        }
    }

    /// The instrument this book trades.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Highest resting bid price.
    #[must_use]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest resting ask price.
    #[must_use]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Ask minus bid, when both sides are populated.
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Number of live orders (resting plus pending stops).
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Looks up a live order by id.
    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<&crate::orders::Order> {
        self.orders
            .get(&id)
            .and_then(|&handle| self.arena.get(handle))
    }

    /// Number of populated bid price levels.
    #[must_use]
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of populated ask price levels.
    #[must_use]
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Number of stops waiting on a trigger.
    #[must_use]
    pub fn pending_stop_count(&self) -> usize {
        self.stops.pending_count()
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> BookStats {
        self.stats
    }

    /// Read access to the risk manager.
    #[must_use]
    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    /// Write access to the risk manager, for configuring limits and the
    /// circuit breaker and for mark-to-market.
    pub fn risk_mut(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    /// Read access to the tick table.
    #[must_use]
    pub fn tick_table(&self) -> &TickSizeTable {
        &self.ticks
    }

    /// Write access to the tick table. Bands should be configured before
    /// the first order; resting prices are never re-normalized.
    pub fn tick_table_mut(&mut self) -> &mut TickSizeTable {
        &mut self.ticks
    }

    /// Replaces the tick table wholesale.
    pub fn set_tick_table(&mut self, ticks: TickSizeTable) {
        self.ticks = ticks;
    }

    /// Free order slots.
    #[must_use]
    pub fn pool_available(&self) -> usize {
        self.arena.available_count()
    }

    /// Live order slots.
    #[must_use]
    pub fn pool_allocated(&self) -> usize {
        self.arena.allocated_count()
    }

    /// Total order slots.
    #[must_use]
    pub fn pool_capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Controls whether the order arena may grow past its initial
    /// capacity. With growth disabled, submissions that find the pool
    /// empty are rejected.
    pub fn set_pool_growth_enabled(&mut self, enabled: bool) {
        self.arena.set_growth_enabled(enabled);
    }

    /// Returns a slot to the arena, logging instead of propagating the
    /// impossible failure cases.
    pub(super) fn release_slot(&mut self, handle: OrderHandle) {
        if let Err(err) = self.arena.release(handle) {
            error!(%err, "order slot release failed");
        }
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("symbol", &self.symbol)
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("orders", &self.orders.len())
            .field("pending_stops", &self.stops.pending_count())
            .finish_non_exhaustive()
    }
}

//! # Single-Instrument Matching Engine
//!
//! A price-time-priority limit order book matching engine written in Rust.
//! The crate implements the full core of an exchange-style matching
//! pipeline for one instrument: a two-sided book, six order types, iceberg
//! refills, stop-loss triggering with a bounded cascade, tick-size
//! normalization and an inline pre-trade risk gate.
//!
//! ## Key Features
//!
//! - **Deterministic matching**: identical order sequences against
//!   identical configuration produce identical trade sequences. Time
//!   priority is by insertion order, never by timestamp values.
//! - **Six order types**: GTC, IOC, FOK (all-or-nothing with a read-only
//!   probe), MARKET, STOP_LOSS and ICEBERG with hidden-reserve refills
//!   that lose time priority on each slice.
//! - **Market-maker priority**: each price level keeps a market-maker
//!   sublist that is consumed before regular orders.
//! - **Pre-trade risk**: per-trader position, order-size, fat-finger,
//!   loss, rate and daily-volume limits plus a global latching circuit
//!   breaker, all checked inline before an order may match.
//! - **Stop cascade control**: trades trigger resting stops, which execute
//!   as market orders and may trigger further stops; the cascade is
//!   depth-bounded so stop ladders cannot run away.
//! - **Slot arena**: orders live in a pooled, index-addressed arena with
//!   generational handles, so the hot path performs no per-order heap
//!   allocation and stale handles are detected rather than misread.
//!
//! ## Pipeline
//!
//! An incoming order flows through
//! `tick normalizer -> risk gate -> type router -> matching core -> stop
//! trigger -> trade output`, synchronously: one order is fully processed,
//! including any stop cascade it provokes, before the next is accepted.
//! The book is `&mut self`; embeddings that share it across threads must
//! serialize calls through a single lock or submission queue.
//!
//! ## Example
//!
//! ```rust
//! use matchbook_rs::prelude::*;
//!
//! let mut book = OrderBook::new("ACME");
//! let limits = RiskLimits {
//!     max_position: 100_000,
//!     max_order_value: 50_000_000,
//!     max_order_qty: 10_000,
//!     daily_loss_limit: 1_000_000,
//!     max_price_deviation: 0.10,
//!     max_orders_per_sec: 1_000,
//!     max_daily_volume: 1_000_000,
//! };
//! book.risk_mut().set_trader_limits(1, limits).unwrap();
//! book.risk_mut().set_trader_limits(2, limits).unwrap();
//!
//! let resting = book.add_limit_order(1, Side::Buy, 100, 10, 1).unwrap();
//! assert!(resting.is_empty());
//!
//! let trades = book.add_limit_order(2, Side::Sell, 100, 10, 2).unwrap();
//! assert_eq!(trades.len(), 1);
//! assert_eq!(trades[0].price, 100);
//! assert_eq!(trades[0].quantity, 10);
//! assert_eq!(book.order_count(), 0);
//! ```
//!
//! ## Scope
//!
//! One book trades one instrument. Order modification (cancel plus new is
//! the replacement idiom), persistence, wire protocols and post-trade
//! clearing are intentionally out of scope; the crate is the matching core
//! an exchange wraps with its own session and transport layers. Market
//! order residuals are discarded, never rested. Session ids pass through
//! the engine untouched.

pub mod market_data;
pub mod orderbook;
pub mod orders;
pub mod prelude;
pub mod risk;
pub mod ticks;
mod utils;

pub use orderbook::{
    ArenaError, BookStats, LevelSnapshot, OrderArena, OrderBook, OrderBookError,
    OrderBookSnapshot, OrderHandle, StopOrderManager, DEFAULT_POOL_CAPACITY, MAX_CASCADE_DEPTH,
};
pub use orders::{NewOrder, Order, OrderId, OrderType, Price, Quantity, Side, Trade, TraderId};
pub use risk::{
    CircuitBreaker, InvalidRiskLimits, Position, RiskLimits, RiskManager, RiskRejection,
};
pub use ticks::{TickSizeTable, TickTableError};
pub use utils::current_time_nanos;

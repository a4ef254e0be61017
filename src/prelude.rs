//! Prelude module that re-exports the commonly used types.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use matchbook_rs::prelude::*;
//! ```

// Core book types
pub use crate::orderbook::{
    BookStats, OrderBook, OrderBookError, DEFAULT_POOL_CAPACITY, MAX_CASCADE_DEPTH,
};

// Value types
pub use crate::orders::{
    NewOrder, Order, OrderId, OrderType, Price, Quantity, Side, Trade, TraderId,
};

// Risk types
pub use crate::risk::{
    CircuitBreaker, InvalidRiskLimits, Position, RiskLimits, RiskManager, RiskRejection,
};

// Tick table
pub use crate::ticks::{TickSizeTable, TickTableError};

// Snapshots
pub use crate::orderbook::{LevelSnapshot, OrderBookSnapshot};

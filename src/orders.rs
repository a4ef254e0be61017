//! Core value types shared across the engine: sides, order kinds, orders,
//! trades and the submission request.

use serde::{Deserialize, Serialize};

/// Caller-assigned order identifier. Uniqueness across live orders is the
/// caller's responsibility; a duplicate of a still-live id is rejected by
/// [`crate::OrderBook::add_order`].
pub type OrderId = u64;

/// Trader (owner) identifier, used by the risk gate and by self-trade
/// prevention.
pub type TraderId = u32;

/// Price in minor currency units (e.g. cents). Zero means "no price"
/// (market orders).
pub type Price = i64;

/// Order or trade quantity. Quantities resting on the book are strictly
/// positive.
pub type Quantity = i64;

/// Which side of the book an order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Bid side.
    #[default]
    Buy = 0,
    /// Ask side.
    Sell = 1,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Supported order types.
///
/// `Gtc` and `Iceberg` may rest on the book; `Ioc`, `Fok` and `Market`
/// execute immediately and any residual is discarded; `StopLoss` rests in
/// the stop manager until triggered, then executes as `Market`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    /// Good-till-cancelled limit order.
    #[default]
    Gtc = 0,
    /// Immediate-or-cancel: fill what crosses, discard the rest.
    Ioc = 1,
    /// Fill-or-kill: execute completely or not at all.
    Fok = 2,
    /// Market order, no price limit. Residual after the opposite side
    /// empties is discarded.
    Market = 3,
    /// Conditional order converted to `Market` once the last trade price
    /// crosses its `stop_price`.
    StopLoss = 4,
    /// Limit order exposing only `display_size` at a time, replenished
    /// from a hidden reserve after each exhausted slice.
    Iceberg = 5,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Gtc => write!(f, "GTC"),
            OrderType::Ioc => write!(f, "IOC"),
            OrderType::Fok => write!(f, "FOK"),
            OrderType::Market => write!(f, "MARKET"),
            OrderType::StopLoss => write!(f, "STOP_LOSS"),
            OrderType::Iceberg => write!(f, "ICEBERG"),
        }
    }
}

/// An order as stored in the arena.
///
/// `display` is the quantity currently exposed on the book; `remaining` is
/// the hidden iceberg reserve. `display + remaining` always equals the
/// unfilled quantity, so aggregate fills can be audited as
/// `quantity - (display + remaining)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Caller-assigned identifier.
    pub id: OrderId,
    /// Buy or sell.
    pub side: Side,
    /// Limit price; 0 for market orders.
    pub price: Price,
    /// Trigger price; 0 unless this is a stop order.
    pub stop_price: Price,
    /// Original total size.
    pub quantity: Quantity,
    /// Undisplayed iceberg reserve; 0 for all other types.
    pub remaining: Quantity,
    /// Size currently exposed on the book.
    pub display: Quantity,
    /// Maximum slice exposed per iceberg refill.
    pub display_size: Quantity,
    /// Order type.
    pub kind: OrderType,
    /// Ingest time, nanoseconds since the Unix epoch. Observability only;
    /// time priority is by insertion order, never by this value.
    pub timestamp: i64,
    /// Trader key for risk checks and self-trade prevention.
    pub owner_id: TraderId,
    /// Selects the market-maker priority sublist at a price level.
    pub is_market_maker: bool,
    /// True once a stop has fired and been converted to a market order.
    pub is_triggered: bool,
    /// Opaque session key, passed through unchanged.
    pub session_id: u32,
}

/// A single fill between two orders.
///
/// The price is always the resting (passive) order's price at match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Order id of the buying side.
    pub buy_id: OrderId,
    /// Order id of the selling side.
    pub sell_id: OrderId,
    /// Execution price in minor currency units.
    pub price: Price,
    /// Executed quantity.
    pub quantity: Quantity,
    /// Execution time, nanoseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Trade {
    /// Notional value of the fill (price times quantity).
    #[must_use]
    #[inline]
    pub fn notional(&self) -> i128 {
        self.price as i128 * self.quantity as i128
    }
}

/// Client intent submitted to [`crate::OrderBook::add_order`].
///
/// `display_size` is only meaningful for iceberg orders; the engine derives
/// the initial exposed slice and hidden reserve from it. A non-positive
/// `display_size` on an iceberg degenerates to a plain limit order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NewOrder {
    /// Caller-assigned identifier, unique among live orders.
    pub id: OrderId,
    /// Buy or sell.
    pub side: Side,
    /// Limit price; ignored (and conventionally 0) for market orders.
    pub price: Price,
    /// Total size; must be strictly positive.
    pub quantity: Quantity,
    /// Order type.
    pub kind: OrderType,
    /// Maximum exposed slice for icebergs; ignored otherwise.
    pub display_size: Quantity,
    /// Trigger price for stop orders; ignored otherwise.
    pub stop_price: Price,
    /// Trader key.
    pub owner_id: TraderId,
    /// Whether to queue in the market-maker priority sublist.
    pub is_market_maker: bool,
    /// Opaque session key.
    pub session_id: u32,
}

//! Pre-trade risk gate: per-trader limits, position keeping, rate limiting
//! and the global circuit breaker.
//!
//! The gate sits inline on the matching hot path. Every order (except stops,
//! which are checked when they fire as market orders) passes
//! [`RiskManager::check_order`] before it is allowed to match or rest.

use crate::orders::{Order, OrderType, Price, Quantity, Side, Trade, TraderId};
use crate::ticks::TickSizeTable;
use crate::utils::current_time_nanos;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// Window length of the per-trader order rate limiter.
const RATE_WINDOW_NANOS: i64 = 1_000_000_000;

/// Per-trader pre-trade limits.
///
/// All quantity and value fields must be strictly positive and
/// `max_price_deviation` must lie in `(0, 1]`; see
/// [`RiskManager::set_trader_limits`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum absolute position, in shares.
    pub max_position: i64,
    /// Maximum notional value (price times quantity) per order.
    pub max_order_value: i64,
    /// Maximum quantity per order.
    pub max_order_qty: i64,
    /// Daily realized plus unrealized loss at which new orders are refused.
    pub daily_loss_limit: i64,
    /// Maximum fractional deviation from the last trade price (fat-finger
    /// guard), e.g. `0.10` for ten percent.
    pub max_price_deviation: f64,
    /// Orders allowed per sliding one-second window.
    pub max_orders_per_sec: i32,
    /// Maximum cumulative traded quantity per day.
    pub max_daily_volume: i64,
}

/// A trader's running position and daily statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Signed position; positive is long.
    pub quantity: i64,
    /// PnL realized by reducing or flipping the position.
    pub realized_pnl: i64,
    /// Mark-to-market PnL of the open position.
    pub unrealized_pnl: i64,
    /// Volume-weighted entry price of the open position.
    pub avg_price: Price,
    /// Cumulative traded quantity today.
    pub daily_volume: i64,
}

/// Reason an order was refused by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RiskRejection {
    /// No limits configured for the trader, or the fill would exceed
    /// `max_position`.
    PositionLimit,
    /// Quantity or notional above the per-order cap.
    OrderSize,
    /// Price too far from the last trade price.
    FatFinger,
    /// Daily loss limit breached.
    LossLimit,
    /// Too many orders in the sliding one-second window.
    RateLimit,
    /// The circuit breaker is latched or this price tripped it.
    CircuitBreaker,
    /// `max_daily_volume` would be exceeded.
    VolumeLimit,
    /// Price is not aligned to any configured tick band.
    InvalidTickSize,
}

impl std::fmt::Display for RiskRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskRejection::PositionLimit => write!(f, "position limit exceeded"),
            RiskRejection::OrderSize => write!(f, "order size or value limit exceeded"),
            RiskRejection::FatFinger => write!(f, "price deviates too far from last trade"),
            RiskRejection::LossLimit => write!(f, "daily loss limit breached"),
            RiskRejection::RateLimit => write!(f, "order rate limit exceeded"),
            RiskRejection::CircuitBreaker => write!(f, "circuit breaker engaged"),
            RiskRejection::VolumeLimit => write!(f, "daily volume limit exceeded"),
            RiskRejection::InvalidTickSize => write!(f, "price not aligned to tick"),
        }
    }
}

/// Error raised when installing malformed [`RiskLimits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRiskLimits {
    /// Name of the offending field.
    pub field: &'static str,
}

impl std::fmt::Display for InvalidRiskLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid risk limits: {}", self.field)
    }
}

impl std::error::Error for InvalidRiskLimits {}

/// Process-wide price band that halts trading once breached.
///
/// The breaker latches: after the first breach every checked price is
/// refused until [`CircuitBreaker::resume_trading`]. An unconfigured breaker
/// (both limits zero) never trips. Market orders carry no price and are not
/// band-checked; they are still blocked while the latch is engaged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CircuitBreaker {
    upper_limit: Price,
    lower_limit: Price,
    is_triggered: bool,
}

impl CircuitBreaker {
    /// Arms the breaker at `reference * (1 ± percentage)` and clears the
    /// latch.
    pub fn set_limits(&mut self, reference: Price, percentage: f64) {
        self.upper_limit = (reference as f64 * (1.0 + percentage)) as Price;
        self.lower_limit = (reference as f64 * (1.0 - percentage)) as Price;
        self.is_triggered = false;
    }

    /// Checks `price` against the band, latching on a breach.
    ///
    /// Returns `true` when trading should halt, including on every call
    /// after the latch engages.
    pub fn should_halt_trading(&mut self, price: Price) -> bool {
        if self.is_triggered {
            return true;
        }
        if (self.upper_limit == 0 && self.lower_limit == 0) || price <= 0 {
            return false;
        }
        if price >= self.upper_limit || price <= self.lower_limit {
            self.is_triggered = true;
            warn!(
                price,
                lower = self.lower_limit,
                upper = self.upper_limit,
                "circuit breaker tripped"
            );
            return true;
        }
        false
    }

    /// Whether the latch is engaged.
    #[must_use]
    pub fn is_trading_halted(&self) -> bool {
        self.is_triggered
    }

    /// Clears the latch.
    pub fn resume_trading(&mut self) {
        self.is_triggered = false;
    }
}

/// Per-trader risk state plus global last-trade tracking.
#[derive(Debug, Default)]
pub struct RiskManager {
    positions: HashMap<TraderId, Position>,
    trader_limits: HashMap<TraderId, RiskLimits>,
    rate_windows: HashMap<TraderId, VecDeque<i64>>,
    last_trade_price: Price,
    circuit_breaker: CircuitBreaker,
}

impl RiskManager {
    /// Creates a manager with no traders configured. Orders from unknown
    /// traders are rejected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs limits for a trader, creating empty position and rate
    /// state on first sight.
    ///
    /// # Errors
    /// Rejects non-positive caps and a deviation outside `(0, 1]`.
    pub fn set_trader_limits(
        &mut self,
        trader_id: TraderId,
        limits: RiskLimits,
    ) -> Result<(), InvalidRiskLimits> {
        let field = if limits.max_position <= 0 {
            Some("max_position")
        } else if limits.max_order_value <= 0 {
            Some("max_order_value")
        } else if limits.max_order_qty <= 0 {
            Some("max_order_qty")
        } else if limits.daily_loss_limit <= 0 {
            Some("daily_loss_limit")
        } else if limits.max_price_deviation <= 0.0 || limits.max_price_deviation > 1.0 {
            Some("max_price_deviation")
        } else if limits.max_orders_per_sec <= 0 {
            Some("max_orders_per_sec")
        } else if limits.max_daily_volume <= 0 {
            Some("max_daily_volume")
        } else {
            None
        };
        if let Some(field) = field {
            return Err(InvalidRiskLimits { field });
        }

        self.trader_limits.insert(trader_id, limits);
        self.positions.entry(trader_id).or_default();
        self.rate_windows.entry(trader_id).or_default();
        Ok(())
    }

    /// Runs the full pre-trade check sequence for `order`.
    ///
    /// Stop orders bypass the gate; they are vetted when they fire. On
    /// success the order consumes one slot of the trader's rate window.
    ///
    /// # Errors
    /// The first failing check wins; see [`RiskRejection`].
    pub fn check_order(
        &mut self,
        order: &Order,
        ticks: &TickSizeTable,
    ) -> Result<(), RiskRejection> {
        if order.kind == OrderType::StopLoss {
            return Ok(());
        }

        let limits = *self
            .trader_limits
            .get(&order.owner_id)
            .ok_or(RiskRejection::PositionLimit)?;
        let position = self.positions.entry(order.owner_id).or_default();

        let new_position = match order.side {
            Side::Buy => position.quantity + order.quantity,
            Side::Sell => position.quantity - order.quantity,
        };
        if new_position.abs() > limits.max_position {
            return Err(RiskRejection::PositionLimit);
        }

        if order.quantity > limits.max_order_qty {
            return Err(RiskRejection::OrderSize);
        }
        let notional = (order.price as i128).saturating_mul(order.quantity as i128);
        if notional > limits.max_order_value as i128 {
            return Err(RiskRejection::OrderSize);
        }

        if order.price > 0 && !ticks.is_valid_price(order.price) {
            return Err(RiskRejection::InvalidTickSize);
        }

        if self.last_trade_price > 0 && order.price > 0 {
            let deviation = (order.price - self.last_trade_price).abs() as f64
                / self.last_trade_price as f64;
            if deviation > limits.max_price_deviation {
                return Err(RiskRejection::FatFinger);
            }
        }

        if position.realized_pnl + position.unrealized_pnl < -limits.daily_loss_limit {
            return Err(RiskRejection::LossLimit);
        }

        if position.daily_volume + order.quantity > limits.max_daily_volume {
            return Err(RiskRejection::VolumeLimit);
        }

        self.consume_rate_slot(order.owner_id, limits.max_orders_per_sec)?;

        if self.circuit_breaker.should_halt_trading(order.price) {
            return Err(RiskRejection::CircuitBreaker);
        }

        Ok(())
    }

    /// Prunes the trader's sliding window and records this order, or
    /// rejects when the window is full.
    fn consume_rate_slot(
        &mut self,
        trader_id: TraderId,
        max_orders_per_sec: i32,
    ) -> Result<(), RiskRejection> {
        let window = self.rate_windows.entry(trader_id).or_default();
        let now = current_time_nanos();
        while window
            .front()
            .is_some_and(|&stamp| now - stamp > RATE_WINDOW_NANOS)
        {
            window.pop_front();
        }
        if window.len() as i32 >= max_orders_per_sec {
            return Err(RiskRejection::RateLimit);
        }
        window.push_back(now);
        Ok(())
    }

    /// Applies one fill to a trader's position.
    ///
    /// Adding to a same-sign position moves `avg_price` by volume-weighted
    /// average; reducing or flipping realizes PnL against `avg_price`.
    /// Every fill counts toward `daily_volume` and refreshes the global
    /// last trade price.
    pub fn update_position(&mut self, trader_id: TraderId, trade: &Trade, trader_side: Side) {
        let position = self.positions.entry(trader_id).or_default();

        match trader_side {
            Side::Buy => {
                if position.quantity == 0 {
                    position.avg_price = trade.price;
                } else if position.quantity > 0 {
                    position.avg_price = weighted_average(
                        position.quantity,
                        position.avg_price,
                        trade.quantity,
                        trade.price,
                    );
                } else {
                    let covered = (-position.quantity).min(trade.quantity);
                    position.realized_pnl += (position.avg_price - trade.price) * covered;
                    if trade.quantity > -position.quantity {
                        position.avg_price = trade.price;
                    }
                }
                position.quantity += trade.quantity;
            }
            Side::Sell => {
                if position.quantity == 0 {
                    position.avg_price = trade.price;
                } else if position.quantity < 0 {
                    position.avg_price = weighted_average(
                        -position.quantity,
                        position.avg_price,
                        trade.quantity,
                        trade.price,
                    );
                } else {
                    let covered = position.quantity.min(trade.quantity);
                    position.realized_pnl += (trade.price - position.avg_price) * covered;
                    if trade.quantity > position.quantity {
                        position.avg_price = trade.price;
                    }
                }
                position.quantity -= trade.quantity;
            }
        }

        position.daily_volume += trade.quantity;
        self.last_trade_price = trade.price;
    }

    /// Revalues every open position at `price` and refreshes the circuit
    /// breaker. Non-positive prices are ignored.
    pub fn mark_to_market(&mut self, price: Price) {
        if price <= 0 {
            return;
        }
        for position in self.positions.values_mut() {
            if position.quantity != 0 {
                position.unrealized_pnl = (price - position.avg_price) * position.quantity;
            }
        }
        self.last_trade_price = price;
        self.circuit_breaker.should_halt_trading(price);
    }

    /// Zeroes daily volume and PnL, clears rate windows and resumes
    /// trading.
    pub fn reset_daily_stats(&mut self) {
        for position in self.positions.values_mut() {
            position.daily_volume = 0;
            position.realized_pnl = 0;
            position.unrealized_pnl = 0;
        }
        for window in self.rate_windows.values_mut() {
            window.clear();
        }
        self.last_trade_price = 0;
        self.circuit_breaker.resume_trading();
    }

    /// The trader's position with unrealized PnL computed at the current
    /// last trade price. Unknown traders read as flat.
    #[must_use]
    pub fn position(&self, trader_id: TraderId) -> Position {
        let mut position = self.positions.get(&trader_id).copied().unwrap_or_default();
        if self.last_trade_price > 0 && position.quantity != 0 {
            position.unrealized_pnl =
                (self.last_trade_price - position.avg_price) * position.quantity;
        }
        position
    }

    /// Last trade price observed through fills or mark-to-market.
    #[must_use]
    pub fn last_trade_price(&self) -> Price {
        self.last_trade_price
    }

    /// Read access to the circuit breaker.
    #[must_use]
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Write access to the circuit breaker, for arming and resuming.
    pub fn circuit_breaker_mut(&mut self) -> &mut CircuitBreaker {
        &mut self.circuit_breaker
    }
}

/// Volume-weighted average entry price. `held` is the absolute open
/// quantity and must be positive.
fn weighted_average(held: i64, avg_price: Price, fill_qty: Quantity, fill_price: Price) -> Price {
    let numerator =
        held as i128 * avg_price as i128 + fill_qty as i128 * fill_price as i128;
    (numerator / (held as i128 + fill_qty as i128)) as Price
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_position: 1_000,
            max_order_value: 10_000_000,
            max_order_qty: 500,
            daily_loss_limit: 50_000,
            max_price_deviation: 0.10,
            max_orders_per_sec: 100,
            max_daily_volume: 100_000,
        }
    }

    fn order(side: Side, price: Price, quantity: Quantity) -> Order {
        Order {
            id: 1,
            side,
            price,
            quantity,
            display: quantity,
            kind: OrderType::Gtc,
            owner_id: 7,
            ..Order::default()
        }
    }

    fn trade(price: Price, quantity: Quantity) -> Trade {
        Trade {
            buy_id: 1,
            sell_id: 2,
            price,
            quantity,
            timestamp: 0,
        }
    }

    fn manager() -> RiskManager {
        let mut risk = RiskManager::new();
        risk.set_trader_limits(7, limits()).unwrap();
        risk
    }

    #[test]
    fn invalid_limits_rejected() {
        let mut risk = RiskManager::new();
        let mut bad = limits();
        bad.max_position = 0;
        assert_eq!(
            risk.set_trader_limits(7, bad),
            Err(InvalidRiskLimits {
                field: "max_position"
            })
        );
        let mut bad = limits();
        bad.max_price_deviation = 1.5;
        assert_eq!(
            risk.set_trader_limits(7, bad),
            Err(InvalidRiskLimits {
                field: "max_price_deviation"
            })
        );
    }

    #[test]
    fn unknown_trader_rejected() {
        let mut risk = RiskManager::new();
        let ticks = TickSizeTable::default();
        assert_eq!(
            risk.check_order(&order(Side::Buy, 100, 10), &ticks),
            Err(RiskRejection::PositionLimit)
        );
    }

    #[test]
    fn stop_orders_bypass_the_gate() {
        let mut risk = RiskManager::new();
        let ticks = TickSizeTable::default();
        let mut stop = order(Side::Buy, 100, 10);
        stop.kind = OrderType::StopLoss;
        stop.owner_id = 999; // no limits configured
        assert_eq!(risk.check_order(&stop, &ticks), Ok(()));
    }

    #[test]
    fn position_limit_counts_hypothetical_fill() {
        let mut risk = manager();
        let ticks = TickSizeTable::default();
        assert_eq!(
            risk.check_order(&order(Side::Buy, 100, 500), &ticks),
            Ok(())
        );
        risk.update_position(7, &trade(100, 900), Side::Buy);
        assert_eq!(
            risk.check_order(&order(Side::Buy, 100, 200), &ticks),
            Err(RiskRejection::PositionLimit)
        );
        // Selling reduces exposure and passes.
        assert_eq!(
            risk.check_order(&order(Side::Sell, 100, 200), &ticks),
            Ok(())
        );
    }

    #[test]
    fn order_size_and_value_caps() {
        let mut risk = manager();
        let ticks = TickSizeTable::default();
        assert_eq!(
            risk.check_order(&order(Side::Buy, 100, 501), &ticks),
            Err(RiskRejection::OrderSize)
        );
        // 50_000 * 300 = 15_000_000 > max_order_value
        assert_eq!(
            risk.check_order(&order(Side::Buy, 50_000, 300), &ticks),
            Err(RiskRejection::OrderSize)
        );
    }

    #[test]
    fn fat_finger_measured_against_last_trade() {
        let mut risk = manager();
        let ticks = TickSizeTable::default();
        // No reference price yet: anything goes.
        assert_eq!(
            risk.check_order(&order(Side::Buy, 10_000, 1), &ticks),
            Ok(())
        );
        risk.mark_to_market(100);
        assert_eq!(
            risk.check_order(&order(Side::Buy, 120, 1), &ticks),
            Err(RiskRejection::FatFinger)
        );
        assert_eq!(risk.check_order(&order(Side::Buy, 109, 1), &ticks), Ok(()));
    }

    #[test]
    fn misaligned_price_rejected() {
        let mut risk = manager();
        let mut ticks = TickSizeTable::empty();
        ticks.add_band(1, 1_000, 10).unwrap();
        assert_eq!(
            risk.check_order(&order(Side::Buy, 105, 1), &ticks),
            Err(RiskRejection::InvalidTickSize)
        );
        assert_eq!(risk.check_order(&order(Side::Buy, 110, 1), &ticks), Ok(()));
    }

    #[test]
    fn daily_volume_limit_enforced() {
        let mut risk = manager();
        let ticks = TickSizeTable::default();
        // Build up traded volume while keeping the open position small.
        risk.update_position(7, &trade(100, 50_000), Side::Buy);
        risk.update_position(7, &trade(100, 49_950), Side::Sell);
        assert_eq!(risk.position(7).quantity, 50);
        assert_eq!(
            risk.check_order(&order(Side::Buy, 100, 100), &ticks),
            Err(RiskRejection::VolumeLimit)
        );
    }

    #[test]
    fn rate_limit_uses_sliding_window() {
        let mut risk = RiskManager::new();
        let ticks = TickSizeTable::default();
        let mut tight = limits();
        tight.max_orders_per_sec = 2;
        risk.set_trader_limits(7, tight).unwrap();

        assert_eq!(risk.check_order(&order(Side::Buy, 100, 1), &ticks), Ok(()));
        assert_eq!(risk.check_order(&order(Side::Buy, 100, 1), &ticks), Ok(()));
        assert_eq!(
            risk.check_order(&order(Side::Buy, 100, 1), &ticks),
            Err(RiskRejection::RateLimit)
        );
    }

    #[test]
    fn circuit_breaker_latches_until_resumed() {
        let mut risk = manager();
        let ticks = TickSizeTable::default();
        risk.circuit_breaker_mut().set_limits(100, 0.20);

        assert_eq!(risk.check_order(&order(Side::Buy, 110, 1), &ticks), Ok(()));
        assert_eq!(
            risk.check_order(&order(Side::Buy, 125, 1), &ticks),
            Err(RiskRejection::CircuitBreaker)
        );
        // Latched: even an in-band price is refused now.
        assert_eq!(
            risk.check_order(&order(Side::Buy, 100, 1), &ticks),
            Err(RiskRejection::CircuitBreaker)
        );
        risk.circuit_breaker_mut().resume_trading();
        assert_eq!(risk.check_order(&order(Side::Buy, 100, 1), &ticks), Ok(()));
    }

    #[test]
    fn unconfigured_breaker_never_trips() {
        let mut breaker = CircuitBreaker::default();
        assert!(!breaker.should_halt_trading(1));
        assert!(!breaker.should_halt_trading(i64::MAX - 1));
        assert!(!breaker.is_trading_halted());
    }

    #[test]
    fn long_position_averages_and_realizes() {
        let mut risk = manager();
        risk.update_position(7, &trade(100, 10), Side::Buy);
        risk.update_position(7, &trade(200, 10), Side::Buy);
        let position = risk.position(7);
        assert_eq!(position.quantity, 20);
        assert_eq!(position.avg_price, 150);

        // Sell half at 180: realize (180 - 150) * 10.
        risk.update_position(7, &trade(180, 10), Side::Sell);
        let position = risk.position(7);
        assert_eq!(position.quantity, 10);
        assert_eq!(position.realized_pnl, 300);
        assert_eq!(position.avg_price, 150);
    }

    #[test]
    fn flipping_position_rebases_avg_price() {
        let mut risk = manager();
        risk.update_position(7, &trade(100, 10), Side::Buy);
        // Sell 15: close 10 (flat) and go short 5 at 90.
        risk.update_position(7, &trade(90, 15), Side::Sell);
        let position = risk.position(7);
        assert_eq!(position.quantity, -5);
        assert_eq!(position.realized_pnl, (90 - 100) * 10);
        assert_eq!(position.avg_price, 90);

        // Cover the short at 80: realize (90 - 80) * 5.
        risk.update_position(7, &trade(80, 5), Side::Buy);
        let position = risk.position(7);
        assert_eq!(position.quantity, 0);
        assert_eq!(position.realized_pnl, -100 + 50);
    }

    #[test]
    fn mark_to_market_revalues_open_positions() {
        let mut risk = manager();
        risk.update_position(7, &trade(100, 10), Side::Buy);
        risk.mark_to_market(130);
        assert_eq!(risk.position(7).unrealized_pnl, 300);
        assert_eq!(risk.last_trade_price(), 130);
        risk.mark_to_market(0); // ignored
        assert_eq!(risk.last_trade_price(), 130);
    }

    #[test]
    fn daily_reset_clears_state() {
        let mut risk = manager();
        risk.update_position(7, &trade(100, 10), Side::Buy);
        risk.circuit_breaker_mut().set_limits(100, 0.01);
        risk.circuit_breaker_mut().should_halt_trading(200);
        assert!(risk.circuit_breaker().is_trading_halted());

        risk.reset_daily_stats();
        let position = risk.position(7);
        assert_eq!(position.daily_volume, 0);
        assert_eq!(position.realized_pnl, 0);
        assert_eq!(position.unrealized_pnl, 0);
        assert_eq!(risk.last_trade_price(), 0);
        assert!(!risk.circuit_breaker().is_trading_halted());
        // Open quantity survives the daily reset.
        assert_eq!(position.quantity, 10);
    }
}

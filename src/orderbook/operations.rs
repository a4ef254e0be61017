//! Order admission and cancellation, plus the stop-trigger cascade.

use super::arena::OrderHandle;
use super::book::{OrderBook, MAX_CASCADE_DEPTH};
use super::error::OrderBookError;
use crate::orders::{NewOrder, OrderId, OrderType, Price, Quantity, Side, Trade, TraderId};
use crate::utils::current_time_nanos;
use tracing::{debug, trace, warn};

impl OrderBook {
    /// Submits an order to the book. This is the single public entry for
    /// all order types.
    ///
    /// The order is tick-normalized, risk-checked, then dispatched by type:
    /// stops park in the stop manager, everything else matches against the
    /// opposite side. GTC and iceberg residuals rest; IOC, FOK and market
    /// residuals are discarded. Trades emitted by any stop cascade the
    /// order provokes are appended to the returned list, in execution
    /// order.
    ///
    /// # Errors
    /// Returns a [`OrderBookError`] and leaves the book unchanged when the
    /// order is a duplicate, non-positive, refused by the risk gate, or the
    /// pool is exhausted with growth disabled.
    pub fn add_order(&mut self, new_order: NewOrder) -> Result<Vec<Trade>, OrderBookError> {
        self.stats.orders_received += 1;

        if new_order.quantity <= 0 {
            return Err(OrderBookError::InvalidQuantity(new_order.quantity));
        }
        if self.orders.contains_key(&new_order.id) {
            return Err(OrderBookError::DuplicateOrderId(new_order.id));
        }

        let Some(handle) = self.arena.acquire() else {
            return Err(OrderBookError::PoolExhausted {
                capacity: self.arena.capacity(),
            });
        };
        self.init_slot(handle, &new_order);
        self.normalize_prices(handle);

        if let Err(reason) = self.risk.check_order(&self.arena[handle], &self.ticks) {
            trace!(
                order_id = new_order.id,
                owner = new_order.owner_id,
                %reason,
                "order rejected by risk gate"
            );
            self.release_slot(handle);
            self.stats.risk_rejected += 1;
            return Err(OrderBookError::RiskRejected(reason));
        }

        // Each top-level submission gets a fresh cascade budget.
        self.cascade_depth = 0;
        self.processing_stops.clear();

        let kind = new_order.kind;
        let mut trades: Vec<Trade> = Vec::with_capacity(16);

        match kind {
            OrderType::StopLoss => {
                let (side, stop_price) = {
                    let order = &self.arena[handle];
                    (order.side, order.stop_price)
                };
                self.stops.add(new_order.id, side, stop_price, handle);
                self.orders.insert(new_order.id, handle);
                trace!(
                    order_id = new_order.id,
                    %side,
                    stop_price,
                    "stop order parked"
                );
                return Ok(trades);
            }
            OrderType::Fok => {
                let filled = self.match_fok(handle, &mut trades);
                if !filled {
                    debug!(order_id = new_order.id, "fill-or-kill killed");
                }
                self.release_slot(handle);
            }
            OrderType::Market => {
                self.match_market(handle, &mut trades);
                // Market residual never rests; it is discarded with the slot.
                self.release_slot(handle);
            }
            OrderType::Gtc | OrderType::Ioc | OrderType::Iceberg => {
                self.match_limit(handle, &mut trades);
                let (display_qty, side, price, market_maker) = {
                    let order = &self.arena[handle];
                    (order.display, order.side, order.price, order.is_market_maker)
                };
                if display_qty > 0 && matches!(kind, OrderType::Gtc | OrderType::Iceberg) {
                    let book_side = match side {
                        Side::Buy => &mut self.bids,
                        Side::Sell => &mut self.asks,
                    };
                    book_side
                        .entry(price)
                        .or_default()
                        .push_back(handle, market_maker);
                    self.orders.insert(new_order.id, handle);
                    trace!(order_id = new_order.id, %side, price, display = display_qty, "order rested");
                } else {
                    self.release_slot(handle);
                }
            }
        }

        self.process_triggered_stops(&mut trades);

        self.stats.trades_executed += trades.len() as u64;
        for trade in &trades {
            self.stats.volume_traded += trade.quantity as u64;
        }
        Ok(trades)
    }

    /// Cancels a live order by id, whether resting or parked as a stop.
    ///
    /// Returns whether the id was found. The slot returns to the arena and
    /// an emptied price level is collapsed.
    pub fn cancel_order(&mut self, id: OrderId) -> bool {
        let Some(&handle) = self.orders.get(&id) else {
            return false;
        };
        let (kind, side, price) = {
            let order = &self.arena[handle];
            (order.kind, order.side, order.price)
        };

        if kind == OrderType::StopLoss {
            self.stops.remove(id);
        } else {
            let book_side = match side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            if let Some(level) = book_side.get_mut(&price) {
                level.remove(handle);
                if level.is_empty() {
                    book_side.remove(&price);
                }
            }
        }

        self.orders.remove(&id);
        self.release_slot(handle);
        self.stats.orders_cancelled += 1;
        trace!(order_id = id, "order cancelled");
        true
    }

    /// Convenience wrapper: a good-till-cancelled limit order.
    pub fn add_limit_order(
        &mut self,
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        owner_id: TraderId,
    ) -> Result<Vec<Trade>, OrderBookError> {
        self.add_order(NewOrder {
            id,
            side,
            price,
            quantity,
            kind: OrderType::Gtc,
            owner_id,
            ..NewOrder::default()
        })
    }

    /// Convenience wrapper: an iceberg order exposing `display_size` at a
    /// time.
    pub fn add_iceberg_order(
        &mut self,
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        display_size: Quantity,
        owner_id: TraderId,
    ) -> Result<Vec<Trade>, OrderBookError> {
        self.add_order(NewOrder {
            id,
            side,
            price,
            quantity,
            kind: OrderType::Iceberg,
            display_size,
            owner_id,
            ..NewOrder::default()
        })
    }

    /// Convenience wrapper: a market order. Any residual after the
    /// opposite side empties is discarded.
    pub fn add_market_order(
        &mut self,
        id: OrderId,
        side: Side,
        quantity: Quantity,
        owner_id: TraderId,
    ) -> Result<Vec<Trade>, OrderBookError> {
        self.add_order(NewOrder {
            id,
            side,
            quantity,
            kind: OrderType::Market,
            owner_id,
            ..NewOrder::default()
        })
    }

    /// Convenience wrapper: a stop-loss order that fires at `stop_price`.
    pub fn add_stop_loss(
        &mut self,
        id: OrderId,
        side: Side,
        stop_price: Price,
        quantity: Quantity,
        owner_id: TraderId,
    ) -> Result<Vec<Trade>, OrderBookError> {
        self.add_order(NewOrder {
            id,
            side,
            quantity,
            kind: OrderType::StopLoss,
            stop_price,
            owner_id,
            ..NewOrder::default()
        })
    }

    /// Copies the request into the freshly acquired slot and derives the
    /// display/reserve split.
    fn init_slot(&mut self, handle: OrderHandle, new_order: &NewOrder) {
        let order = &mut self.arena[handle];
        order.id = new_order.id;
        order.side = new_order.side;
        order.price = new_order.price;
        order.stop_price = new_order.stop_price;
        order.quantity = new_order.quantity;
        order.kind = new_order.kind;
        order.timestamp = current_time_nanos();
        order.owner_id = new_order.owner_id;
        order.is_market_maker = new_order.is_market_maker;
        order.is_triggered = false;
        order.session_id = new_order.session_id;

        // Icebergs expose one slice and keep the rest in reserve. A
        // non-positive display size degenerates to a plain limit order.
        let slice_cap = if new_order.kind == OrderType::Iceberg && new_order.display_size > 0 {
            new_order.display_size
        } else {
            new_order.quantity
        };
        order.display_size = slice_cap;
        order.display = new_order.quantity.min(slice_cap);
        order.remaining = new_order.quantity - order.display;
    }

    /// Rounds limit and stop prices onto the tick grid. A price outside
    /// every band is left as submitted; the risk gate rejects it.
    fn normalize_prices(&mut self, handle: OrderHandle) {
        let (kind, price, stop_price) = {
            let order = &self.arena[handle];
            (order.kind, order.price, order.stop_price)
        };
        if kind != OrderType::Market && price > 0 {
            let rounded = self.ticks.round_to_tick(price);
            if rounded > 0 {
                self.arena[handle].price = rounded;
            }
        }
        if stop_price > 0 {
            let rounded = self.ticks.round_to_tick(stop_price);
            if rounded > 0 {
                self.arena[handle].stop_price = rounded;
            }
        }
    }

    /// Fires stops triggered by the latest trade and executes them as
    /// market orders, depth first, until the cascade budget runs out.
    ///
    /// Stops that fire after the budget is spent have already left the
    /// manager and the id index; they are released unexecuted.
    pub(super) fn process_triggered_stops(&mut self, trades: &mut Vec<Trade>) {
        let Some(last_trade) = trades.last() else {
            return;
        };
        if self.cascade_depth >= MAX_CASCADE_DEPTH {
            return;
        }
        let last_trade_price = last_trade.price;
        let triggered = self.stops.take_triggered(last_trade_price);

        for (stop_id, handle) in triggered {
            if self.processing_stops.contains(&stop_id) {
                // Re-entry guard; this stop is already executing above us.
                self.orders.remove(&stop_id);
                self.release_slot(handle);
                continue;
            }
            if self.cascade_depth >= MAX_CASCADE_DEPTH {
                warn!(
                    order_id = stop_id,
                    last_trade_price, "cascade budget exhausted, dropping triggered stop"
                );
                self.stats.stops_dropped += 1;
                self.orders.remove(&stop_id);
                self.release_slot(handle);
                continue;
            }

            self.processing_stops.insert(stop_id);
            self.cascade_depth += 1;
            self.stats.stops_triggered += 1;

            {
                let order = &mut self.arena[handle];
                order.kind = OrderType::Market;
                order.price = 0;
                order.is_triggered = true;
            }
            debug!(order_id = stop_id, last_trade_price, "stop triggered");

            let mut stop_trades = Vec::new();
            self.match_market(handle, &mut stop_trades);
            self.orders.remove(&stop_id);
            self.release_slot(handle);

            let produced_fills = !stop_trades.is_empty();
            trades.append(&mut stop_trades);
            if produced_fills {
                // Depth first: trades from this stop may trigger others.
                self.process_triggered_stops(trades);
            }

            self.processing_stops.remove(&stop_id);
        }
    }
}

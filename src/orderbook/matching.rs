//! Contains the core matching logic: limit cross-match, market sweep and
//! fill-or-kill.
//!
//! All three paths share the same per-fill bookkeeping: the trade prints at
//! the passive price, both traders' positions are updated through the risk
//! manager, and an exhausted iceberg slice refills to the tail of its queue.

use super::arena::OrderHandle;
use super::book::OrderBook;
use super::level::PriceLevel;
use crate::orders::{Order, OrderId, OrderType, Price, Quantity, Side, Trade, TraderId};
use crate::risk::RiskManager;
use crate::utils::current_time_nanos;
use std::collections::BTreeMap;
use tracing::error;

impl OrderBook {
    /// Crosses a limit order (GTC, IOC or iceberg) against the opposite
    /// side until the price no longer crosses or the order is exhausted.
    pub(super) fn match_limit(&mut self, incoming: OrderHandle, trades: &mut Vec<Trade>) {
        let limit = self.arena[incoming].price;
        self.match_against(incoming, Some(limit), trades);
    }

    /// Sweeps the opposite side with no price bound. Whatever cannot fill
    /// is discarded by the caller; market residuals never rest.
    pub(super) fn match_market(&mut self, incoming: OrderHandle, trades: &mut Vec<Trade>) {
        self.match_against(incoming, None, trades);
    }

    fn match_against(
        &mut self,
        incoming: OrderHandle,
        limit: Option<Price>,
        trades: &mut Vec<Trade>,
    ) {
        let (side, owner, aggressor_id, kind, display_size) = {
            let order = &self.arena[incoming];
            (
                order.side,
                order.owner_id,
                order.id,
                order.kind,
                order.display_size,
            )
        };
        let mut display = self.arena[incoming].display;
        let mut reserve = self.arena[incoming].remaining;

        let OrderBook {
            bids,
            asks,
            orders,
            arena,
            risk,
            stats,
            ..
        } = self;
        let opposite = match side {
            Side::Buy => asks,
            Side::Sell => bids,
        };

        while display > 0 {
            let Some(best_price) = best_opposite(opposite, side) else {
                break;
            };
            if let Some(limit) = limit {
                let crosses = match side {
                    Side::Buy => limit >= best_price,
                    Side::Sell => limit <= best_price,
                };
                if !crosses {
                    break;
                }
            }
            let Some(level) = opposite.get_mut(&best_price) else {
                break;
            };

            while display > 0 {
                let Some(passive_handle) = level.front() else {
                    break;
                };
                let passive = &mut arena[passive_handle];

                if passive.owner_id == owner {
                    // Wash-trade guard: pull the resting order, no fill.
                    let passive_id = passive.id;
                    level.pop_front();
                    orders.remove(&passive_id);
                    if let Err(err) = arena.release(passive_handle) {
                        error!(%err, "slot release failed for self-trade cancel");
                    }
                    stats.orders_cancelled += 1;
                    continue;
                }

                let quantity = display.min(passive.display);
                let trade = execute_trade(risk, side, aggressor_id, owner, passive, quantity);

                display -= quantity;
                passive.display -= quantity;

                if passive.display == 0 {
                    level.pop_front();
                    if passive.kind == OrderType::Iceberg && passive.remaining > 0 {
                        refill_slice(passive);
                        // The refilled slice loses time priority.
                        level.push_back(passive_handle, passive.is_market_maker);
                    } else {
                        let passive_id = passive.id;
                        orders.remove(&passive_id);
                        if let Err(err) = arena.release(passive_handle) {
                            error!(%err, "slot release failed for filled order");
                        }
                    }
                }
                trades.push(trade);

                // A marketable iceberg keeps drawing on its reserve while it
                // still crosses; slicing only matters once it rests.
                if display == 0 && kind == OrderType::Iceberg && reserve > 0 {
                    let slice = reserve.min(display_size);
                    reserve -= slice;
                    display = slice;
                }
            }

            if opposite
                .get(&best_price)
                .is_some_and(PriceLevel::is_empty)
            {
                opposite.remove(&best_price);
            }
        }

        let order = &mut arena[incoming];
        order.display = display;
        order.remaining = reserve;
    }

    /// Fill-or-kill: a read-only probe of the opposite side, then either a
    /// full commit of the probed fills or no mutation at all.
    ///
    /// Returns whether the order filled.
    pub(super) fn match_fok(&mut self, incoming: OrderHandle, trades: &mut Vec<Trade>) -> bool {
        let (side, owner, limit, aggressor_id, quantity) = {
            let order = &self.arena[incoming];
            (
                order.side,
                order.owner_id,
                order.price,
                order.id,
                order.quantity,
            )
        };

        let mut needed = quantity;
        let mut fills: Vec<(OrderHandle, Quantity)> = Vec::new();
        {
            let opposite = match side {
                Side::Buy => &self.asks,
                Side::Sell => &self.bids,
            };
            let levels: Box<dyn Iterator<Item = (&Price, &PriceLevel)>> = match side {
                Side::Buy => Box::new(opposite.iter()),
                Side::Sell => Box::new(opposite.iter().rev()),
            };
            'probe: for (&price, level) in levels {
                let within = match side {
                    Side::Buy => price <= limit,
                    Side::Sell => price >= limit,
                };
                if !within {
                    break;
                }
                for handle in level.iter() {
                    let passive = &self.arena[handle];
                    if passive.owner_id == owner {
                        continue;
                    }
                    let available = needed.min(passive.display);
                    fills.push((handle, available));
                    needed -= available;
                    if needed == 0 {
                        break 'probe;
                    }
                }
            }
        }
        if needed > 0 {
            return false;
        }

        let OrderBook {
            bids,
            asks,
            orders,
            arena,
            risk,
            ..
        } = self;
        let mut display = arena[incoming].display;

        for (handle, quantity) in fills {
            let passive = &mut arena[handle];
            let trade = execute_trade(risk, side, aggressor_id, owner, passive, quantity);
            display -= quantity;
            passive.display -= quantity;

            if passive.display == 0 {
                let refilled = if passive.kind == OrderType::Iceberg && passive.remaining > 0 {
                    refill_slice(passive);
                    true
                } else {
                    false
                };
                let (passive_id, passive_price, passive_side, market_maker) = (
                    passive.id,
                    passive.price,
                    passive.side,
                    passive.is_market_maker,
                );
                let book_side = match passive_side {
                    Side::Buy => &mut *bids,
                    Side::Sell => &mut *asks,
                };
                if let Some(level) = book_side.get_mut(&passive_price) {
                    level.remove(handle);
                    if refilled {
                        level.push_back(handle, market_maker);
                    } else {
                        orders.remove(&passive_id);
                        if let Err(err) = arena.release(handle) {
                            error!(%err, "slot release failed in fill-or-kill commit");
                        }
                    }
                    if level.is_empty() {
                        book_side.remove(&passive_price);
                    }
                }
            }
            trades.push(trade);
        }

        arena[incoming].display = display;
        true
    }
}

fn best_opposite(opposite: &BTreeMap<Price, PriceLevel>, incoming_side: Side) -> Option<Price> {
    match incoming_side {
        // Buying consumes the lowest ask; selling the highest bid.
        Side::Buy => opposite.keys().next().copied(),
        Side::Sell => opposite.keys().next_back().copied(),
    }
}

/// Moves the next slice of an iceberg's reserve into its display.
/// Callers must ensure `remaining > 0`.
fn refill_slice(order: &mut Order) {
    let slice = order.remaining.min(order.display_size);
    order.remaining -= slice;
    order.display = slice;
}

/// Builds the trade record for one fill and applies it to both traders'
/// positions. The print is always at the passive price.
fn execute_trade(
    risk: &mut RiskManager,
    aggressor_side: Side,
    aggressor_id: OrderId,
    aggressor_owner: TraderId,
    passive: &Order,
    quantity: Quantity,
) -> Trade {
    let (buy_id, sell_id) = match aggressor_side {
        Side::Buy => (aggressor_id, passive.id),
        Side::Sell => (passive.id, aggressor_id),
    };
    let trade = Trade {
        buy_id,
        sell_id,
        price: passive.price,
        quantity,
        timestamp: current_time_nanos(),
    };

    let (buyer, seller) = match aggressor_side {
        Side::Buy => (aggressor_owner, passive.owner_id),
        Side::Sell => (passive.owner_id, aggressor_owner),
    };
    risk.update_position(buyer, &trade, Side::Buy);
    risk.update_position(seller, &trade, Side::Sell);

    trade
}

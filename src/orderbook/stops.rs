//! Resting conditional (stop) orders keyed by trigger price.

use super::arena::OrderHandle;
use crate::orders::{OrderId, Price, Side};
use std::collections::{BTreeMap, HashMap};

/// Holds stop orders off-book until the last trade price crosses their
/// trigger.
///
/// Buy stops fire when the last trade price rises to or above the trigger;
/// sell stops fire when it falls to or below. Fired stops leave the manager
/// in one batch and never re-arm.
#[derive(Debug, Default)]
pub struct StopOrderManager {
    buy_stops: BTreeMap<Price, Vec<(OrderId, OrderHandle)>>,
    sell_stops: BTreeMap<Price, Vec<(OrderId, OrderHandle)>>,
    lookup: HashMap<OrderId, (Side, Price)>,
}

impl StopOrderManager {
    /// Parks a stop order under its trigger price, preserving arrival order
    /// within the bucket.
    pub fn add(&mut self, id: OrderId, side: Side, stop_price: Price, handle: OrderHandle) {
        let ladder = match side {
            Side::Buy => &mut self.buy_stops,
            Side::Sell => &mut self.sell_stops,
        };
        ladder.entry(stop_price).or_default().push((id, handle));
        self.lookup.insert(id, (side, stop_price));
    }

    /// Removes a stop by id, collapsing its bucket when it empties.
    ///
    /// Returns the handle of the removed order, or `None` when the id is
    /// unknown.
    pub fn remove(&mut self, id: OrderId) -> Option<OrderHandle> {
        let (side, stop_price) = self.lookup.remove(&id)?;
        let ladder = match side {
            Side::Buy => &mut self.buy_stops,
            Side::Sell => &mut self.sell_stops,
        };
        let bucket = ladder.get_mut(&stop_price)?;
        let pos = bucket.iter().position(|&(entry_id, _)| entry_id == id)?;
        let (_, handle) = bucket.remove(pos);
        if bucket.is_empty() {
            ladder.remove(&stop_price);
        }
        Some(handle)
    }

    /// Drains every stop triggered by `last_trade_price`.
    ///
    /// Buy stops with `stop_price <= last_trade_price` are emitted in
    /// ascending trigger order; sell stops with `stop_price >=
    /// last_trade_price` follow in descending trigger order. Arrival order
    /// is preserved within each bucket.
    pub fn take_triggered(&mut self, last_trade_price: Price) -> Vec<(OrderId, OrderHandle)> {
        let mut fired = Vec::new();

        let buy_prices: Vec<Price> = self
            .buy_stops
            .range(..=last_trade_price)
            .map(|(&price, _)| price)
            .collect();
        for price in buy_prices {
            if let Some(bucket) = self.buy_stops.remove(&price) {
                for (id, handle) in bucket {
                    self.lookup.remove(&id);
                    fired.push((id, handle));
                }
            }
        }

        let sell_prices: Vec<Price> = self
            .sell_stops
            .range(last_trade_price..)
            .map(|(&price, _)| price)
            .collect();
        for price in sell_prices.into_iter().rev() {
            if let Some(bucket) = self.sell_stops.remove(&price) {
                for (id, handle) in bucket {
                    self.lookup.remove(&id);
                    fired.push((id, handle));
                }
            }
        }

        fired
    }

    /// Number of stops waiting to fire.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lookup.len()
    }
}

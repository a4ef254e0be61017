//! Shared constructors for book tests.

use crate::orderbook::OrderBook;
use crate::orders::{NewOrder, OrderId, OrderType, Price, Quantity, Side, TraderId};
use crate::risk::RiskLimits;

/// Limits loose enough that scenario tests never trip the gate by
/// accident.
pub fn permissive_limits() -> RiskLimits {
    RiskLimits {
        max_position: 1_000_000,
        max_order_value: 1_000_000_000_000,
        max_order_qty: 1_000_000,
        daily_loss_limit: 1_000_000_000,
        max_price_deviation: 1.0,
        max_orders_per_sec: 1_000_000,
        max_daily_volume: 1_000_000_000,
    }
}

/// A book with permissive limits for traders 1 through 20 and an unarmed
/// circuit breaker.
pub fn book() -> OrderBook {
    let mut book = OrderBook::new("TEST");
    for trader in 1..=20 {
        book.risk_mut()
            .set_trader_limits(trader, permissive_limits())
            .unwrap();
    }
    book
}

pub fn gtc(id: OrderId, side: Side, price: Price, quantity: Quantity, owner: TraderId) -> NewOrder {
    NewOrder {
        id,
        side,
        price,
        quantity,
        kind: OrderType::Gtc,
        owner_id: owner,
        ..NewOrder::default()
    }
}

pub fn ioc(id: OrderId, side: Side, price: Price, quantity: Quantity, owner: TraderId) -> NewOrder {
    NewOrder {
        kind: OrderType::Ioc,
        ..gtc(id, side, price, quantity, owner)
    }
}

pub fn fok(id: OrderId, side: Side, price: Price, quantity: Quantity, owner: TraderId) -> NewOrder {
    NewOrder {
        kind: OrderType::Fok,
        ..gtc(id, side, price, quantity, owner)
    }
}

pub fn market(id: OrderId, side: Side, quantity: Quantity, owner: TraderId) -> NewOrder {
    NewOrder {
        id,
        side,
        quantity,
        kind: OrderType::Market,
        owner_id: owner,
        ..NewOrder::default()
    }
}

pub fn iceberg(
    id: OrderId,
    side: Side,
    price: Price,
    quantity: Quantity,
    display_size: Quantity,
    owner: TraderId,
) -> NewOrder {
    NewOrder {
        id,
        side,
        price,
        quantity,
        kind: OrderType::Iceberg,
        display_size,
        owner_id: owner,
        ..NewOrder::default()
    }
}

pub fn stop_loss(
    id: OrderId,
    side: Side,
    stop_price: Price,
    quantity: Quantity,
    owner: TraderId,
) -> NewOrder {
    NewOrder {
        id,
        side,
        quantity,
        kind: OrderType::StopLoss,
        stop_price,
        owner_id: owner,
        ..NewOrder::default()
    }
}

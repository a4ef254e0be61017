//! Replay of generated flow with invariant audits along the way.

use matchbook_rs::market_data::MarketDataGenerator;
use matchbook_rs::prelude::*;

fn configured_book() -> OrderBook {
    let mut book = OrderBook::new("E2E");
    let limits = RiskLimits {
        max_position: 100_000,
        max_order_value: 50_000_000_000,
        max_order_qty: 10_000,
        daily_loss_limit: 1_000_000_000,
        max_price_deviation: 0.10,
        max_orders_per_sec: i32::MAX,
        max_daily_volume: 1_000_000_000,
    };
    for trader in 1..=100 {
        book.risk_mut().set_trader_limits(trader, limits).unwrap();
    }
    book.risk_mut().circuit_breaker_mut().set_limits(100_000, 0.50);
    book.risk_mut().mark_to_market(100_000);
    book
}

fn audit_invariants(book: &OrderBook, live_ids: &[OrderId]) {
    // The book never stays crossed.
    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
        assert!(bid < ask, "crossed book: bid {bid} >= ask {ask}");
    }

    // One live order, one arena slot.
    assert_eq!(book.order_count(), book.pool_allocated());

    for &id in live_ids {
        let Some(order) = book.order(id) else { continue };
        if order.kind == OrderType::StopLoss {
            continue;
        }
        assert!(order.display > 0, "resting order {id} with empty display");
        assert!(order.display <= order.display_size);
        assert!(order.display + order.remaining <= order.quantity);
        assert!(
            book.tick_table().is_valid_price(order.price),
            "resting price {} off grid",
            order.price
        );
    }
}

#[test]
fn generated_flow_preserves_book_invariants() {
    let mut book = configured_book();
    let mut generator = MarketDataGenerator::with_seed(777);

    const COUNT: u64 = 5_000;
    let mut live_ids: Vec<OrderId> = Vec::new();
    let mut tape_volume: u64 = 0;

    for order_id in 1..=COUNT {
        if order_id % 50 == 0 {
            generator.update_market_dynamics();
        }
        let record = generator.generate_order(order_id, COUNT);
        let result = book.add_order(NewOrder {
            id: record.order_id,
            side: record.side,
            price: record.price,
            quantity: record.quantity,
            kind: record.kind,
            display_size: record.display_size,
            stop_price: record.stop_price,
            owner_id: record.owner,
            session_id: record.session_id,
            ..NewOrder::default()
        });

        if let Ok(trades) = result {
            for trade in &trades {
                assert!(trade.quantity > 0);
                assert!(trade.price > 0);
                tape_volume += trade.quantity as u64;
            }
            live_ids.push(record.order_id);
        }

        if order_id % 500 == 0 {
            audit_invariants(&book, &live_ids);
            if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
                book.risk_mut().mark_to_market((bid + ask) / 2);
            }
        }
    }

    audit_invariants(&book, &live_ids);

    let stats = book.stats();
    assert_eq!(stats.orders_received, COUNT);
    assert_eq!(stats.volume_traded, tape_volume);
    assert!(stats.trades_executed > 0, "flow never crossed");

    // The depth snapshot agrees with the book accessors.
    let snapshot = book.snapshot(10);
    assert_eq!(snapshot.best_bid, book.best_bid());
    assert_eq!(snapshot.best_ask, book.best_ask());
    for level in snapshot.bids.iter().chain(snapshot.asks.iter()) {
        assert!(level.visible_quantity > 0);
        assert!(level.order_count > 0);
        assert!(book.tick_table().is_valid_price(level.price));
    }
}

#[test]
fn positions_reconcile_with_the_tape() {
    let mut book = configured_book();

    // A closed round trip leaves both traders flat with opposite PnL.
    book.add_order(NewOrder {
        id: 1,
        side: Side::Sell,
        price: 100_000,
        quantity: 10,
        kind: OrderType::Gtc,
        owner_id: 1,
        ..NewOrder::default()
    })
    .unwrap();
    book.add_order(NewOrder {
        id: 2,
        side: Side::Buy,
        price: 100_000,
        quantity: 10,
        kind: OrderType::Gtc,
        owner_id: 2,
        ..NewOrder::default()
    })
    .unwrap();
    book.add_order(NewOrder {
        id: 3,
        side: Side::Buy,
        price: 100_100,
        quantity: 10,
        kind: OrderType::Gtc,
        owner_id: 1,
        ..NewOrder::default()
    })
    .unwrap();
    book.add_order(NewOrder {
        id: 4,
        side: Side::Sell,
        price: 100_100,
        quantity: 10,
        kind: OrderType::Gtc,
        owner_id: 2,
        ..NewOrder::default()
    })
    .unwrap();

    let seller = book.risk().position(1);
    let buyer = book.risk().position(2);
    assert_eq!(seller.quantity, 0);
    assert_eq!(buyer.quantity, 0);
    // Trader 1 sold at 100_000 and bought back at 100_100.
    assert_eq!(seller.realized_pnl, -1_000);
    assert_eq!(buyer.realized_pnl, 1_000);
    assert_eq!(seller.daily_volume, 20);
    assert_eq!(buyer.daily_volume, 20);
}

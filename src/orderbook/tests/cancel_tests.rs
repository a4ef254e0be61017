//! Cancellation round-trips and level collapse.

use super::test_helpers::{book, gtc, stop_loss};
use crate::orders::Side;

#[test]
fn cancel_round_trip_restores_book_and_arena() {
    let mut book = book();
    let allocated_before = book.pool_allocated();

    book.add_order(gtc(1, Side::Buy, 100, 10, 1)).unwrap();
    assert!(book.cancel_order(1));

    assert_eq!(book.order_count(), 0);
    assert_eq!(book.bid_levels(), 0);
    assert_eq!(book.pool_allocated(), allocated_before);
    // The id is gone from the index.
    assert!(!book.cancel_order(1));
    assert!(book.order(1).is_none());
}

#[test]
fn cancel_unknown_id_returns_false() {
    let mut book = book();
    assert!(!book.cancel_order(404));
    assert_eq!(book.stats().orders_cancelled, 0);
}

#[test]
fn cancel_collapses_only_emptied_levels() {
    let mut book = book();
    book.add_order(gtc(1, Side::Buy, 100, 10, 1)).unwrap();
    book.add_order(gtc(2, Side::Buy, 100, 5, 2)).unwrap();
    book.add_order(gtc(3, Side::Buy, 99, 5, 3)).unwrap();

    assert!(book.cancel_order(1));
    // The 100 level still has order 2.
    assert_eq!(book.bid_levels(), 2);
    assert_eq!(book.best_bid(), Some(100));

    assert!(book.cancel_order(2));
    assert_eq!(book.bid_levels(), 1);
    assert_eq!(book.best_bid(), Some(99));
}

#[test]
fn cancel_delegates_stops_to_the_stop_manager() {
    let mut book = book();
    book.add_order(stop_loss(1, Side::Sell, 99, 5, 1)).unwrap();
    assert_eq!(book.pending_stop_count(), 1);

    assert!(book.cancel_order(1));
    assert_eq!(book.pending_stop_count(), 0);
    assert_eq!(book.order_count(), 0);
    assert_eq!(book.pool_allocated(), 0);
}

#[test]
fn cancelled_order_no_longer_matches() {
    let mut book = book();
    book.add_order(gtc(1, Side::Sell, 100, 10, 1)).unwrap();
    book.cancel_order(1);

    let trades = book.add_order(gtc(2, Side::Buy, 100, 10, 2)).unwrap();
    assert!(trades.is_empty());
    assert_eq!(book.best_bid(), Some(100));
}

#[test]
fn cancel_partially_filled_order() {
    let mut book = book();
    book.add_order(gtc(1, Side::Sell, 100, 10, 1)).unwrap();
    book.add_order(gtc(2, Side::Buy, 100, 4, 2)).unwrap();

    assert_eq!(book.order(1).unwrap().display, 6);
    assert!(book.cancel_order(1));
    assert_eq!(book.ask_levels(), 0);
    assert_eq!(book.pool_allocated(), 0);
}

//! Order book error types.

use crate::orders::{OrderId, Quantity};
use crate::risk::RiskRejection;
use std::fmt;

/// Errors that can occur when submitting orders to the book.
///
/// These are client rejections, not engine faults: the book state is
/// unchanged (and no trade has occurred) whenever one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OrderBookError {
    /// The id is already attached to a live (resting or stop) order.
    DuplicateOrderId(OrderId),

    /// Quantity was zero or negative.
    InvalidQuantity(Quantity),

    /// The order arena is exhausted and growth is disabled.
    PoolExhausted {
        /// Total slot capacity at the time of rejection.
        capacity: usize,
    },

    /// The pre-trade risk gate refused the order.
    RiskRejected(RiskRejection),
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::DuplicateOrderId(id) => {
                write!(f, "order id {id} is already live")
            }
            OrderBookError::InvalidQuantity(quantity) => {
                write!(f, "quantity must be positive, got {quantity}")
            }
            OrderBookError::PoolExhausted { capacity } => {
                write!(f, "order pool exhausted at capacity {capacity}")
            }
            OrderBookError::RiskRejected(reason) => {
                write!(f, "risk rejected: {reason}")
            }
        }
    }
}

impl std::error::Error for OrderBookError {}

impl From<RiskRejection> for OrderBookError {
    fn from(reason: RiskRejection) -> Self {
        OrderBookError::RiskRejected(reason)
    }
}

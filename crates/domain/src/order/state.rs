//! Order status machine.

use serde::{Deserialize, Serialize};

/// The status of a committed order.
///
/// Status transitions:
/// ```text
/// Unpaid ──► Uncomment ──► Finished
///   │            ▲
///   │   Unsent ──► Unreceived
///   │     │
///   └─────┴──► Canceled
/// ```
///
/// Checkout only ever creates `Unpaid` or `Unsent` orders; everything after
/// that is driven by payment confirmation and fulfilment outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Waiting for online payment.
    Unpaid,

    /// Paid or cash on delivery, awaiting shipment.
    Unsent,

    /// Shipped, awaiting receipt.
    Unreceived,

    /// Completed, pending the buyer's review.
    Uncomment,

    /// Reviewed (terminal state).
    Finished,

    /// Cancelled (terminal state).
    Canceled,
}

impl OrderStatus {
    /// Returns the persisted code.
    pub fn code(&self) -> i16 {
        match self {
            OrderStatus::Unpaid => 1,
            OrderStatus::Unsent => 2,
            OrderStatus::Unreceived => 3,
            OrderStatus::Uncomment => 4,
            OrderStatus::Finished => 5,
            OrderStatus::Canceled => 6,
        }
    }

    /// Parses a persisted code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(OrderStatus::Unpaid),
            2 => Some(OrderStatus::Unsent),
            3 => Some(OrderStatus::Unreceived),
            4 => Some(OrderStatus::Uncomment),
            5 => Some(OrderStatus::Finished),
            6 => Some(OrderStatus::Canceled),
            _ => None,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "Unpaid",
            OrderStatus::Unsent => "Unsent",
            OrderStatus::Unreceived => "Unreceived",
            OrderStatus::Uncomment => "Uncomment",
            OrderStatus::Finished => "Finished",
            OrderStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

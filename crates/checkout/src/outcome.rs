//! Checkout requests and outcomes.

use common::{AddressId, OrderId, UserId};
use domain::{Money, Order, OrderStatus, PayMethod};
use serde::{Deserialize, Serialize};

/// Storefront return codes.
pub mod codes {
    pub const OK: &str = "0";
    pub const PARAM_ERR: &str = "4001";
    pub const ORDER_FAILED: &str = "5000";
    pub const STOCK_ERR: &str = "5001";
    pub const CONTENTION: &str = "5002";
    pub const TIMED_OUT: &str = "5003";
}

/// A request to turn the user's selected cart lines into an order.
///
/// `pay_method` is the raw code as submitted by the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub pay_method: i16,
}

impl CheckoutRequest {
    pub fn new(user_id: UserId, address_id: AddressId, pay_method: PayMethod) -> Self {
        Self {
            user_id,
            address_id,
            pay_method: pay_method.code(),
        }
    }
}

/// What the buyer sees of a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub pay_method: PayMethod,
    pub line_count: usize,
    pub total_count: u32,
    pub total_amount: Money,
    pub freight: Money,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id().clone(),
            status: order.status(),
            pay_method: order.header().pay_method,
            line_count: order.lines().len(),
            total_count: order.total_count(),
            total_amount: order.total_amount(),
            freight: order.freight(),
        }
    }
}

/// Result of a checkout attempt. Every variant except `Committed` means
/// nothing from the attempt was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutOutcome {
    /// The order and its lines were committed.
    Committed(OrderSummary),
    /// Some line could not be covered by stock.
    InsufficientStock,
    /// The address does not exist, is deleted, or belongs to someone else.
    AddressInvalid,
    /// The pay method code is not recognised.
    InvalidPayMethod,
    /// No cart line was selected.
    EmptyCart,
    /// A stock row kept changing under every retry.
    Contention,
    /// The attempt ran past its deadline.
    TimedOut,
    /// A persistence or catalog fault.
    CommitFailed,
}

impl CheckoutOutcome {
    /// Returns the storefront return code.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutOutcome::Committed(_) => codes::OK,
            CheckoutOutcome::InsufficientStock => codes::STOCK_ERR,
            CheckoutOutcome::AddressInvalid
            | CheckoutOutcome::InvalidPayMethod
            | CheckoutOutcome::EmptyCart => codes::PARAM_ERR,
            CheckoutOutcome::Contention => codes::CONTENTION,
            CheckoutOutcome::TimedOut => codes::TIMED_OUT,
            CheckoutOutcome::CommitFailed => codes::ORDER_FAILED,
        }
    }

    /// Returns a short label, used as the metrics `reason`.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutOutcome::Committed(_) => "committed",
            CheckoutOutcome::InsufficientStock => "insufficient_stock",
            CheckoutOutcome::AddressInvalid => "address_invalid",
            CheckoutOutcome::InvalidPayMethod => "invalid_pay_method",
            CheckoutOutcome::EmptyCart => "empty_cart",
            CheckoutOutcome::Contention => "contention",
            CheckoutOutcome::TimedOut => "timed_out",
            CheckoutOutcome::CommitFailed => "commit_failed",
        }
    }

    /// Returns true if an order was committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, CheckoutOutcome::Committed(_))
    }

    /// Returns true if the same request may succeed when retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutOutcome::InsufficientStock
                | CheckoutOutcome::Contention
                | CheckoutOutcome::TimedOut
        )
    }

    /// Returns the committed order, if any.
    pub fn order(&self) -> Option<&OrderSummary> {
        match self {
            CheckoutOutcome::Committed(summary) => Some(summary),
            _ => None,
        }
    }
}

impl std::fmt::Display for CheckoutOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutOutcome::Committed(summary) => write!(f, "committed {}", summary.order_id),
            other => write!(f, "{}", other.reason()),
        }
    }
}

//! Checkout attempt state machine.

use serde::{Deserialize, Serialize};

/// The state of one checkout attempt.
///
/// State transitions:
/// ```text
/// Started ──► Reserving(0) ──► … ──► Reserving(n) ──► AllReserved ──► Persisted ──► Succeeded
///    │             │                                       │              │
///    └─────────────┴──────────────► RolledBack ◄───────────┴──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Transaction open, savepoint taken, no stock touched yet.
    #[default]
    Started,

    /// Reserving the cart line at this position.
    Reserving { line: usize },

    /// Every line is reserved and appended to the order.
    AllReserved,

    /// Freight added and totals written; waiting for commit.
    Persisted,

    /// The transaction committed (terminal state).
    Succeeded,

    /// All work of the attempt was discarded (terminal state).
    RolledBack,
}

impl CheckoutState {
    /// Returns true if the attempt may move from this state to `next`.
    pub fn can_advance_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;

        match (*self, next) {
            (Succeeded | RolledBack, _) => false,
            (_, RolledBack) => true,
            (Started, Reserving { line: 0 }) => true,
            (Reserving { line }, Reserving { line: following }) => following == line + 1,
            (Reserving { .. }, AllReserved) => true,
            (AllReserved, Persisted) => true,
            (Persisted, Succeeded) => true,
            _ => false,
        }
    }

    /// Returns true while stock may have been written by this attempt.
    pub fn holds_reservations(&self) -> bool {
        matches!(
            self,
            CheckoutState::Reserving { .. } | CheckoutState::AllReserved | CheckoutState::Persisted
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Started => "Started",
            CheckoutState::Reserving { .. } => "Reserving",
            CheckoutState::AllReserved => "AllReserved",
            CheckoutState::Persisted => "Persisted",
            CheckoutState::Succeeded => "Succeeded",
            CheckoutState::RolledBack => "RolledBack",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutState::Reserving { line } => write!(f, "Reserving({line})"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

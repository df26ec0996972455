//! Order aggregate and related types.

mod aggregate;
mod assembler;
mod settlement;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderHeader, OrderLine};
pub use assembler::{OrderAssembler, order_number};
pub use settlement::{SettlementLine, SettlementPreview};
pub use state::OrderStatus;
pub use value_objects::{Money, PayMethod};

use thiserror::Error;

/// Errors that can occur while assembling an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Freight has already been added; the order is closed.
    #[error("Order is already finalized")]
    AlreadyFinalized,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// An amount or count does not fit its fixed-point representation.
    #[error("Order total overflow")]
    Overflow,

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Unknown persisted status code.
    #[error("Unknown order status code: {0}")]
    UnknownStatus(i16),

    /// Unknown persisted pay method code.
    #[error("Unknown pay method code: {0}")]
    UnknownPayMethod(i16),
}

//! Domain layer for the storefront checkout core.
//!
//! This crate provides the data model the checkout path works on:
//! - Catalog rows (SKU, address) as read from the store
//! - Order header and line items with fixed-point money
//! - The order assembler that accumulates totals and freight
//! - Settlement preview pricing for the checkout page

pub mod catalog;
pub mod order;

pub use catalog::{Address, Sku};
pub use order::{
    Money, Order, OrderAssembler, OrderError, OrderHeader, OrderLine, OrderStatus, PayMethod,
    SettlementLine, SettlementPreview, order_number,
};

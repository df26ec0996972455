//! Checkout core for the storefront.
//!
//! This crate turns a user's selected cart lines into a committed order
//! while many buyers compete for the same stock:
//! 1. Validate the pay method and shipping address
//! 2. Reserve stock per line with compare-and-set retries
//! 3. Assemble the order and add freight
//! 4. Commit, then purge the purchased cart lines
//!
//! If any line fails, every write of the attempt is rolled back.

pub mod cart;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod outcome;
pub mod payment;
pub mod retry;
pub mod state;

pub use cart::CartSnapshotReader;
pub use config::CheckoutConfig;
pub use error::{CheckoutError, PaymentError, Result};
pub use ledger::{InventoryLedger, Reservation, ReserveAttempt};
pub use orchestrator::CheckoutOrchestrator;
pub use outcome::{CheckoutOutcome, CheckoutRequest, OrderSummary, codes};
pub use payment::{PaymentConfirmation, PaymentService};
pub use retry::RetryPolicy;
pub use state::CheckoutState;

//! Persistence collaborators for the checkout core.
//!
//! The checkout path never talks to a database or cart cache directly; it
//! goes through the traits in [`store`]. Two backends are provided:
//! an in-memory one used by tests and the simulator, and PostgreSQL.

pub mod cart;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cart::InMemoryCartStore;
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use store::{
    AddressBook, CartStore, Catalog, CheckoutStore, OrderRepository, PaymentRecord,
    StoreTransaction,
    validate_savepoint_name,
};

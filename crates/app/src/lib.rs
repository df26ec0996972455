//! Checkout simulator.
//!
//! Seeds a store with one hot SKU and a crowd of buyers, runs every
//! checkout concurrently, confirms payment for the winners and reports
//! the result. Uses PostgreSQL when `DATABASE_URL` is set and the
//! in-memory store otherwise.

pub mod config;
pub mod error;
pub mod sim;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use sim::{SeedStore, SimReport};

use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore};

/// Runs the simulation against the configured backend.
pub async fn run(config: &AppConfig) -> Result<SimReport> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(u32::try_from(config.customers.clamp(1, 32)).unwrap_or(32))
                .connect(url)
                .await?;
            let store = PostgresStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL store");
            sim::run(store, config).await
        }
        None => {
            tracing::info!("using in-memory store");
            sim::run(InMemoryStore::new(), config).await
        }
    }
}

//! Simulator error types.

use store::StoreError;
use thiserror::Error;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store error while seeding or inspecting.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Could not connect to the database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A buyer task panicked or was cancelled.
    #[error("Buyer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The seeded SKU disappeared during the run.
    #[error("Seeded SKU missing after run")]
    MissingSku,

    /// Summed revenue does not fit in the money type.
    #[error("Revenue overflow")]
    RevenueOverflow,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for simulator results.
pub type Result<T> = std::result::Result<T, AppError>;

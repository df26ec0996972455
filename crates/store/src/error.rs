use domain::OrderError;
use thiserror::Error;

/// Errors that can occur when interacting with a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A row with the same key already exists.
    #[error("Duplicate {entity}: {id}")]
    Duplicate { entity: &'static str, id: String },

    /// Savepoint name is not a plain identifier.
    #[error("Invalid savepoint name: {0}")]
    InvalidSavepoint(String),

    /// Rollback or release of a savepoint that was never created.
    #[error("Unknown savepoint: {0}")]
    UnknownSavepoint(String),

    /// A stored row could not be mapped back to the domain model.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// The backend refused or failed the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A persisted code did not map to a domain value.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

//! Error types for the order store.

use fil_inventory::InventoryError;
use thiserror::Error;

/// Result type alias for order store operations.
pub type OrderResult<T> = Result<T, OrderError>;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order store unavailable: {0}")]
    Collaborator(#[from] InventoryError),

    #[error("setting {key} is not a JSON string (found {found})")]
    UnexpectedValue { key: String, found: String },

    #[error("malformed order map in setting {key}: {source}")]
    Malformed {
        key: String,
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

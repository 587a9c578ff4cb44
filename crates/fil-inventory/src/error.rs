//! Error types for inventory collaborator calls.

use fil_core::SpoolId;
use thiserror::Error;

/// Result type alias for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("spool #{0} not found")]
    SpoolNotFound(SpoolId),

    #[error("request failed: {0}")]
    Request(String),

    #[error("api error: status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl InventoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, InventoryError::SpoolNotFound(_))
    }
}

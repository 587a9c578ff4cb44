//! Move executor error types.

use fil_inventory::InventoryError;
use fil_orders::OrderError;
use thiserror::Error;

pub type MoveResult<T> = Result<T, MoveError>;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("no spool matches {0:?}")]
    NotFound(String),

    #[error("{selector:?} matches {count} spools; use a spool id or run interactively")]
    Ambiguous { selector: String, count: usize },

    #[error("move cancelled, nothing was changed")]
    Cancelled,

    #[error(transparent)]
    Orders(#[from] OrderError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

//! Planner error types.

use fil_inventory::InventoryError;
use fil_move::MoveError;
use thiserror::Error;

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("unknown printer: {0}")]
    UnknownPrinter(String),

    #[error("printer {0} has no slot locations")]
    NoSlots(String),

    #[error("project {project} has no plate #{plate}")]
    PlateNotFound { project: String, plate: usize },

    #[error("answer {answer} does not fit the pending decision")]
    UnexpectedAnswer { answer: String },

    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("move error: {0}")]
    Move(#[from] MoveError),
}

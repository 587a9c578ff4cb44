//! Outcome of a move batch.

use std::fmt;

use fil_core::{DestSpec, SpoolId, location_label};

use crate::error::MoveError;

/// One resolved move, as applied to the order lists.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMove {
    pub selector: String,
    pub spool: SpoolId,
    /// Display line of the spool before the move.
    pub label: String,
    pub from: String,
    pub to: DestSpec,
    /// Destination list length after the spool was removed from it.
    pub list_len: usize,
    /// 0-based index the spool landed at.
    pub index: usize,
}

/// Before/after order list of one touched location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChange {
    pub location: String,
    pub before: Vec<SpoolId>,
    pub after: Vec<SpoolId>,
}

#[derive(Debug)]
pub struct MoveFailure {
    pub selector: String,
    pub error: MoveError,
}

#[derive(Debug, Default)]
pub struct MoveReport {
    pub dry_run: bool,
    pub debug: bool,
    /// Moves applied to the order lists. On a real run, only those whose
    /// location update also succeeded.
    pub moves: Vec<PlannedMove>,
    pub order_changes: Vec<OrderChange>,
    pub failures: Vec<MoveFailure>,
}

impl MoveReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, selector: &str, error: MoveError) {
        self.failures.push(MoveFailure {
            selector: selector.to_string(),
            error,
        });
    }
}

fn render_ids(ids: &[SpoolId]) -> String {
    let items: Vec<String> = ids.iter().map(|id| format!("#{id}")).collect();
    format!("[{}]", items.join(", "))
}

impl fmt::Display for MoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run, nothing was changed.")?;
        }
        for mv in &self.moves {
            let verb = if self.dry_run { "Would move" } else { "Moved" };
            writeln!(
                f,
                "{verb} {}: {} -> {}",
                mv.label,
                location_label(&mv.from),
                mv.to
            )?;
            if self.debug {
                let requested = mv
                    .to
                    .position
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "append".to_string());
                writeln!(
                    f,
                    "  slot: requested {requested}, list length {}, placed at {}",
                    mv.list_len,
                    mv.index + 1
                )?;
            }
        }
        if self.dry_run && !self.order_changes.is_empty() {
            writeln!(f, "Order changes:")?;
            for change in &self.order_changes {
                writeln!(
                    f,
                    "  {}: {} -> {}",
                    location_label(&change.location),
                    render_ids(&change.before),
                    render_ids(&change.after)
                )?;
            }
        }
        for failure in &self.failures {
            writeln!(f, "error: {}: {}", failure.selector, failure.error)?;
        }
        Ok(())
    }
}

//! MoveExecutor: batch moves and the single-spool primitives the
//! planner builds on.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use fil_core::{AliasTable, DestSpec, Spool, SpoolId};
use fil_inventory::{Inventory, SpoolQuery};
use fil_orders::{self as orders, LocationOrders};

use crate::error::{MoveError, MoveResult};
use crate::report::{MoveReport, OrderChange, PlannedMove};

/// One `selector → destination` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Spool id, or a filament name to search for.
    pub selector: String,
    /// Destination token, `location[:slot]`.
    pub destination: String,
}

impl MoveRequest {
    pub fn new(selector: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            destination: destination.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    pub dry_run: bool,
    /// Report requested vs. clamped slot for each move.
    pub debug: bool,
    /// Narrow name searches to this source location.
    pub from: Option<String>,
}

/// Answer from an interactive disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Selected(SpoolId),
    Cancelled,
}

/// Picks one spool when a selector matches several.
pub trait SpoolChooser {
    /// `matches` are the spools the selector hit; `others` are the rest
    /// of the search scope, offered after them.
    fn choose(&mut self, selector: &str, matches: &[Spool], others: &[Spool]) -> Choice;
}

struct Resolved {
    selector: String,
    spool: SpoolId,
    dest: DestSpec,
}

pub struct MoveExecutor<'a> {
    inventory: &'a dyn Inventory,
    aliases: &'a AliasTable,
}

impl<'a> MoveExecutor<'a> {
    pub fn new(inventory: &'a dyn Inventory, aliases: &'a AliasTable) -> Self {
        Self { inventory, aliases }
    }

    /// Run a batch of moves.
    ///
    /// Returns `Err` only when the batch as a whole cannot proceed: the
    /// chooser cancelled, or the order map could not be loaded or saved.
    /// Everything else is collected in [`MoveReport::failures`].
    pub fn run(
        &self,
        requests: &[MoveRequest],
        options: &MoveOptions,
        mut chooser: Option<&mut dyn SpoolChooser>,
    ) -> MoveResult<MoveReport> {
        let mut report = MoveReport {
            dry_run: options.dry_run,
            debug: options.debug,
            ..MoveReport::default()
        };
        let from = options
            .from
            .as_deref()
            .map(|loc| self.aliases.resolve_location(loc));

        // Resolve every selector before touching anything so a cancel
        // discards the whole batch.
        let mut resolved = Vec::new();
        for request in requests {
            let chooser = chooser.as_mut().map(|c| &mut **c as &mut dyn SpoolChooser);
            match self.resolve_selector(&request.selector, from.as_deref(), chooser) {
                Ok(spool) => resolved.push(Resolved {
                    selector: request.selector.clone(),
                    spool,
                    dest: DestSpec::parse(&request.destination, self.aliases),
                }),
                Err(MoveError::Cancelled) => return Err(MoveError::Cancelled),
                Err(err) => report.fail(&request.selector, err),
            }
        }

        let mut spools = Vec::new();
        for item in resolved {
            match self.inventory.get_spool(item.spool) {
                Ok(spool) => spools.push((item, spool)),
                Err(err) => report.fail(&item.selector, err.into()),
            }
        }
        if spools.is_empty() {
            return Ok(report);
        }

        let before = orders::load(self.inventory)?;
        let mut after = before.clone();
        let mut touched = BTreeSet::new();
        let mut planned = Vec::new();
        for (item, spool) in &spools {
            touched.insert(spool.location.clone());
            touched.extend(after.locations_containing(spool.id).into_iter().map(str::to_string));
            touched.insert(item.dest.location.clone());

            after.remove_everywhere(spool.id);
            let list_len = after.get(&item.dest.location).len();
            let index = after.insert(&item.dest.location, spool.id, item.dest.position);
            debug!(spool = spool.id, to = %item.dest, index, "move planned");
            planned.push(PlannedMove {
                selector: item.selector.clone(),
                spool: spool.id,
                label: spool.to_string(),
                from: spool.location.clone(),
                to: item.dest.clone(),
                list_len,
                index,
            });
        }

        if options.dry_run {
            report.order_changes = order_changes(&before, &after, &touched);
            report.moves = planned;
            return Ok(report);
        }

        orders::save(self.inventory, &after)?;
        for mv in planned {
            match self.inventory.set_spool_location(mv.spool, &mv.to.location) {
                Ok(()) => {
                    info!(spool = mv.spool, location = %mv.to.location, "spool moved");
                    report.moves.push(mv);
                }
                Err(err) => {
                    warn!(spool = mv.spool, "location update failed: {err}");
                    report.fail(&mv.selector, err.into());
                }
            }
        }
        Ok(report)
    }

    /// Move one spool: place it in the destination's order list, save
    /// the orders, then set its declared location. Returns the 0-based
    /// index it landed at.
    pub fn move_spool(&self, spool: SpoolId, dest: &DestSpec) -> MoveResult<usize> {
        let mut current = orders::load(self.inventory)?;
        let index = current.place(&dest.location, spool, dest.position);
        orders::save(self.inventory, &current)?;
        self.inventory.set_spool_location(spool, &dest.location)?;
        info!(spool, location = %dest.location, index, "spool moved");
        Ok(index)
    }

    /// Remove a spool from every order list without changing its
    /// declared location.
    pub fn unlist_spool(&self, spool: SpoolId) -> MoveResult<()> {
        let mut current = orders::load(self.inventory)?;
        if current.remove_everywhere(spool) {
            orders::save(self.inventory, &current)?;
            info!(spool, "spool removed from order lists");
        }
        Ok(())
    }

    /// Resolve a selector to one spool id. Numeric selectors are taken
    /// as ids without a lookup.
    pub fn resolve_selector(
        &self,
        selector: &str,
        from: Option<&str>,
        chooser: Option<&mut dyn SpoolChooser>,
    ) -> MoveResult<SpoolId> {
        let trimmed = selector.trim();
        if let Ok(id) = trimmed.trim_start_matches('#').parse::<SpoolId>() {
            return Ok(id);
        }

        let matches = self
            .inventory
            .find_spools(&SpoolQuery::by_name(trimmed).in_location(from))?;
        match matches.len() {
            0 => Err(MoveError::NotFound(selector.to_string())),
            1 => Ok(matches[0].id),
            count => {
                let Some(chooser) = chooser else {
                    return Err(MoveError::Ambiguous {
                        selector: selector.to_string(),
                        count,
                    });
                };
                let others: Vec<Spool> = self
                    .inventory
                    .find_spools(&SpoolQuery::all().in_location(from))?
                    .into_iter()
                    .filter(|spool| !matches.iter().any(|m| m.id == spool.id))
                    .collect();
                match chooser.choose(selector, &matches, &others) {
                    Choice::Selected(id) => Ok(id),
                    Choice::Cancelled => Err(MoveError::Cancelled),
                }
            }
        }
    }
}

fn order_changes(
    before: &LocationOrders,
    after: &LocationOrders,
    touched: &BTreeSet<String>,
) -> Vec<OrderChange> {
    touched
        .iter()
        .map(|location| OrderChange {
            location: location.clone(),
            before: before.get(location).to_vec(),
            after: after.get(location).to_vec(),
        })
        .filter(|change| change.before != change.after)
        .collect()
}

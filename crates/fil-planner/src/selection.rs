//! Which spool to load, where to put it, and what to evict.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use fil_core::{FilamentId, Plate, Project, Spool, SpoolId};

/// One slot location of the chosen printer and what sits in it.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    pub location: String,
    pub capacity: u32,
    pub occupants: Vec<Spool>,
}

impl SlotView {
    pub fn has_space(&self) -> bool {
        self.occupants.len() < self.capacity as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotChoice {
    /// A slot with spare capacity.
    Free(String),
    /// Every slot is full; `spool` has to come out of `location` first.
    Evict { location: String, spool: Spool },
    /// The printer has no slots at all.
    NoSlots,
}

/// Filament kinds the project still needs, split by urgency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeededKinds {
    /// Requirements of the plate being prepared.
    pub current: HashSet<FilamentId>,
    /// Requirements of later pending plates of the same project.
    pub later: HashSet<FilamentId>,
}

impl NeededKinds {
    pub fn contains(&self, kind: FilamentId) -> bool {
        self.current.contains(&kind) || self.later.contains(&kind)
    }
}

/// Filament kinds still needed by the project from `plate_index` on.
pub fn needed_kinds(project: &Project, plate_index: usize) -> NeededKinds {
    let kinds = |plate: &Plate| -> Vec<FilamentId> {
        plate.needs.iter().filter_map(|req| req.filament_id).collect()
    };
    let mut needed = NeededKinds::default();
    for (index, plate) in project.plates.iter().enumerate() {
        if index == plate_index {
            needed.current.extend(kinds(plate));
        } else if index > plate_index && !plate.status.is_completed() {
            needed.later.extend(kinds(plate));
        }
    }
    needed
}

/// Best spool of `kind` to load.
///
/// Preference order: not sitting in any printer slot, then already
/// used, then lowest id.
pub fn select_load_candidate<'s>(
    spools: &'s [Spool],
    kind: FilamentId,
    is_printer_slot: impl Fn(&str) -> bool,
) -> Option<&'s Spool> {
    spools
        .iter()
        .filter(|spool| !spool.archived && spool.filament_id() == kind)
        .min_by_key(|spool| (is_printer_slot(&spool.location), !spool.is_used(), spool.id))
}

/// Spool of `kind` with the most remaining weight, other than `exclude`.
pub fn replacement_for(spools: &[Spool], kind: FilamentId, exclude: SpoolId) -> Option<&Spool> {
    let mut best: Option<&Spool> = None;
    for spool in spools {
        if spool.archived || spool.filament_id() != kind || spool.id == exclude {
            continue;
        }
        if best.is_none_or(|b| spool.remaining_weight > b.remaining_weight) {
            best = Some(spool);
        }
    }
    best
}

/// Eviction rank, lowest goes first: non-needed, then needed only by
/// later plates, then needed by the current plate. Within a tier the
/// least recently used goes first; never-used spools rank after every
/// used one.
fn eviction_rank(spool: &Spool, needed: &NeededKinds) -> (bool, bool, bool, Option<DateTime<Utc>>) {
    let kind = spool.filament_id();
    (
        needed.current.contains(&kind),
        needed.later.contains(&kind),
        spool.last_used.is_none(),
        spool.last_used,
    )
}

/// Pick a slot for one incoming spool.
///
/// A slot with spare capacity wins, the emptiest first. Otherwise the
/// lowest-ranked occupant across all slots is evicted; the first one
/// encountered wins ties.
pub fn choose_slot(slots: &[SlotView], needed: &NeededKinds) -> SlotChoice {
    let mut spare: Option<&SlotView> = None;
    for slot in slots.iter().filter(|slot| slot.has_space()) {
        if spare.is_none_or(|best| slot.occupants.len() < best.occupants.len()) {
            spare = Some(slot);
        }
    }
    if let Some(slot) = spare {
        return SlotChoice::Free(slot.location.clone());
    }

    let mut victim: Option<(&SlotView, &Spool)> = None;
    for slot in slots {
        for spool in &slot.occupants {
            let better = match victim {
                None => true,
                Some((_, current)) => eviction_rank(spool, needed) < eviction_rank(current, needed),
            };
            if better {
                victim = Some((slot, spool));
            }
        }
    }
    match victim {
        Some((slot, spool)) => SlotChoice::Evict {
            location: slot.location.clone(),
            spool: spool.clone(),
        },
        None => SlotChoice::NoSlots,
    }
}

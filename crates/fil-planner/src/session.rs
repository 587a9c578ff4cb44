//! SwapSession: drives the load/evict sequence for one plate.
//!
//! The session walks the plate's requirements in order. Whenever the
//! operator has to act or confirm, [`SwapSession::advance`] returns a
//! [`Decision`] and the session waits; the next `advance` call carries
//! the [`Answer`]. Collaborator failures abort the current requirement
//! only and are recorded as [`SwapEvent::Failed`].

use std::fmt;

use tracing::{debug, info, warn};

use fil_core::{
    AliasTable, DestSpec, FilConfig, FilamentId, Project, Requirement, Spool, SpoolId,
    location_label,
};
use fil_inventory::{Inventory, SpoolQuery};
use fil_move::MoveExecutor;

use crate::error::{PlannerError, PlannerResult};
use crate::selection::{
    NeededKinds, SlotChoice, SlotView, choose_slot, needed_kinds, replacement_for, select_load_candidate,
};

/// Something the operator must decide before the session can continue.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The loaded spool is short; stage `replacement` in another slot?
    ConfirmRestage {
        requirement: String,
        loaded: Spool,
        replacement: Spool,
    },
    /// The best spool sits in another printer's slot; take it anyway?
    ConfirmCrossPrinter {
        requirement: String,
        spool: Spool,
        printer: String,
    },
    /// `spool` must come out of `slot`. Where does it go? A blank
    /// destination keeps its declared location.
    EvictDestination { spool: Spool, slot: String },
    /// Put `spool` into `slot`, then confirm.
    ConfirmLoad {
        spool: Spool,
        slot: String,
        /// 1-based position the spool will take, `None` to append.
        position: Option<usize>,
    },
}

impl Decision {
    /// Answer used when nobody can be asked: never restage or steal
    /// from another printer, keep evicted spools where they are declared,
    /// and perform loads.
    pub fn headless_answer(&self) -> Answer {
        match self {
            Decision::ConfirmRestage { .. } | Decision::ConfirmCrossPrinter { .. } => Answer::No,
            Decision::EvictDestination { .. } => Answer::Destination(String::new()),
            Decision::ConfirmLoad { .. } => Answer::Done,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::ConfirmRestage {
                loaded, replacement, ..
            } => write!(
                f,
                "Spool #{} is low. Load spool #{} ({:.1}g remaining) into another slot now?",
                loaded.id, replacement.id, replacement.remaining_weight
            ),
            Decision::ConfirmCrossPrinter { spool, printer, .. } => write!(
                f,
                "Spool #{} ({}) is in {} on printer {}. Move it to this printer anyway?",
                spool.id, spool.filament.name, spool.location, printer
            ),
            Decision::EvictDestination { spool, slot } => write!(
                f,
                "UNLOAD #{} ({}) from {}. Where are you putting it? (blank keeps it as-is)",
                spool.id, spool.filament.name, slot
            ),
            Decision::ConfirmLoad { spool, slot, .. } => write!(
                f,
                "LOAD #{} ({}) into {} (currently at {}). Confirm once the swap is done.",
                spool.id,
                spool.filament.name,
                slot,
                location_label(&spool.location)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Free-text destination token for an evicted spool.
    Destination(String),
    /// The physical swap is done.
    Done,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Yes => write!(f, "yes"),
            Answer::No => write!(f, "no"),
            Answer::Destination(text) => write!(f, "destination {text:?}"),
            Answer::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwapEvent {
    AlreadyLoaded {
        requirement: String,
        spool: SpoolId,
        location: String,
        remaining: f64,
    },
    Shortfall {
        requirement: String,
        spool: SpoolId,
        remaining: f64,
        required: f64,
    },
    NoCandidate {
        requirement: String,
    },
    Evicted {
        spool: SpoolId,
        from: String,
        to: Option<DestSpec>,
    },
    Loaded {
        spool: SpoolId,
        location: String,
        /// 1-based position in the slot's order list.
        position: usize,
    },
    Skipped {
        requirement: String,
        reason: String,
    },
    Failed {
        requirement: String,
        error: String,
    },
}

impl SwapEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, SwapEvent::NoCandidate { .. } | SwapEvent::Failed { .. })
    }
}

impl fmt::Display for SwapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapEvent::AlreadyLoaded {
                requirement,
                location,
                remaining,
                ..
            } => write!(f, "{requirement} is already loaded in {location} ({remaining:.1}g remaining)"),
            SwapEvent::Shortfall {
                requirement,
                spool,
                remaining,
                required,
            } => write!(
                f,
                "warning: loaded spool #{spool} ({requirement}) has {remaining:.1}g remaining, plate needs {required:.1}g"
            ),
            SwapEvent::NoCandidate { requirement } => {
                write!(f, "error: no spool available for {requirement}")
            }
            SwapEvent::Evicted { spool, from, to } => match to {
                Some(dest) => write!(f, "Unloaded #{spool} from {from} to {dest}"),
                None => write!(f, "Unloaded #{spool} from {from}, location left as-is"),
            },
            SwapEvent::Loaded {
                spool,
                location,
                position,
            } => write!(f, "Loaded #{spool} into {location}:{position}"),
            SwapEvent::Skipped { requirement, reason } => {
                write!(f, "Skipped {requirement}: {reason}")
            }
            SwapEvent::Failed { requirement, error } => write!(f, "error: {requirement}: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapReport {
    pub printer: String,
    pub plate: String,
    pub events: Vec<SwapEvent>,
}

impl SwapReport {
    pub fn swaps_performed(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, SwapEvent::Loaded { .. } | SwapEvent::Evicted { .. }))
    }

    pub fn failure_count(&self) -> usize {
        self.events.iter().filter(|event| event.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

impl fmt::Display for SwapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} on {}:", self.plate, self.printer)?;
        for event in &self.events {
            writeln!(f, "  {event}")?;
        }
        match (self.failure_count(), self.swaps_performed()) {
            (0, true) => writeln!(f, "Swaps complete. Happy printing!"),
            (0, false) => writeln!(f, "Everything ready. Happy printing!"),
            (n, _) => writeln!(f, "Finished with {n} problem(s)."),
        }
    }
}

#[derive(Debug)]
pub enum Step {
    Decision(Decision),
    Finished(SwapReport),
}

/// Waiting state between a returned decision and its answer.
enum Pending {
    Restage {
        req: usize,
        loaded: Spool,
        replacement: Spool,
    },
    CrossPrinter {
        req: usize,
        spool: Spool,
        printer: String,
    },
    Evict {
        req: usize,
        spool: Spool,
        slot: String,
        evicted: Spool,
    },
    Load {
        req: usize,
        spool: Spool,
        slot: String,
        index: Option<usize>,
    },
}

pub struct SwapSession<'a> {
    inventory: &'a dyn Inventory,
    config: &'a FilConfig,
    aliases: &'a AliasTable,
    executor: MoveExecutor<'a>,
    printer: String,
    slots: Vec<String>,
    plate: String,
    requirements: Vec<Requirement>,
    needed: NeededKinds,
    /// Non-archived inventory snapshot, kept current as the session moves spools.
    spools: Vec<Spool>,
    next: usize,
    pending: Option<Pending>,
    events: Vec<SwapEvent>,
}

impl<'a> SwapSession<'a> {
    pub fn new(
        inventory: &'a dyn Inventory,
        config: &'a FilConfig,
        aliases: &'a AliasTable,
        printer: &str,
        project: &Project,
        plate_index: usize,
    ) -> PlannerResult<Self> {
        let slots = config
            .printers
            .get(printer)
            .cloned()
            .ok_or_else(|| PlannerError::UnknownPrinter(printer.to_string()))?;
        if slots.is_empty() {
            return Err(PlannerError::NoSlots(printer.to_string()));
        }
        let plate = project
            .plates
            .get(plate_index)
            .ok_or_else(|| PlannerError::PlateNotFound {
                project: project.name.clone(),
                plate: plate_index,
            })?;
        let spools = inventory.find_spools(&SpoolQuery::all())?;
        debug!(%printer, plate = %plate.name, spools = spools.len(), "swap session opened");

        Ok(Self {
            inventory,
            config,
            aliases,
            executor: MoveExecutor::new(inventory, aliases),
            printer: printer.to_string(),
            slots,
            plate: format!("{} - {}", project.name, plate.name),
            requirements: plate.needs.clone(),
            needed: needed_kinds(project, plate_index),
            spools,
            next: 0,
            pending: None,
            events: Vec::new(),
        })
    }

    /// Move the session forward.
    ///
    /// Pass the answer to the last returned decision, or `None` on the
    /// first call. Calling with `None` while a decision is pending returns
    /// that decision again.
    pub fn advance(&mut self, answer: Option<Answer>) -> PlannerResult<Step> {
        if let Some(pending) = self.pending.take() {
            let Some(answer) = answer else {
                let decision = self.decision_for(&pending);
                self.pending = Some(pending);
                return Ok(Step::Decision(decision));
            };
            if let Some(decision) = self.resolve(pending, answer)? {
                return Ok(Step::Decision(decision));
            }
        }

        while self.next < self.requirements.len() {
            let req = self.next;
            self.next += 1;
            if let Some(decision) = self.start_requirement(req) {
                return Ok(Step::Decision(decision));
            }
        }
        Ok(Step::Finished(self.report()))
    }

    pub fn report(&self) -> SwapReport {
        SwapReport {
            printer: self.printer.clone(),
            plate: self.plate.clone(),
            events: self.events.clone(),
        }
    }

    fn start_requirement(&mut self, req: usize) -> Option<Decision> {
        let requirement = self.requirements[req].clone();
        let label = requirement.label();
        let Some(kind) = requirement.filament_id else {
            warn!(requirement = %label, "requirement has no resolved filament");
            self.record(SwapEvent::NoCandidate { requirement: label });
            return None;
        };

        if let Some(loaded) = self.loaded_spool(kind).cloned() {
            if loaded.remaining_weight >= requirement.amount {
                self.record(SwapEvent::AlreadyLoaded {
                    requirement: label,
                    spool: loaded.id,
                    location: loaded.location.clone(),
                    remaining: loaded.remaining_weight,
                });
                return None;
            }
            warn!(spool = loaded.id, remaining = loaded.remaining_weight, required = requirement.amount, "loaded spool is short");
            self.record(SwapEvent::Shortfall {
                requirement: label,
                spool: loaded.id,
                remaining: loaded.remaining_weight,
                required: requirement.amount,
            });
            let replacement = replacement_for(&self.spools, kind, loaded.id).cloned()?;
            return self.wait(Pending::Restage {
                req,
                loaded,
                replacement,
            });
        }

        let config = self.config;
        let Some(candidate) =
            select_load_candidate(&self.spools, kind, |loc| config.is_printer_slot(loc)).cloned()
        else {
            warn!(requirement = %label, "no spool available");
            self.record(SwapEvent::NoCandidate { requirement: label });
            return None;
        };

        if let Some(printer) = config.printer_for_location(&candidate.location) {
            warn!(spool = candidate.id, %printer, "best spool is loaded in another printer");
            return self.wait(Pending::CrossPrinter {
                req,
                spool: candidate,
                printer: printer.to_string(),
            });
        }
        self.plan_slot(req, candidate)
    }

    fn plan_slot(&mut self, req: usize, spool: Spool) -> Option<Decision> {
        let views = self.slot_views();
        match choose_slot(&views, &self.needed) {
            SlotChoice::Free(slot) => self.wait(Pending::Load {
                req,
                spool,
                slot,
                index: None,
            }),
            SlotChoice::Evict {
                location,
                spool: evicted,
            } => self.wait(Pending::Evict {
                req,
                spool,
                slot: location,
                evicted,
            }),
            SlotChoice::NoSlots => {
                self.record(SwapEvent::Skipped {
                    requirement: self.requirements[req].label(),
                    reason: "printer has no usable slot".to_string(),
                });
                None
            }
        }
    }

    fn resolve(&mut self, pending: Pending, answer: Answer) -> PlannerResult<Option<Decision>> {
        match (pending, answer) {
            (Pending::Restage { req, replacement, .. }, Answer::Yes) => {
                Ok(self.plan_slot(req, replacement))
            }
            (Pending::CrossPrinter { req, spool, .. }, Answer::Yes) => Ok(self.plan_slot(req, spool)),
            (Pending::Restage { req, .. }, Answer::No) => {
                self.skip(req, "replacement not staged");
                Ok(None)
            }
            (Pending::CrossPrinter { req, .. }, Answer::No) => {
                self.skip(req, "spool is loaded in another printer");
                Ok(None)
            }
            (
                Pending::Evict {
                    req,
                    spool,
                    slot,
                    evicted,
                },
                answer @ (Answer::Destination(_) | Answer::No | Answer::Done),
            ) => {
                let destination = match answer {
                    Answer::Destination(text) => text,
                    _ => String::new(),
                };
                Ok(self.evict(req, spool, slot, evicted, &destination))
            }
            (
                Pending::Load {
                    req,
                    spool,
                    slot,
                    index,
                },
                Answer::Yes | Answer::Done,
            ) => {
                self.load(req, &spool, &slot, index);
                Ok(None)
            }
            (Pending::Load { req, .. }, Answer::No) => {
                self.skip(req, "load not confirmed");
                Ok(None)
            }
            (pending, answer) => {
                self.pending = Some(pending);
                Err(PlannerError::UnexpectedAnswer {
                    answer: answer.to_string(),
                })
            }
        }
    }

    fn evict(
        &mut self,
        req: usize,
        spool: Spool,
        slot: String,
        evicted: Spool,
        destination: &str,
    ) -> Option<Decision> {
        let vacated = match fil_orders::load(self.inventory) {
            Ok(orders) => orders.get(&slot).iter().position(|&id| id == evicted.id),
            Err(err) => {
                self.fail(req, err.to_string());
                return None;
            }
        };

        let to = if destination.trim().is_empty() {
            if let Err(err) = self.executor.unlist_spool(evicted.id) {
                self.fail(req, err.to_string());
                return None;
            }
            // Out of the printer physically; the declared location stays
            // for the operator to fix up.
            self.relocate_local(evicted.id, "");
            None
        } else {
            let dest = DestSpec::parse(destination, self.aliases);
            if let Err(err) = self.executor.move_spool(evicted.id, &dest) {
                self.fail(req, err.to_string());
                return None;
            }
            self.relocate_local(evicted.id, &dest.location);
            Some(dest)
        };

        info!(spool = evicted.id, %slot, "spool evicted");
        self.record(SwapEvent::Evicted {
            spool: evicted.id,
            from: slot.clone(),
            to,
        });
        self.wait(Pending::Load {
            req,
            spool,
            slot,
            index: vacated,
        })
    }

    fn load(&mut self, req: usize, spool: &Spool, slot: &str, index: Option<usize>) {
        let dest = DestSpec::new(slot, index.map(|i| i as i64 + 1));
        match self.executor.move_spool(spool.id, &dest) {
            Ok(placed) => {
                self.relocate_local(spool.id, slot);
                self.record(SwapEvent::Loaded {
                    spool: spool.id,
                    location: slot.to_string(),
                    position: placed + 1,
                });
            }
            Err(err) => self.fail(req, err.to_string()),
        }
    }

    fn wait(&mut self, pending: Pending) -> Option<Decision> {
        let decision = self.decision_for(&pending);
        self.pending = Some(pending);
        Some(decision)
    }

    fn decision_for(&self, pending: &Pending) -> Decision {
        match pending {
            Pending::Restage {
                req,
                loaded,
                replacement,
            } => Decision::ConfirmRestage {
                requirement: self.requirements[*req].label(),
                loaded: loaded.clone(),
                replacement: replacement.clone(),
            },
            Pending::CrossPrinter { req, spool, printer } => Decision::ConfirmCrossPrinter {
                requirement: self.requirements[*req].label(),
                spool: spool.clone(),
                printer: printer.clone(),
            },
            Pending::Evict { evicted, slot, .. } => Decision::EvictDestination {
                spool: evicted.clone(),
                slot: slot.clone(),
            },
            Pending::Load {
                spool, slot, index, ..
            } => Decision::ConfirmLoad {
                spool: spool.clone(),
                slot: slot.clone(),
                position: index.map(|i| i + 1),
            },
        }
    }

    /// First spool of `kind` in one of this printer's slots, in slot order.
    fn loaded_spool(&self, kind: FilamentId) -> Option<&Spool> {
        self.slots.iter().find_map(|slot| {
            self.spools
                .iter()
                .find(|spool| &spool.location == slot && spool.filament_id() == kind)
        })
    }

    fn slot_views(&self) -> Vec<SlotView> {
        self.slots
            .iter()
            .map(|slot| SlotView {
                location: slot.clone(),
                capacity: self.config.slot_capacity(slot),
                occupants: self
                    .spools
                    .iter()
                    .filter(|spool| &spool.location == slot)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    fn relocate_local(&mut self, id: SpoolId, location: &str) {
        if let Some(spool) = self.spools.iter_mut().find(|spool| spool.id == id) {
            spool.location = location.to_string();
        }
    }

    fn skip(&mut self, req: usize, reason: &str) {
        self.record(SwapEvent::Skipped {
            requirement: self.requirements[req].label(),
            reason: reason.to_string(),
        });
    }

    fn fail(&mut self, req: usize, error: String) {
        let requirement = self.requirements[req].label();
        warn!(%requirement, %error, "swap step failed");
        self.record(SwapEvent::Failed { requirement, error });
    }

    fn record(&mut self, event: SwapEvent) {
        debug!(%event, "swap event");
        self.events.push(event);
    }
}

/// Drive a session to completion, asking `respond` for every decision.
pub fn run_with(
    session: &mut SwapSession<'_>,
    mut respond: impl FnMut(&Decision) -> Answer,
) -> PlannerResult<SwapReport> {
    let mut answer = None;
    loop {
        match session.advance(answer.take())? {
            Step::Decision(decision) => answer = Some(respond(&decision)),
            Step::Finished(report) => return Ok(report),
        }
    }
}

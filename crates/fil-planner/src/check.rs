//! Plan check: total pending needs against on-hand stock.

use std::collections::HashSet;
use std::fmt;

use fil_core::{DiscoveredPlan, FilamentId, Spool};

use crate::candidates::on_hand;

/// How needs are grouped: by filament id, or by name and material while
/// unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NeedKey {
    Filament(FilamentId),
    Unresolved { name: String, material: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeedStatus {
    Ok,
    Low,
    Unresolved,
}

impl fmt::Display for NeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeedStatus::Ok => write!(f, "OK"),
            NeedStatus::Low => write!(f, "LOW"),
            NeedStatus::Unresolved => write!(f, "UNRESOLVED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeedTotal {
    pub key: NeedKey,
    pub name: String,
    pub required: f64,
    pub on_hand: f64,
    /// A spool of this filament sits in some printer slot.
    pub loaded: bool,
    /// Grams required per project, in first-seen order.
    pub projects: Vec<(String, f64)>,
}

impl NeedTotal {
    pub fn status(&self) -> NeedStatus {
        match self.key {
            NeedKey::Unresolved { .. } => NeedStatus::Unresolved,
            NeedKey::Filament(_) if self.on_hand < self.required => NeedStatus::Low,
            NeedKey::Filament(_) => NeedStatus::Ok,
        }
    }

    pub fn shortfall(&self) -> f64 {
        (self.required - self.on_hand).max(0.0)
    }
}

/// A requirement whose amount was never filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroAmountNeed {
    pub project: String,
    pub plate: String,
    pub filament: String,
    pub plan_path: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    /// In first-seen order.
    pub totals: Vec<NeedTotal>,
    pub zero_amount: Vec<ZeroAmountNeed>,
}

impl CheckReport {
    pub fn all_met(&self) -> bool {
        self.totals.iter().all(|total| total.status() == NeedStatus::Ok)
    }
}

/// Aggregate every pending requirement across `plans`.
///
/// `printer_slots` marks which locations count as loaded.
pub fn check_plans(
    plans: &[DiscoveredPlan],
    spools: &[Spool],
    printer_slots: &HashSet<String>,
) -> CheckReport {
    let mut report = CheckReport::default();

    for discovered in plans {
        for (_, project) in discovered.plan.pending_projects() {
            for (_, plate) in project.pending_plates() {
                for req in &plate.needs {
                    if req.amount == 0.0 {
                        report.zero_amount.push(ZeroAmountNeed {
                            project: project.name.clone(),
                            plate: plate.name.clone(),
                            filament: req.label(),
                            plan_path: discovered.path.display().to_string(),
                        });
                    }

                    let key = match req.filament_id {
                        Some(id) => NeedKey::Filament(id),
                        None => NeedKey::Unresolved {
                            name: req.name.clone(),
                            material: req.material.clone(),
                        },
                    };
                    let index = match report.totals.iter().position(|t| t.key == key) {
                        Some(index) => index,
                        None => {
                            report.totals.push(new_total(key, req.label(), spools, printer_slots));
                            report.totals.len() - 1
                        }
                    };
                    let total = &mut report.totals[index];
                    total.required += req.amount;
                    match total.projects.iter_mut().find(|(name, _)| *name == project.name) {
                        Some((_, amount)) => *amount += req.amount,
                        None => total.projects.push((project.name.clone(), req.amount)),
                    }
                }
            }
        }
    }

    report
}

fn new_total(key: NeedKey, label: String, spools: &[Spool], printer_slots: &HashSet<String>) -> NeedTotal {
    let (on_hand_weight, loaded) = match key {
        NeedKey::Filament(id) => (
            on_hand(spools, id),
            spools.iter().any(|spool| {
                !spool.archived && spool.filament_id() == id && printer_slots.contains(&spool.location)
            }),
        ),
        NeedKey::Unresolved { .. } => (0.0, false),
    };
    NeedTotal {
        key,
        name: label,
        required: 0.0,
        on_hand: on_hand_weight,
        loaded,
        projects: Vec::new(),
    }
}

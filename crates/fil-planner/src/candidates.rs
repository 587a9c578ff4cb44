//! Plate candidates: swap cost and readiness for every pending plate.

use std::path::PathBuf;

use fil_core::{DiscoveredPlan, FilamentId, Plate, Spool};

/// One pending plate, scored against a printer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateCandidate {
    pub plan_path: PathBuf,
    pub project_index: usize,
    pub plate_index: usize,
    pub project_name: String,
    pub plate_name: String,
    /// Requirements whose filament is not loaded in any of the printer's slots.
    pub swap_cost: usize,
    /// Every requirement is covered by non-archived stock.
    pub is_ready: bool,
}

impl PlateCandidate {
    pub fn label(&self) -> String {
        format!("{} - {}", self.project_name, self.plate_name)
    }
}

fn loaded_in(slots: &[String], spools: &[Spool], kind: FilamentId) -> bool {
    spools
        .iter()
        .any(|spool| spool.filament_id() == kind && slots.contains(&spool.location))
}

/// Requirements not served by a spool sitting in one of `slots`.
/// Unresolved requirements always count.
pub fn swap_cost(plate: &Plate, slots: &[String], spools: &[Spool]) -> usize {
    plate
        .needs
        .iter()
        .filter(|req| match req.filament_id {
            Some(kind) => !loaded_in(slots, spools, kind),
            None => true,
        })
        .count()
}

/// Non-archived remaining weight of one filament kind.
pub fn on_hand(spools: &[Spool], kind: FilamentId) -> f64 {
    spools
        .iter()
        .filter(|spool| !spool.archived && spool.filament_id() == kind)
        .map(|spool| spool.remaining_weight)
        .sum()
}

/// True when stock covers every requirement. An unresolved requirement
/// is covered only when it asks for nothing.
pub fn is_ready(plate: &Plate, spools: &[Spool]) -> bool {
    plate.needs.iter().all(|req| {
        let available = req.filament_id.map(|kind| on_hand(spools, kind)).unwrap_or(0.0);
        available >= req.amount
    })
}

/// Score every non-completed plate of every non-completed project.
pub fn enumerate_candidates(
    plans: &[DiscoveredPlan],
    slots: &[String],
    spools: &[Spool],
) -> Vec<PlateCandidate> {
    let mut candidates = Vec::new();
    for discovered in plans {
        for (project_index, project) in discovered.plan.pending_projects() {
            for (plate_index, plate) in project.pending_plates() {
                candidates.push(PlateCandidate {
                    plan_path: discovered.path.clone(),
                    project_index,
                    plate_index,
                    project_name: project.name.clone(),
                    plate_name: plate.name.clone(),
                    swap_cost: swap_cost(plate, slots, spools),
                    is_ready: is_ready(plate, spools),
                });
            }
        }
    }
    candidates
}

/// Index of the ready candidate with the lowest swap cost. The first one
/// found wins ties.
pub fn recommend(candidates: &[PlateCandidate]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.is_ready {
            continue;
        }
        match best {
            Some((_, cost)) if cost <= candidate.swap_cost => {}
            _ => best = Some((index, candidate.swap_cost)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fil_core::{Filament, PlanFile, Project, Requirement, Status};

    fn make_spool(id: u32, kind: FilamentId, remaining: f64, location: &str) -> Spool {
        Spool {
            id,
            filament: Filament {
                id: kind,
                name: format!("kind {kind}"),
                ..Filament::default()
            },
            remaining_weight: remaining,
            used_weight: 0.0,
            location: location.to_string(),
            last_used: None,
            archived: false,
            comment: None,
        }
    }

    fn need(kind: FilamentId, amount: f64) -> Requirement {
        Requirement {
            filament_id: Some(kind),
            amount,
            ..Requirement::default()
        }
    }

    fn plate(name: &str, needs: Vec<Requirement>) -> Plate {
        Plate {
            name: name.to_string(),
            status: Status::Todo,
            needs,
        }
    }

    fn slots() -> Vec<String> {
        vec!["AMS A".to_string()]
    }

    #[test]
    fn readiness_boundary() {
        let spools = vec![make_spool(1, 7, 60.0, "Shelf"), make_spool(2, 7, 40.0, "")];
        assert!(is_ready(&plate("p", vec![need(7, 100.0)]), &spools));
        assert!(!is_ready(&plate("p", vec![need(7, 100.1)]), &spools));

        let short = vec![make_spool(1, 7, 99.9, "Shelf")];
        assert!(!is_ready(&plate("p", vec![need(7, 100.0)]), &short));
    }

    #[test]
    fn archived_stock_does_not_count() {
        let mut archived = make_spool(2, 7, 500.0, "");
        archived.archived = true;
        let spools = vec![make_spool(1, 7, 50.0, ""), archived];
        assert!(!is_ready(&plate("p", vec![need(7, 100.0)]), &spools));
    }

    #[test]
    fn swap_cost_counts_unloaded_kinds() {
        let spools = vec![make_spool(1, 7, 500.0, "AMS A"), make_spool(2, 8, 500.0, "Shelf")];
        assert_eq!(swap_cost(&plate("p", vec![need(7, 10.0)]), &slots(), &spools), 0);
        assert_eq!(swap_cost(&plate("p", vec![need(8, 10.0)]), &slots(), &spools), 1);

        let unresolved = Requirement {
            name: "Mystery".to_string(),
            amount: 5.0,
            ..Requirement::default()
        };
        assert_eq!(swap_cost(&plate("p", vec![unresolved]), &slots(), &spools), 1);
    }

    #[test]
    fn enumerates_pending_plates_only() {
        let mut done = plate("done", vec![need(7, 1.0)]);
        done.status = Status::Completed;
        let plan = PlanFile {
            original_location: None,
            projects: vec![
                Project {
                    name: "Desk".to_string(),
                    status: Status::Todo,
                    plates: vec![done, plate("lid", vec![need(8, 10.0)])],
                },
                Project {
                    name: "Old".to_string(),
                    status: Status::Completed,
                    plates: vec![plate("x", vec![])],
                },
            ],
        };
        let plans = vec![DiscoveredPlan {
            path: PathBuf::from("desk.yaml"),
            plan,
        }];
        let spools = vec![make_spool(2, 8, 500.0, "Shelf")];

        let candidates = enumerate_candidates(&plans, &slots(), &spools);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].plate_index, 1);
        assert_eq!(candidates[0].label(), "Desk - lid");
        assert_eq!(candidates[0].swap_cost, 1);
        assert!(candidates[0].is_ready);
    }

    #[test]
    fn recommend_prefers_ready_then_cheapest_then_first() {
        let make = |cost: usize, ready: bool| PlateCandidate {
            plan_path: PathBuf::new(),
            project_index: 0,
            plate_index: 0,
            project_name: String::new(),
            plate_name: String::new(),
            swap_cost: cost,
            is_ready: ready,
        };
        let candidates = vec![make(0, false), make(2, true), make(1, true), make(1, true)];
        assert_eq!(recommend(&candidates), Some(2));
        assert_eq!(recommend(&[make(0, false)]), None);
    }
}

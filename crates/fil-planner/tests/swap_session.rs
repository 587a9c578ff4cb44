use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use fil_core::{
    AliasTable, DiscoveredPlan, FilConfig, Filament, FilamentId, PlanFile, Plate, Project,
    Requirement, Spool, SpoolId, Status,
};
use fil_inventory::{Inventory, MemoryInventory};
use fil_orders::ORDERS_SETTING_KEY;
use fil_planner::{
    Answer, Decision, PlannerError, Step, SwapEvent, SwapSession, enumerate_candidates, recommend,
    run_with,
};

const KIND_X: FilamentId = 1;
const KIND_Y: FilamentId = 2;
const KIND_Z: FilamentId = 3;

fn make_spool(id: SpoolId, kind: FilamentId, location: &str, remaining: f64) -> Spool {
    Spool {
        id,
        filament: Filament {
            id: kind,
            name: format!("Kind {kind}"),
            material: "PLA".to_string(),
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

fn used_on(mut spool: Spool, day: u32) -> Spool {
    spool.used_weight = 100.0;
    spool.last_used = Some(Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap());
    spool
}

fn test_config(printers: &[(&str, &[&str])], capacity: &[(&str, u32)]) -> FilConfig {
    FilConfig {
        printers: printers
            .iter()
            .map(|(name, slots)| {
                (
                    name.to_string(),
                    slots.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect::<BTreeMap<_, _>>(),
        location_capacity: capacity
            .iter()
            .map(|(loc, cap)| (loc.to_string(), *cap))
            .collect::<HashMap<_, _>>(),
        ..FilConfig::default()
    }
}

fn need(kind: FilamentId, amount: f64) -> Requirement {
    Requirement {
        filament_id: Some(kind),
        name: format!("Kind {kind}"),
        amount,
        ..Requirement::default()
    }
}

fn project(plates: Vec<Vec<Requirement>>) -> Project {
    Project {
        name: "Desk".to_string(),
        status: Status::Todo,
        plates: plates
            .into_iter()
            .enumerate()
            .map(|(i, needs)| Plate {
                name: format!("Plate {}", i + 1),
                status: Status::Todo,
                needs,
            })
            .collect(),
    }
}

fn seed_orders(inv: &MemoryInventory, json: &str) {
    inv.set_raw_setting(ORDERS_SETTING_KEY, serde_json::json!(json));
}

fn expect_decision(step: Step) -> Decision {
    match step {
        Step::Decision(decision) => decision,
        Step::Finished(report) => panic!("expected a decision, finished with {report:?}"),
    }
}

#[test]
fn evicts_sole_occupant_and_loads_into_vacated_position() {
    let inv = MemoryInventory::with_spools([
        used_on(make_spool(5, KIND_X, "AMS A", 400.0), 2),
        used_on(make_spool(7, KIND_Y, "Shelf", 800.0), 1),
        make_spool(8, KIND_Y, "Shelf", 1000.0),
    ]);
    seed_orders(&inv, r#"{"AMS A":[5],"Shelf":[7,8]}"#);
    let config = test_config(&[("A", &["AMS A"])], &[("AMS A", 1)]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_Y, 100.0)]]);

    let plans = vec![DiscoveredPlan {
        path: PathBuf::from("desk.yaml"),
        plan: PlanFile {
            original_location: None,
            projects: vec![job.clone()],
        },
    }];
    let spools = inv.find_spools(&fil_inventory::SpoolQuery::all()).unwrap();
    let candidates = enumerate_candidates(&plans, &config.printers["A"], &spools);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].swap_cost, 1);
    assert!(candidates[0].is_ready);
    assert_eq!(recommend(&candidates), Some(0));

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();

    let decision = expect_decision(session.advance(None).unwrap());
    match &decision {
        Decision::EvictDestination { spool, slot } => {
            assert_eq!(spool.id, 5);
            assert_eq!(slot, "AMS A");
        }
        other => panic!("expected eviction prompt, got {other:?}"),
    }

    let decision = expect_decision(
        session
            .advance(Some(Answer::Destination("Shelf:1".to_string())))
            .unwrap(),
    );
    match &decision {
        Decision::ConfirmLoad {
            spool,
            slot,
            position,
        } => {
            assert_eq!(spool.id, 7);
            assert_eq!(slot, "AMS A");
            assert_eq!(*position, Some(1));
        }
        other => panic!("expected load prompt, got {other:?}"),
    }

    let report = match session.advance(Some(Answer::Done)).unwrap() {
        Step::Finished(report) => report,
        Step::Decision(d) => panic!("unexpected decision {d:?}"),
    };
    assert!(report.swaps_performed());
    assert!(!report.has_failures());
    assert!(report.events.contains(&SwapEvent::Loaded {
        spool: 7,
        location: "AMS A".to_string(),
        position: 1,
    }));

    assert_eq!(inv.get_spool(5).unwrap().location, "Shelf");
    assert_eq!(inv.get_spool(7).unwrap().location, "AMS A");
    let orders = fil_orders::load(&inv).unwrap();
    assert_eq!(orders.get("AMS A"), &[7]);
    assert_eq!(orders.get("Shelf"), &[5, 8]);
}

#[test]
fn already_loaded_needs_no_decision() {
    let inv = MemoryInventory::with_spools([make_spool(1, KIND_Y, "AMS A", 500.0)]);
    let config = test_config(&[("A", &["AMS A"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_Y, 500.0)]]);

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let report = run_with(&mut session, |d| panic!("unexpected decision {d:?}")).unwrap();

    assert!(!report.swaps_performed());
    assert!(matches!(
        report.events[0],
        SwapEvent::AlreadyLoaded { spool: 1, .. }
    ));
}

#[test]
fn short_loaded_spool_offers_fullest_replacement() {
    let inv = MemoryInventory::with_spools([
        make_spool(1, KIND_Y, "AMS A", 50.0),
        make_spool(2, KIND_Y, "Shelf", 600.0),
        make_spool(3, KIND_Y, "Drawer", 700.0),
    ]);
    seed_orders(&inv, r#"{"AMS A":[1]}"#);
    let config = test_config(&[("A", &["AMS A"])], &[("AMS A", 2)]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_Y, 100.0)]]);

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let decision = expect_decision(session.advance(None).unwrap());
    match &decision {
        Decision::ConfirmRestage {
            loaded,
            replacement,
            ..
        } => {
            assert_eq!(loaded.id, 1);
            assert_eq!(replacement.id, 3);
        }
        other => panic!("expected restage prompt, got {other:?}"),
    }

    let decision = expect_decision(session.advance(Some(Answer::Yes)).unwrap());
    assert!(matches!(
        decision,
        Decision::ConfirmLoad { ref slot, position: None, .. } if slot == "AMS A"
    ));

    let report = run_with(&mut session, |_| Answer::Done).unwrap();
    assert!(matches!(report.events[0], SwapEvent::Shortfall { spool: 1, .. }));
    assert!(report.events.contains(&SwapEvent::Loaded {
        spool: 3,
        location: "AMS A".to_string(),
        position: 2,
    }));
    assert_eq!(fil_orders::load(&inv).unwrap().get("AMS A"), &[1, 3]);
}

#[test]
fn declined_restage_is_skipped() {
    let inv = MemoryInventory::with_spools([
        make_spool(1, KIND_Y, "AMS A", 50.0),
        make_spool(2, KIND_Y, "Shelf", 600.0),
    ]);
    let config = test_config(&[("A", &["AMS A"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_Y, 100.0)]]);

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let report = run_with(&mut session, Decision::headless_answer).unwrap();

    assert!(matches!(report.events[1], SwapEvent::Skipped { .. }));
    assert_eq!(inv.get_spool(2).unwrap().location, "Shelf");
}

#[test]
fn spool_in_other_printer_needs_confirmation() {
    let spools = [make_spool(4, KIND_Y, "AMS B", 900.0)];
    let config = test_config(&[("A", &["AMS A"]), ("B", &["AMS B"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_Y, 100.0)]]);

    let headless = MemoryInventory::with_spools(spools.clone());
    let mut session = SwapSession::new(&headless, &config, &aliases, "A", &job, 0).unwrap();
    let report = run_with(&mut session, Decision::headless_answer).unwrap();
    assert!(matches!(report.events[0], SwapEvent::Skipped { .. }));
    assert_eq!(headless.get_spool(4).unwrap().location, "AMS B");

    let confirmed = MemoryInventory::with_spools(spools);
    let mut session = SwapSession::new(&confirmed, &config, &aliases, "A", &job, 0).unwrap();
    let decision = expect_decision(session.advance(None).unwrap());
    assert!(matches!(
        decision,
        Decision::ConfirmCrossPrinter { ref printer, .. } if printer == "B"
    ));
    let report = run_with(&mut session, |_| Answer::Yes).unwrap();
    assert!(report.swaps_performed());
    assert_eq!(confirmed.get_spool(4).unwrap().location, "AMS A");
}

#[test]
fn eviction_spares_kinds_the_project_still_needs() {
    let inv = MemoryInventory::with_spools([
        used_on(make_spool(10, KIND_Z, "S1", 800.0), 1),
        used_on(make_spool(11, KIND_X, "S2", 800.0), 20),
        make_spool(12, KIND_Y, "Shelf", 800.0),
    ]);
    seed_orders(&inv, r#"{"S1":[10],"S2":[11],"Shelf":[12]}"#);
    let config = test_config(&[("A", &["S1", "S2"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_Y, 100.0)], vec![need(KIND_Z, 100.0)]]);

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let decision = expect_decision(session.advance(None).unwrap());
    assert!(matches!(
        decision,
        Decision::EvictDestination { ref spool, ref slot } if spool.id == 11 && slot == "S2"
    ));

    let report = run_with(&mut session, Decision::headless_answer).unwrap();
    assert!(report.events.contains(&SwapEvent::Evicted {
        spool: 11,
        from: "S2".to_string(),
        to: None,
    }));

    // Left without a destination: declared location untouched, unlisted.
    assert_eq!(inv.get_spool(11).unwrap().location, "S2");
    let orders = fil_orders::load(&inv).unwrap();
    assert!(orders.locations_containing(11).is_empty());
    assert_eq!(orders.get("S2"), &[12]);
    assert_eq!(inv.get_spool(10).unwrap().location, "S1");
}

#[test]
fn eviction_keeps_spools_the_current_plate_uses() {
    let inv = MemoryInventory::with_spools([
        used_on(make_spool(1, KIND_X, "S1", 800.0), 1),
        used_on(make_spool(2, KIND_Z, "S2", 800.0), 20),
        make_spool(3, KIND_Y, "Shelf", 800.0),
    ]);
    seed_orders(&inv, r#"{"S1":[1],"S2":[2],"Shelf":[3]}"#);
    let config = test_config(&[("A", &["S1", "S2"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![
        vec![need(KIND_X, 100.0), need(KIND_Y, 100.0)],
        vec![need(KIND_Z, 100.0)],
    ]);

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let decision = expect_decision(session.advance(None).unwrap());
    assert!(matches!(
        decision,
        Decision::EvictDestination { ref spool, ref slot } if spool.id == 2 && slot == "S2"
    ));

    let report = run_with(&mut session, Decision::headless_answer).unwrap();
    assert!(!report.has_failures());
    assert!(matches!(report.events[0], SwapEvent::AlreadyLoaded { .. }));
    assert_eq!(inv.get_spool(1).unwrap().location, "S1");
    assert_eq!(inv.get_spool(3).unwrap().location, "S2");
    assert_eq!(fil_orders::load(&inv).unwrap().get("S1"), &[1]);
}

#[test]
fn collaborator_failure_aborts_only_that_requirement() {
    let inv = MemoryInventory::with_spools([
        make_spool(1, KIND_X, "Shelf", 500.0),
        make_spool(2, KIND_Y, "Shelf", 500.0),
    ]);
    inv.fail_location_updates_for(1);
    let config = test_config(&[("A", &["S1", "S2"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_X, 10.0), need(KIND_Y, 10.0)]]);

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let report = run_with(&mut session, Decision::headless_answer).unwrap();

    assert_eq!(report.failure_count(), 1);
    assert!(matches!(report.events[0], SwapEvent::Failed { .. }));
    assert_eq!(inv.get_spool(2).unwrap().location, "S1");
}

#[test]
fn unresolved_requirement_has_no_candidate() {
    let inv = MemoryInventory::with_spools([make_spool(1, KIND_X, "Shelf", 500.0)]);
    let config = test_config(&[("A", &["S1"])], &[]);
    let aliases = AliasTable::default();
    let mut job = project(vec![vec![need(KIND_X, 10.0)]]);
    job.plates[0].needs.insert(
        0,
        Requirement {
            name: "Mystery Silk".to_string(),
            amount: 20.0,
            ..Requirement::default()
        },
    );

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let report = run_with(&mut session, Decision::headless_answer).unwrap();

    assert_eq!(
        report.events[0],
        SwapEvent::NoCandidate {
            requirement: "Mystery Silk".to_string()
        }
    );
    assert!(report.has_failures());
    assert_eq!(inv.get_spool(1).unwrap().location, "S1");
}

#[test]
fn mismatched_answer_keeps_decision_pending() {
    let inv = MemoryInventory::with_spools([make_spool(1, KIND_X, "Shelf", 500.0)]);
    let config = test_config(&[("A", &["S1"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![need(KIND_X, 10.0)]]);

    let mut session = SwapSession::new(&inv, &config, &aliases, "A", &job, 0).unwrap();
    let first = expect_decision(session.advance(None).unwrap());
    let err = session
        .advance(Some(Answer::Destination("Shelf".to_string())))
        .err()
        .unwrap();
    assert!(matches!(err, PlannerError::UnexpectedAnswer { .. }));

    let again = expect_decision(session.advance(None).unwrap());
    assert_eq!(first, again);
}

#[test]
fn unknown_printer_is_rejected() {
    let inv = MemoryInventory::new();
    let config = test_config(&[("A", &["S1"])], &[]);
    let aliases = AliasTable::default();
    let job = project(vec![vec![]]);

    let result = SwapSession::new(&inv, &config, &aliases, "Z", &job, 0);
    assert!(matches!(result, Err(PlannerError::UnknownPrinter(_))));
}

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context as _, anyhow, bail};
use tracing::{debug, warn};

use fil_core::{DiscoveredPlan, FilConfig, PlanFile, discover_plans};
use fil_inventory::{Inventory, SpoolQuery};
use fil_planner::{
    CheckReport, NeedStatus, PlateCandidate, SwapSession, check_plans, enumerate_candidates,
    recommend, run_with,
};

use super::Context;
use crate::prompt::Prompter;

pub struct NextArgs {
    pub file: Option<PathBuf>,
    pub printer: Option<String>,
    /// 1-based position in the candidate listing.
    pub plate: Option<usize>,
    pub interactive: bool,
}

/// Working directory first, then the configured plans directory.
fn plan_dirs(config: &FilConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut dirs = vec![std::env::current_dir().context("reading working directory")?];
    if let Some(dir) = &config.plans_dir {
        dirs.push(dir.clone());
    }
    Ok(dirs)
}

fn load_explicit(path: &PathBuf) -> anyhow::Result<DiscoveredPlan> {
    let plan = PlanFile::from_file(path)?;
    Ok(DiscoveredPlan {
        path: path.clone(),
        plan,
    })
}

pub fn next(ctx: &Context, args: NextArgs) -> anyhow::Result<()> {
    if ctx.config.printers.is_empty() {
        bail!("no printers configured; add a [printers] table to fil.toml");
    }
    let mut prompter = args.interactive.then(Prompter::stdio);

    let printer = match args.printer {
        Some(name) => {
            if !ctx.config.printers.contains_key(&name) {
                bail!("unknown printer '{name}'");
            }
            name
        }
        None => pick_printer(&ctx.config, prompter.as_mut())?,
    };

    let plans = match &args.file {
        Some(path) => vec![load_explicit(path)?],
        None => discover_plans(&plan_dirs(&ctx.config)?),
    };
    if plans.is_empty() {
        println!("No plan files found.");
        return Ok(());
    }

    let client = ctx.connect()?;
    let spools = client.find_spools(&SpoolQuery::all())?;
    let slots = &ctx.config.printers[&printer];
    let candidates = enumerate_candidates(&plans, slots, &spools);
    if candidates.is_empty() {
        println!("No pending plates found.");
        return Ok(());
    }
    let recommended = recommend(&candidates);

    let chosen = match args.plate {
        Some(number) => candidates
            .get(number.wrapping_sub(1))
            .ok_or_else(|| anyhow!("no candidate {number}; there are {}", candidates.len()))?,
        None => match prompter.as_mut() {
            Some(prompter) => {
                let items: Vec<String> = candidates
                    .iter()
                    .enumerate()
                    .map(|(index, candidate)| candidate_line(candidate, recommended == Some(index)))
                    .collect();
                let label = format!("Pending plates for {printer}:");
                match prompter.select(&label, &items, recommended)? {
                    Some(index) => &candidates[index],
                    None => {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }
            }
            None => {
                let index = recommended
                    .ok_or_else(|| anyhow!("no plate is ready; pass --plate to pick one"))?;
                &candidates[index]
            }
        },
    };
    debug!(plate = %chosen.label(), cost = chosen.swap_cost, "plate chosen");

    let project = plans
        .iter()
        .find(|plan| plan.path == chosen.plan_path)
        .and_then(|plan| plan.plan.projects.get(chosen.project_index))
        .ok_or_else(|| anyhow!("plan for '{}' disappeared", chosen.label()))?;

    println!("Preparing {} on {printer}", chosen.label());
    let mut session = SwapSession::new(
        &client,
        &ctx.config,
        &ctx.aliases,
        &printer,
        project,
        chosen.plate_index,
    )?;
    let report = match prompter.as_mut() {
        Some(prompter) => run_with(&mut session, |decision| match prompter.answer(decision) {
            Ok(answer) => answer,
            Err(err) => {
                warn!("prompt failed, using default answer: {err}");
                decision.headless_answer()
            }
        })?,
        None => run_with(&mut session, |decision| decision.headless_answer())?,
    };
    print!("{report}");

    if report.has_failures() {
        bail!("{} step(s) could not be completed", report.failure_count());
    }
    Ok(())
}

fn pick_printer<R, W>(config: &FilConfig, prompter: Option<&mut Prompter<R, W>>) -> anyhow::Result<String>
where
    R: std::io::BufRead,
    W: std::io::Write,
{
    let names: Vec<String> = config.printers.keys().cloned().collect();
    if let [only] = names.as_slice() {
        return Ok(only.clone());
    }
    let Some(prompter) = prompter else {
        bail!("several printers configured; pass --printer ({})", names.join(", "));
    };
    match prompter.select("Printer:", &names, None)? {
        Some(index) => Ok(names[index].clone()),
        None => bail!("no printer selected"),
    }
}

fn candidate_line(candidate: &PlateCandidate, recommended: bool) -> String {
    let marker = if recommended { "* " } else { "  " };
    let readiness = if candidate.is_ready { "ready" } else { "short" };
    format!(
        "{marker}{} [{} swap(s), {readiness}] {}",
        candidate.label(),
        candidate.swap_cost,
        candidate.plan_path.display()
    )
}

pub fn check(ctx: &Context, files: &[PathBuf], by_project: bool) -> anyhow::Result<()> {
    let plans = if files.is_empty() {
        discover_plans(&plan_dirs(&ctx.config)?)
    } else {
        let mut plans = Vec::new();
        for path in files {
            match load_explicit(path) {
                Ok(plan) => plans.push(plan),
                Err(err) => eprintln!("skipping {}: {err:#}", path.display()),
            }
        }
        plans
    };
    if plans.is_empty() {
        println!("No plan files found.");
        return Ok(());
    }

    let client = ctx.connect()?;
    let spools = client.find_spools(&SpoolQuery::all())?;
    let printer_slots: HashSet<String> = ctx.config.printers.values().flatten().cloned().collect();
    let report = check_plans(&plans, &spools, &printer_slots);
    print!("{}", render_check(&report, by_project));
    Ok(())
}

fn render_check(report: &CheckReport, by_project: bool) -> String {
    if report.totals.is_empty() {
        return "No pending filament needs.\n".to_string();
    }
    let width = report
        .totals
        .iter()
        .map(|total| total.name.len())
        .max()
        .unwrap_or(0)
        .max("Filament".len());

    let mut out = format!(
        "{:<width$}  {:>9}  {:>9}  {:<6}  {}\n",
        "Filament", "Needed", "On hand", "Loaded", "Status"
    );
    for total in &report.totals {
        let status = match total.status() {
            NeedStatus::Low => format!("{} (short {:.1}g)", total.status(), total.shortfall()),
            status => status.to_string(),
        };
        out.push_str(&format!(
            "{:<width$}  {:>8.1}g  {:>8.1}g  {:<6}  {status}\n",
            total.name,
            total.required,
            total.on_hand,
            if total.loaded { "yes" } else { "no" },
        ));
        if by_project {
            for (project, amount) in &total.projects {
                out.push_str(&format!("    {project}: {amount:.1}g\n"));
            }
        }
    }
    for zero in &report.zero_amount {
        out.push_str(&format!(
            "warning: {} / {} needs {} with no amount ({})\n",
            zero.project, zero.plate, zero.filament, zero.plan_path
        ));
    }
    if !report.all_met() {
        out.push_str("Some filaments are missing or low.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fil_planner::{NeedKey, NeedTotal, ZeroAmountNeed};
    use std::fs;

    fn total(name: &str, key: NeedKey, required: f64, on_hand: f64) -> NeedTotal {
        NeedTotal {
            key,
            name: name.to_string(),
            required,
            on_hand,
            loaded: false,
            projects: vec![("Desk".to_string(), required)],
        }
    }

    #[test]
    fn check_table_marks_low_and_zero_amount() {
        let report = CheckReport {
            totals: vec![
                total("Black", NeedKey::Filament(7), 550.0, 500.0),
                total("Gold", NeedKey::Filament(3), 10.0, 200.0),
            ],
            zero_amount: vec![ZeroAmountNeed {
                project: "Desk".to_string(),
                plate: "Base".to_string(),
                filament: "Silk".to_string(),
                plan_path: "desk.yaml".to_string(),
            }],
        };

        let out = render_check(&report, true);

        assert!(out.contains("LOW (short 50.0g)"));
        assert!(out.contains("    Desk: 550.0g"));
        assert!(out.contains("warning: Desk / Base needs Silk with no amount (desk.yaml)"));
        assert!(out.ends_with("Some filaments are missing or low.\n"));
    }

    #[test]
    fn empty_check_says_so() {
        assert_eq!(render_check(&CheckReport::default(), false), "No pending filament needs.\n");
    }

    #[test]
    fn explicit_plan_file_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("desk.yaml");
        fs::write(
            &good,
            "projects:\n  - name: Desk\n    plates:\n      - name: Base\n        needs: []\n",
        )
        .unwrap();
        let bad = dir.path().join("broken.yaml");
        fs::write(&bad, "projects: [unterminated").unwrap();

        assert_eq!(load_explicit(&good).unwrap().plan.projects[0].name, "Desk");
        assert!(load_explicit(&bad).is_err());
    }

    #[test]
    fn candidate_line_marks_recommendation() {
        let candidate = PlateCandidate {
            plan_path: PathBuf::from("desk.yaml"),
            project_index: 0,
            plate_index: 1,
            project_name: "Desk".to_string(),
            plate_name: "Legs".to_string(),
            swap_cost: 2,
            is_ready: true,
        };
        assert_eq!(
            candidate_line(&candidate, true),
            "* Desk - Legs [2 swap(s), ready] desk.yaml"
        );
    }

    #[test]
    fn single_printer_needs_no_prompt() {
        let mut config = FilConfig::default();
        config.printers.insert("X1C".to_string(), vec!["AMS A".to_string()]);
        let printer = pick_printer::<&[u8], Vec<u8>>(&config, None).unwrap();
        assert_eq!(printer, "X1C");

        config.printers.insert("Mini".to_string(), vec!["Spool holder".to_string()]);
        assert!(pick_printer::<&[u8], Vec<u8>>(&config, None).is_err());
    }
}

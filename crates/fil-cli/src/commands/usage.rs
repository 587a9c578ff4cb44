use std::io::Write;

use anyhow::{Context as _, anyhow, bail};
use tracing::info;

use fil_core::AliasTable;
use fil_inventory::Inventory;
use fil_move::MoveExecutor;

use super::Context;

pub fn run(ctx: &Context, args: &[String], location: Option<&str>, dry_run: bool) -> anyhow::Result<()> {
    if args.len() % 2 != 0 {
        bail!("missing amount for '{}'", args[args.len() - 1]);
    }
    let client = ctx.connect()?;
    let mut stdout = std::io::stdout().lock();
    let failures = record(&client, &ctx.aliases, args, location, dry_run, &mut stdout)?;
    if failures > 0 {
        bail!("{failures} of {} usage record(s) failed", args.len() / 2);
    }
    Ok(())
}

/// Grams rounded to one decimal, ties to even.
fn round_grams(amount: f64) -> f64 {
    (amount * 10.0).round_ties_even() / 10.0
}

/// Record every `selector grams` pair, writing one line per pair to
/// `out`. Returns the number of pairs that failed.
fn record(
    inventory: &dyn Inventory,
    aliases: &AliasTable,
    args: &[String],
    location: Option<&str>,
    dry_run: bool,
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    let executor = MoveExecutor::new(inventory, aliases);
    let location = location.map(|loc| aliases.resolve_location(loc));
    let mut failures = 0;

    for pair in args.chunks(2) {
        let [selector, amount] = pair else {
            bail!("missing amount for '{}'", pair[0]);
        };
        match record_one(inventory, &executor, selector, amount, location.as_deref(), dry_run) {
            Ok(line) => writeln!(out, "{line}")?,
            Err(err) => {
                failures += 1;
                writeln!(out, "error: {selector}: {err:#}")?;
            }
        }
    }
    Ok(failures)
}

fn record_one(
    inventory: &dyn Inventory,
    executor: &MoveExecutor<'_>,
    selector: &str,
    amount: &str,
    location: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<String> {
    let grams: f64 = amount
        .trim()
        .parse()
        .with_context(|| format!("invalid amount '{amount}'"))?;
    if !grams.is_finite() {
        return Err(anyhow!("invalid amount '{amount}'"));
    }
    let grams = round_grams(grams);

    let id = executor.resolve_selector(selector, location, None)?;
    let spool = inventory.get_spool(id)?;
    if grams > 0.0 && spool.remaining_weight < grams {
        bail!(
            "only {:.1}g remaining on #{}, cannot use {grams:.1}g",
            spool.remaining_weight,
            spool.id
        );
    }

    let verb = match (dry_run, grams < 0.0) {
        (true, false) => "Would use",
        (true, true) => "Would return",
        (false, false) => "Used",
        (false, true) => "Returned",
    };
    if !dry_run {
        inventory.use_filament(id, grams)?;
        info!(spool = id, grams, "usage recorded");
    }
    Ok(format!("{verb} {:.1}g: {spool}", grams.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fil_core::{Filament, Spool};
    use fil_inventory::MemoryInventory;

    fn make_spool(id: u32, name: &str, remaining: f64, location: &str) -> Spool {
        Spool {
            id,
            filament: Filament {
                id,
                name: name.to_string(),
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

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run_record(inventory: &MemoryInventory, args: &[&str], dry_run: bool) -> (usize, String) {
        let mut out = Vec::new();
        let failures = record(inventory, &AliasTable::default(), &strings(args), None, dry_run, &mut out).unwrap();
        (failures, String::from_utf8(out).unwrap())
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(round_grams(12.25), 12.2);
        assert_eq!(round_grams(12.75), 12.8);
        assert_eq!(round_grams(-3.04), -3.0);
    }

    #[test]
    fn records_usage_by_id_and_name() {
        let inventory = MemoryInventory::with_spools([
            make_spool(1, "Matte Black", 500.0, "Shelf"),
            make_spool(2, "Silk Gold", 300.0, "Shelf"),
        ]);

        let (failures, output) = run_record(&inventory, &["1", "20", "gold", "12.5"], false);

        assert_eq!(failures, 0);
        assert!(output.contains("Used 20.0g: #1"));
        let spools = inventory.spools();
        assert_eq!(spools.iter().find(|s| s.id == 1).unwrap().remaining_weight, 480.0);
        assert_eq!(spools.iter().find(|s| s.id == 2).unwrap().remaining_weight, 287.5);
    }

    #[test]
    fn refuses_more_than_remaining() {
        let inventory = MemoryInventory::with_spools([make_spool(1, "Black", 10.0, "Shelf")]);

        let (failures, output) = run_record(&inventory, &["1", "25"], false);

        assert_eq!(failures, 1);
        assert!(output.contains("only 10.0g remaining"));
        assert_eq!(inventory.spools()[0].remaining_weight, 10.0);
    }

    #[test]
    fn dry_run_changes_nothing() {
        let inventory = MemoryInventory::with_spools([make_spool(1, "Black", 100.0, "Shelf")]);

        let (failures, output) = run_record(&inventory, &["1", "5"], true);

        assert_eq!(failures, 0);
        assert!(output.starts_with("Would use 5.0g"));
        assert_eq!(inventory.spools()[0].remaining_weight, 100.0);
    }

    #[test]
    fn bad_amount_and_unknown_spool_are_reported() {
        let inventory = MemoryInventory::with_spools([make_spool(1, "Black", 100.0, "Shelf")]);

        let (failures, output) = run_record(&inventory, &["1", "lots", "nothing", "5"], false);

        assert_eq!(failures, 2);
        assert!(output.contains("invalid amount 'lots'"));
        assert!(output.contains("error: nothing:"));
    }
}

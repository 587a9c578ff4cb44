use anyhow::bail;

use fil_core::AliasTable;
use fil_inventory::Inventory;
use fil_move::{MoveExecutor, MoveOptions, MoveReport, MoveRequest, SpoolChooser};

use super::Context;
use crate::prompt::Prompter;

pub struct MoveArgs {
    pub args: Vec<String>,
    pub destination: Option<String>,
    pub from: Option<String>,
    pub dry_run: bool,
    pub debug: bool,
    pub interactive: bool,
}

pub fn run(ctx: &Context, args: MoveArgs) -> anyhow::Result<()> {
    let requests = pair_requests(&args.args, args.destination.as_deref())?;
    let options = MoveOptions {
        dry_run: args.dry_run,
        debug: args.debug,
        from: args.from,
    };
    let client = ctx.connect()?;

    let report = if args.interactive {
        let mut prompter = Prompter::stdio();
        execute(&client, &ctx.aliases, &requests, &options, Some(&mut prompter))?
    } else {
        execute(&client, &ctx.aliases, &requests, &options, None)?
    };
    print!("{report}");

    if report.has_failures() {
        bail!("{} of {} move(s) failed", report.failures.len(), requests.len());
    }
    Ok(())
}

fn execute(
    inventory: &dyn Inventory,
    aliases: &AliasTable,
    requests: &[MoveRequest],
    options: &MoveOptions,
    chooser: Option<&mut dyn SpoolChooser>,
) -> anyhow::Result<MoveReport> {
    let executor = MoveExecutor::new(inventory, aliases);
    Ok(executor.run(requests, options, chooser)?)
}

/// Turn positional arguments into move requests.
///
/// With a shared destination every argument is a selector. Otherwise
/// arguments alternate selector and destination, and a trailing selector
/// without a destination is rejected before anything moves.
fn pair_requests(args: &[String], destination: Option<&str>) -> anyhow::Result<Vec<MoveRequest>> {
    if let Some(destination) = destination {
        return Ok(args
            .iter()
            .map(|selector| MoveRequest::new(selector.as_str(), destination))
            .collect());
    }

    let pairs = args.chunks(2);
    let mut requests = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match pair {
            [selector, destination] => requests.push(MoveRequest::new(selector.as_str(), destination.as_str())),
            [selector] => bail!("missing destination for '{selector}'"),
            _ => unreachable!("chunks(2) yields one or two items"),
        }
    }
    Ok(requests)
}

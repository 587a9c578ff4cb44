use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod prompt;

#[derive(Parser, Debug)]
#[command(
    name = "fil",
    about = "Track spool slots and plan filament swaps against Spoolman",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Config file to use instead of the merged standard locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move spools between locations.
    ///
    /// Arguments alternate selector and destination
    /// (`fil move 12 shelf:2 black ams-a`). With --destination every
    /// argument is a selector. A destination is `LOCATION`,
    /// `LOCATION:POS` (1-based; out-of-range positions clamp to the
    /// start or end) or empty to unlist.
    #[command(visible_alias = "mv")]
    Move {
        #[arg(required = true)]
        args: Vec<String>,
        /// Send every selector to this destination
        #[arg(short, long)]
        destination: Option<String>,
        /// Only match spools declared in this location
        #[arg(short, long)]
        from: Option<String>,
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Print slot indices for each move
        #[arg(long)]
        debug: bool,
        /// Never prompt; ambiguous selectors fail
        #[arg(short = 'n', long)]
        non_interactive: bool,
    },
    /// Record filament usage: pairs of selector and grams.
    ///
    /// A negative amount gives filament back.
    Use {
        #[arg(required = true, allow_negative_numbers = true)]
        args: Vec<String>,
        /// Only match spools declared in this location
        #[arg(short, long)]
        location: Option<String>,
        /// Show what would be recorded without writing anything
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Work with print plans
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
}

#[derive(Subcommand, Debug)]
enum PlanAction {
    /// Pick the next plate for a printer and stage its filament
    Next {
        /// Plan file to use instead of discovering plans
        file: Option<PathBuf>,
        /// Printer to stage for
        #[arg(short, long)]
        printer: Option<String>,
        /// Candidate number from the listing (1-based)
        #[arg(long)]
        plate: Option<usize>,
        /// Never prompt; take the recommendation and default answers
        #[arg(short = 'n', long)]
        non_interactive: bool,
    },
    /// Compare pending filament needs with on-hand stock
    Check {
        /// Plan files to check instead of discovering plans
        files: Vec<PathBuf>,
        /// Break each filament down per project
        #[arg(long)]
        by_project: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "fil=debug" } else { "fil=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = commands::Context::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Move { args, destination, from, dry_run, debug, non_interactive } => {
            let options = commands::moves::MoveArgs {
                args,
                destination,
                from,
                dry_run,
                debug,
                interactive: prompt::interactive_allowed(non_interactive),
            };
            commands::moves::run(&ctx, options)
        }
        Commands::Use { args, location, dry_run } => {
            commands::usage::run(&ctx, &args, location.as_deref(), dry_run)
        }
        Commands::Plan { action } => match action {
            PlanAction::Next { file, printer, plate, non_interactive } => {
                let options = commands::plan::NextArgs {
                    file,
                    printer,
                    plate,
                    interactive: prompt::interactive_allowed(non_interactive),
                };
                commands::plan::next(&ctx, options)
            }
            PlanAction::Check { files, by_project } => {
                commands::plan::check(&ctx, &files, by_project)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_takes_global_flags_and_pairs() {
        let cli = Cli::try_parse_from(["fil", "-v", "mv", "12", "shelf:2", "--dry-run"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Move { args, dry_run, destination, .. } => {
                assert_eq!(args, vec!["12", "shelf:2"]);
                assert!(dry_run);
                assert!(destination.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn move_requires_arguments() {
        assert!(Cli::try_parse_from(["fil", "move"]).is_err());
    }

    #[test]
    fn use_accepts_negative_amounts() {
        let cli = Cli::try_parse_from(["fil", "use", "--", "12", "-4.5"]).unwrap();
        match cli.command {
            Commands::Use { args, .. } => assert_eq!(args, vec!["12", "-4.5"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn plan_next_options() {
        let cli = Cli::try_parse_from([
            "fil", "plan", "next", "desk.yaml", "--printer", "X1C", "--plate", "2", "-n",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                action: PlanAction::Next { file, printer, plate, non_interactive },
            } => {
                assert_eq!(file, Some(PathBuf::from("desk.yaml")));
                assert_eq!(printer.as_deref(), Some("X1C"));
                assert_eq!(plate, Some(2));
                assert!(non_interactive);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn move_help_describes_position_clamping() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let help = cli
            .find_subcommand("move")
            .and_then(|cmd| cmd.get_long_about())
            .map(|about| about.to_string())
            .unwrap();
        assert!(help.contains("out-of-range positions clamp to the"));
        assert!(!help.contains("negative counts from the end"));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["fil", "plan", "check", "--config", "fil.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("fil.toml")));
    }
}

//! surge-sync — keep proxy rule sets, icons and modules in sync with upstream.
//!
//! # Usage
//!
//! ```text
//! surge-sync icons   [--dry-run] [--strict] [--json]
//! surge-sync rules   [--dry-run] [--strict] [--json]
//! surge-sync modules [--dry-run] [--strict] [--json]
//! surge-sync all     [--dry-run] [--strict] [--json]
//! surge-sync diff [icons|rules|modules]
//! surge-sync sources [--class <class>] [--json]
//! ```
//!
//! Global flags: `--root <dir>` (default `.`), `--config <file>` (default
//! `<root>/surge-sync.yaml`), `-v` / `-vv`.
//!
//! Exit codes: `0` success, `1` a destination failed (or, with `--strict`,
//! any source), `2` configuration error.

mod commands;
mod logging;
mod report;
mod runtime;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;

use commands::{diff::DiffArgs, sources::SourcesArgs, sync::SyncArgs};
use surge_core::{ConfigError, ResourceClass};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "surge-sync",
    version,
    about = "Synchronize proxy rule sets, icons and modules from upstream sources",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Working tree holding `icons/`, `rules/` and `modules/`.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Source configuration file [default: <root>/surge-sync.yaml].
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log more to stderr (`-v` info, `-vv` debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync policy-group icons and regenerate the icon index.
    Icons(SyncArgs),

    /// Sync rule sets.
    Rules(SyncArgs),

    /// Sync modules.
    Modules(SyncArgs),

    /// Sync icons, rules and modules in that order.
    All(SyncArgs),

    /// Show unified diffs of what a sync would write. Writes nothing.
    Diff(DiffArgs),

    /// List configured sources.
    Sources(SourcesArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    let result = match cli.command {
        Commands::Icons(args) => args.run(&cli.global, &[ResourceClass::Icons]),
        Commands::Rules(args) => args.run(&cli.global, &[ResourceClass::Rules]),
        Commands::Modules(args) => args.run(&cli.global, &[ResourceClass::Modules]),
        Commands::All(args) => args.run(&cli.global, ResourceClass::all()),
        Commands::Diff(args) => args.run(&cli.global),
        Commands::Sources(args) => args.run(&cli.global),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            if is_config_error(&err) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn is_config_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<ConfigError>())
}

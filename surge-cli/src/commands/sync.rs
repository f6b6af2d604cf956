//! `surge-sync icons|rules|modules|all`: fetch, merge and commit.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use surge_core::ResourceClass;
use surge_sync::Mode;

use crate::{report, runtime, GlobalArgs};

/// Arguments for the sync subcommands.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Fetch, merge and render, but report `Would update` instead of writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Also exit non-zero when any single source failed.
    #[arg(long)]
    pub strict: bool,

    /// Print the run report as JSON instead of status lines.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs, classes: &[ResourceClass]) -> Result<ExitCode> {
        let mode = if self.dry_run { Mode::DryRun } else { Mode::Write };
        let runner = super::load_runner(global, mode)?;
        let run = runtime::execute(&runner, classes)?;

        if self.json {
            report::print_json(&run)?;
        } else {
            report::print_lines(&run);
            report::print_annotations(&run);
        }
        report::print_footer(&run);
        Ok(report::exit_code(&run, self.strict))
    }
}

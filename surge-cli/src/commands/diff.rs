//! `surge-sync diff [class]`: show unified diffs for what a sync would write.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use surge_core::ResourceClass;
use surge_sync::Mode;

use crate::{report, runtime, GlobalArgs};

/// Arguments for `surge-sync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Resource class to diff; all classes when omitted.
    pub class: Option<ResourceClass>,
}

impl DiffArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let classes = match self.class {
            Some(class) => vec![class],
            None => ResourceClass::all().to_vec(),
        };
        let runner = super::load_runner(global, Mode::Diff)?;
        let run = runtime::execute(&runner, &classes)?;

        let mut printed = 0usize;
        for dest in run.summaries.iter().flat_map(|s| &s.destinations) {
            if dest.status.is_failed() {
                eprintln!("{}", report::status_line(dest));
            }
            if let Some(diff) = &dest.diff {
                print!("{diff}");
                if !diff.ends_with('\n') {
                    println!();
                }
                printed += 1;
            }
        }
        if printed == 0 {
            println!("No differences.");
        }

        report::print_footer(&run);
        Ok(report::exit_code(&run, false))
    }
}

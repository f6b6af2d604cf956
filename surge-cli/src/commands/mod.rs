pub mod diff;
pub mod sources;
pub mod sync;

use anyhow::{Context, Result};

use surge_sync::{Mode, Runner};

use crate::GlobalArgs;

/// Load the source configuration and build a runner for `mode`.
pub(crate) fn load_runner(global: &GlobalArgs, mode: Mode) -> Result<Runner> {
    Runner::load(&global.root, global.config.as_deref(), mode).with_context(|| {
        format!(
            "failed to prepare sync for working tree {}",
            global.root.display()
        )
    })
}

//! Tokio bootstrap and ctrl-c handling for a single run.

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use surge_core::ResourceClass;
use surge_sync::{RunReport, Runner, Shutdown};

/// Run `classes` to completion on a fresh multi-thread runtime.
///
/// Ctrl-c stops new fetches from starting; in-flight ones finish or time out
/// and the report comes back marked as interrupted.
pub fn execute(runner: &Runner, classes: &[ResourceClass]) -> Result<RunReport> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async {
        let shutdown = Shutdown::new();
        let listener = spawn_signal_listener(&shutdown);
        let report = runner.run(classes, &shutdown).await;
        shutdown.close();
        let _ = listener.await;
        report.context("sync run failed")
    })
}

fn spawn_signal_listener(shutdown: &Shutdown) -> JoinHandle<()> {
    let shutdown = shutdown.clone();
    let mut done_rx = shutdown.subscribe();
    tokio::spawn(async move {
        tokio::select! {
            _ = done_rx.recv() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    tracing::warn!("received ctrl-c, letting in-flight fetches finish");
                    shutdown.trigger();
                }
                Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
            },
        }
    })
}

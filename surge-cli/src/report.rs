//! Terminal rendering of a [`RunReport`].
//!
//! Stdout carries one status line per destination (or the JSON report);
//! counts and timing go to stderr.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use surge_sync::{DestinationReport, DestinationStatus, RunReport};

pub fn print_lines(report: &RunReport) {
    for summary in &report.summaries {
        for dest in &summary.destinations {
            println!("{}", status_line(dest));
        }
    }
}

pub fn print_json(report: &RunReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize run report")?
    );
    Ok(())
}

/// `::error::` / `::warning::` workflow commands, printed when running under
/// GitHub Actions.
pub fn print_annotations(report: &RunReport) {
    if std::env::var("GITHUB_ACTIONS").as_deref() != Ok("true") {
        return;
    }
    for line in annotations(report) {
        println!("{line}");
    }
}

/// Per-class counts, interruption notice and elapsed time, on stderr.
pub fn print_footer(report: &RunReport) {
    for summary in &report.summaries {
        let c = summary.counts();
        eprintln!(
            "{}: {} updated, {} unchanged, {} would update, {} failed",
            summary.resource_class, c.updated, c.unchanged, c.would_update, c.failed
        );
    }
    if report.interrupted {
        eprintln!("{}", "Interrupted: remaining work was skipped".yellow());
    }
    eprintln!(
        "Finished {} destinations in {:.2}s",
        report.destination_count(),
        report.elapsed_secs()
    );
}

pub fn exit_code(report: &RunReport, strict: bool) -> ExitCode {
    if report.is_success(strict) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub fn status_line(dest: &DestinationReport) -> String {
    let path = display_path(&dest.path);
    match &dest.status {
        DestinationStatus::Updated => format!("{} {path}", "Updated".green().bold()),
        DestinationStatus::Unchanged => format!("{} {path}", "Unchanged".bright_black()),
        DestinationStatus::WouldUpdate => format!("{} {path}", "Would update".yellow().bold()),
        DestinationStatus::Failed { reason, .. } => {
            format!("{} {path}: {reason}", "Failed".red().bold())
        }
    }
}

fn annotations(report: &RunReport) -> Vec<String> {
    let mut out = Vec::new();
    for dest in report.summaries.iter().flat_map(|s| &s.destinations) {
        let path = display_path(&dest.path);
        if let DestinationStatus::Failed { reason, .. } = &dest.status {
            out.push(format!("::error::{}", escape_data(&format!("{path}: {reason}"))));
            continue;
        }
        for source in dest.failed_sources() {
            let reason = source.status.reason().unwrap_or_default();
            out.push(format!(
                "::warning::{}",
                escape_data(&format!("{path}: source {} failed: {reason}", source.id))
            ));
        }
    }
    out
}

/// Workflow command data must not contain raw `%`, CR or LF.
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

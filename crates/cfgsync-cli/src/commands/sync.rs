//! Mutating commands: install, add, remove, push, pull
//!
//! Each prints the per-item report and fails (exit 1) when any row failed.

use colored::Colorize;

use cfgsync_core::reporter::report_table;
use cfgsync_core::{Category, SyncEngine, SyncOptions, SyncReport};

use super::{print_json, print_notes};
use crate::error::{CliError, Result};

fn options(dry_run: bool) -> SyncOptions {
    SyncOptions { dry_run }
}

/// Run the install command
pub fn run_install(engine: &SyncEngine, dry_run: bool, json: bool) -> Result<()> {
    let report = engine.install(&options(dry_run))?;
    finish(&report, json)
}

/// Run the add command
pub fn run_add(
    engine: &SyncEngine,
    category: Category,
    name: &str,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let report = engine.add(category, name, &options(dry_run))?;
    finish(&report, json)
}

/// Run the remove command
pub fn run_remove(
    engine: &SyncEngine,
    category: Category,
    name: &str,
    purge: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let report = engine.remove(category, name, purge, &options(dry_run))?;
    finish(&report, json)
}

/// Run the push command
pub fn run_push(engine: &SyncEngine, dry_run: bool, json: bool) -> Result<()> {
    let report = engine.push(&options(dry_run))?;
    finish(&report, json)
}

/// Run the pull command
pub fn run_pull(engine: &SyncEngine, dry_run: bool, json: bool) -> Result<()> {
    let report = engine.pull(&options(dry_run))?;
    finish(&report, json)
}

fn finish(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        print_json(report)?;
    } else {
        print_report(report);
    }

    let failed = report.failures().count();
    if failed > 0 {
        return Err(CliError::user(format!(
            "{} {} failed",
            failed,
            if failed == 1 { "item" } else { "items" }
        )));
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    let suffix = if report.dry_run { " (dry run)" } else { "" };
    println!(
        "{} {}{}",
        "=>".blue().bold(),
        report.operation.as_str(),
        suffix.yellow()
    );
    print_notes(&report.notes);

    if report.rows.is_empty() {
        println!(
            "{} Already synchronized. No changes needed.",
            "OK".green().bold()
        );
        return;
    }

    print!("{}", report_table(report));
    println!();

    let verb = if report.dry_run { "planned" } else { "applied" };
    let status = if report.success() {
        "OK".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "{} {} {}, {} failed, {} unchanged",
        status,
        report.changes(),
        verb,
        report.failures().count(),
        report.unchanged
    );
    if let Some(id) = report.backup {
        println!(
            "   Backup {} taken. Run {} to revert.",
            id.to_string().cyan(),
            format!("cfgsync sync undo {id}").cyan()
        );
    }
}

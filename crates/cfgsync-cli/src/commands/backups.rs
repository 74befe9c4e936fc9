//! Backup listing, pruning and undo

use colored::Colorize;
use serde::Serialize;

use cfgsync_core::reporter::backups_table;
use cfgsync_core::{BackupId, SyncEngine};

use super::print_json;
use crate::error::Result;

#[derive(Serialize)]
struct PruneOutput {
    removed: Vec<BackupId>,
}

/// Run the backups command: list, or prune to the newest `prune` entries.
pub fn run_backups(engine: &SyncEngine, prune: Option<usize>, json: bool) -> Result<()> {
    if let Some(keep) = prune {
        let removed = engine.prune_backups(keep)?;
        if json {
            return print_json(&PruneOutput { removed });
        }
        println!(
            "{} Removed {} backups, kept at most {}.",
            "OK".green().bold(),
            removed.len(),
            keep
        );
        for id in &removed {
            println!("   {} {}", "-".red(), id);
        }
        return Ok(());
    }

    let backups = engine.backups()?;
    if json {
        return print_json(&backups);
    }
    if backups.is_empty() {
        println!("No backups.");
        return Ok(());
    }
    print!("{}", backups_table(&backups));
    Ok(())
}

/// Run the undo command
pub fn run_undo(engine: &SyncEngine, id: Option<BackupId>, json: bool) -> Result<()> {
    let outcome = engine.undo(id)?;
    if json {
        return print_json(&outcome);
    }

    println!(
        "{} Restored backup {}.",
        "OK".green().bold(),
        outcome.id.to_string().cyan()
    );
    for path in &outcome.restored {
        println!("   {} {}", "+".green(), path.display());
    }
    for path in &outcome.removed {
        println!("   {} {}", "-".red(), path.display());
    }
    Ok(())
}

//! Status command implementation

use colored::Colorize;

use cfgsync_core::reporter::status_table;
use cfgsync_core::{LinkState, SyncEngine};

use super::{print_json, print_notes};
use crate::error::Result;

/// Run the status command
///
/// Read-only: prints the inventory of every present environment.
pub fn run_status(engine: &SyncEngine, json: bool) -> Result<()> {
    let snapshot = engine.status()?;
    if json {
        return print_json(&snapshot);
    }

    println!(
        "{} Repository {}",
        "=>".blue().bold(),
        snapshot.repo_root.display().to_string().cyan()
    );
    print_notes(&snapshot.notes);

    let table = status_table(&snapshot);
    if table.is_empty() {
        println!("No items in the repository or its environments.");
        return Ok(());
    }
    print!("{table}");
    println!();
    println!(
        "{} tracked, {} local-only, {} missing, {} broken",
        snapshot.count(LinkState::Tracked).to_string().green(),
        snapshot.count(LinkState::LocalOnly),
        snapshot.count(LinkState::Missing).to_string().yellow(),
        snapshot.count(LinkState::Broken).to_string().red()
    );
    Ok(())
}

//! Validate command implementation

use colored::Colorize;

use cfgsync_core::SyncEngine;
use cfgsync_core::reporter::validation_table;

use super::print_json;
use crate::error::{CliError, Result};

/// Run the validate command
///
/// Fails when any repository item has a violation.
pub fn run_validate(engine: &SyncEngine, json: bool) -> Result<()> {
    let reports = engine.validate()?;
    let invalid = reports.iter().filter(|r| !r.is_valid()).count();

    if json {
        print_json(&reports)?;
    } else if invalid == 0 {
        println!(
            "{} {} items valid.",
            "OK".green().bold(),
            reports.len()
        );
    } else {
        println!("{} Validation failed:", "INVALID".red().bold());
        print!("{}", validation_table(&reports));
    }

    if invalid > 0 {
        return Err(CliError::user(format!(
            "{invalid} of {} items failed validation",
            reports.len()
        )));
    }
    Ok(())
}

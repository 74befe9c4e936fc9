//! Command implementations for cfgsync-cli

pub mod backups;
pub mod status;
pub mod sync;
pub mod validate;

pub use backups::{run_backups, run_undo};
pub use status::run_status;
pub use sync::{run_add, run_install, run_pull, run_push, run_remove};
pub use validate::run_validate;

use colored::Colorize;
use serde::Serialize;

use crate::error::Result;

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_notes(notes: &[String]) {
    for note in notes {
        println!("{} {}", "note:".dimmed(), note);
    }
}

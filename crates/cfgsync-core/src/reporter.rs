//! Plain-text summary tables
//!
//! Tables are rendered without color so they can be piped or asserted on;
//! the CLI decides how to decorate the surrounding output.

use std::fmt;

use crate::backup::BackupSummary;
use crate::inventory::InventorySnapshot;
use crate::sync::{Outcome, SyncReport};
use crate::validate::ValidationReport;

/// Column-aligned text table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        let write_row = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let last = cells.len().saturating_sub(1);
            for (i, cell) in cells.iter().enumerate() {
                if i == last {
                    writeln!(f, "{cell}")?;
                } else {
                    write!(f, "{cell:<width$}  ", width = widths[i])?;
                }
            }
            Ok(())
        };

        write_row(f, &self.headers)?;
        for row in &self.rows {
            write_row(f, row)?;
        }
        Ok(())
    }
}

fn outcome_label(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Planned => "planned".to_string(),
        Outcome::Done => "ok".to_string(),
        Outcome::Failed { kind, message } => format!("{kind}: {message}"),
    }
}

/// One row per (item, target, action).
pub fn report_table(report: &SyncReport) -> Table {
    let mut table = Table::new(["ITEM", "TARGET", "ACTION", "RESULT"]);
    for row in &report.rows {
        table.push([
            row.item.to_string(),
            row.environment.clone().unwrap_or_else(|| "repo".to_string()),
            row.action.to_string(),
            outcome_label(&row.outcome),
        ]);
    }
    table
}

/// One row per entry in every present environment.
pub fn status_table(snapshot: &InventorySnapshot) -> Table {
    let mut table = Table::new(["ITEM", "TARGET", "STATE", "DETAIL"]);
    for entry in snapshot.entries() {
        table.push([
            entry.key.to_string(),
            entry.environment.clone(),
            entry.state.to_string(),
            entry.detail.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub fn backups_table(backups: &[BackupSummary]) -> Table {
    let mut table = Table::new(["ID", "CREATED", "OPERATION", "PATHS"]);
    for backup in backups {
        match &backup.error {
            Some(error) => table.push([
                backup.id.to_string(),
                "-".to_string(),
                "corrupt".to_string(),
                error.clone(),
            ]),
            None => table.push([
                backup.id.to_string(),
                backup.created.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                backup.label.clone(),
                backup.entries.to_string(),
            ]),
        }
    }
    table
}

/// One row per violation; valid items are omitted.
pub fn validation_table(reports: &[ValidationReport]) -> Table {
    let mut table = Table::new(["ITEM", "VIOLATION"]);
    for report in reports {
        for violation in &report.violations {
            table.push([report.item.to_string(), violation.to_string()]);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn columns_are_aligned() {
        let mut table = Table::new(["A", "LONG HEADER", "C"]);
        table.push(["first", "x", "1"]);
        table.push(["s", "yy", "22"]);

        let expected = "\
A      LONG HEADER  C
first  x            1
s      yy           22
";
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn empty_table_renders_headers_only() {
        let table = Table::new(["ID", "CREATED"]);
        assert!(table.is_empty());
        assert_eq!(table.to_string(), "ID  CREATED\n");
    }
}

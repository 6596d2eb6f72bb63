//! CLI command handlers
//!
//! Non-interactive versions of the menu entries, one module per entity.

pub mod class;
pub mod student;

use serde_json::json;
use std::io::{self, Write};

use luokka_core::{ClassAdmin, Directory, Reconciliation};

use crate::output;

/// Add students to a class and report the outcome
///
/// # Errors
/// Returns an error if the class is invalid or missing, or the directory
/// can't be reached
pub fn add<D: Directory>(
    admin: &ClassAdmin<D>,
    class: &str,
    students: &[String],
    as_json: bool,
) -> anyhow::Result<()> {
    let result = admin.add_students(class, &students.join(" "))?;
    let mut out = io::stdout().lock();
    if as_json {
        writeln!(out, "{}", reconciliation_json(&result))?;
    } else {
        output::write_reconciliation(&mut out, &result)?;
    }
    Ok(())
}

fn reconciliation_json(result: &Reconciliation) -> serde_json::Value {
    json!({
        "class": result.class,
        "added": result.added,
        "already_member": result.already_member,
        "not_found": result.not_found,
        "invalid_format": result.invalid_format,
        "added_count": result.added_count(),
        "skipped_count": result.skipped_count(),
    })
}

//! Class CLI commands
//!
//! Handles: luokka class create/list

use clap::Subcommand;
use std::io::{self, Write};

use luokka_core::{ClassAdmin, Directory};

use crate::output;

/// Class commands
#[derive(Subcommand)]
pub enum ClassCommands {
    /// Create a class group
    Create {
        /// Class name, e.g. s23ätiv (normalized to s23ativ)
        name: String,
    },
    /// List all classes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute class command
pub fn execute<D: Directory>(cmd: ClassCommands, admin: &ClassAdmin<D>) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match cmd {
        ClassCommands::Create { name } => {
            let class = admin.create_class(&name)?;
            writeln!(out, "Class created: {class}")?;
        }
        ClassCommands::List { json } => {
            let classes = admin.list_classes()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&classes)?)?;
            } else {
                output::write_classes(&mut out, &classes)?;
            }
        }
    }
    Ok(())
}

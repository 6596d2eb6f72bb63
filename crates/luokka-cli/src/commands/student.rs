//! Student CLI commands
//!
//! Handles: luokka student create/list

use clap::Subcommand;
use std::io::{self, Write};

use luokka_core::{ClassAdmin, Directory};

use crate::output;

/// Student commands
#[derive(Subcommand)]
pub enum StudentCommands {
    /// Create a student account
    Create {
        /// Student id (231054 or o231054)
        id: String,
        /// First name
        #[arg(long)]
        given: String,
        /// Surname
        #[arg(long)]
        surname: String,
        /// Also add the student to this class
        #[arg(long)]
        class: Option<String>,
    },
    /// List student accounts
    List {
        /// Only students in this class
        #[arg(long)]
        class: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute student command
pub fn execute<D: Directory>(cmd: StudentCommands, admin: &ClassAdmin<D>) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match cmd {
        StudentCommands::Create {
            id,
            given,
            surname,
            class,
        } => {
            let uid = admin.create_student(&id, &given, &surname)?;
            writeln!(
                out,
                "Student created: {uid} (password: {})",
                admin.initial_password()
            )?;
            if let Some(class) = class {
                let class = admin.enroll(&uid, &class)?;
                writeln!(out, "Student added to class {class}")?;
            }
        }
        StudentCommands::List { class, json } => {
            let students = admin.list_students(class.as_deref())?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&students)?)?;
            } else {
                output::write_students(&mut out, &students)?;
            }
        }
    }
    Ok(())
}

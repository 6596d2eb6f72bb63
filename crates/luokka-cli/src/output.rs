//! Terminal rendering shared by the menu and the subcommands

use std::io::{self, Write};

use luokka_core::directory::StudentRecord;
use luokka_core::ops::skipped_summary;
use luokka_core::{ClassName, Error, Reconciliation};

const RULE: &str = "------------------------------------------------";

/// Print an operation error with remediation when there is one
pub fn write_error(out: &mut impl Write, err: &Error) -> io::Result<()> {
    writeln!(out, "Error: {err}")?;
    if let Some(hint) = err.remediation() {
        writeln!(out, "{hint}")?;
    }
    Ok(())
}

pub fn write_reconciliation(out: &mut impl Write, result: &Reconciliation) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "Class: {}", result.class)?;
    if !result.added.is_empty() {
        let added: Vec<&str> = result.added.iter().map(|u| u.as_str()).collect();
        writeln!(out, "Added: {}", added.join(", "))?;
    }
    let skipped = skipped_summary(result);
    if !skipped.is_empty() {
        writeln!(out, "Skipped: {}", skipped.join(", "))?;
    }
    writeln!(out, "{RULE}")
}

pub fn write_classes(out: &mut impl Write, classes: &[ClassName]) -> io::Result<()> {
    if classes.is_empty() {
        return writeln!(out, "No classes found.");
    }
    writeln!(out, "Classes:")?;
    for class in classes {
        writeln!(out, "{class}")?;
    }
    Ok(())
}

pub fn write_students(out: &mut impl Write, students: &[StudentRecord]) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "{:<15} {:<20} {:<20}", "ID", "First name", "Surname")?;
    writeln!(out, "{RULE}")?;
    for s in students {
        writeln!(out, "{:<15} {:<20} {:<20}", s.uid, s.given_name, s.surname)?;
    }
    writeln!(out, "{RULE}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use luokka_core::reconcile;
    use luokka_core::MemoryDirectory;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_reconciliation_report() {
        let dir = MemoryDirectory::new()
            .with_group("s23ativ")
            .with_user("o111111", "Aino", "Aalto");
        let class = ClassName::parse("s23ativ").unwrap();
        let result = reconcile(&dir, &class, &["111111", "x1"]).unwrap();

        let text = render(|out| write_reconciliation(out, &result));
        assert!(text.contains("Class: s23ativ"));
        assert!(text.contains("Added: o111111"));
        assert!(text.contains("Skipped: x1 (invalid student id)"));
    }

    #[test]
    fn test_empty_class_list() {
        assert_eq!(render(|out| write_classes(out, &[])), "No classes found.\n");
    }

    #[test]
    fn test_student_table_columns() {
        let text = render(|out| {
            write_students(
                out,
                &[StudentRecord {
                    uid: "o111111".into(),
                    given_name: "Aino".into(),
                    surname: "Aalto".into(),
                }],
            )
        });
        assert!(text.contains("o111111         Aino                 Aalto"));
    }

    #[test]
    fn test_error_with_remediation() {
        let text = render(|out| {
            write_error(out, &Error::DirectoryUnavailable("connection refused".into()))
        });
        assert!(text.starts_with("Error: Directory unavailable: connection refused\n"));
        assert!(text.contains("LUOKKA_PASSWORD"));
    }
}

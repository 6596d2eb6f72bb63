//! Interactive numbered menu
//!
//! Reads answers line by line from any `BufRead` so the whole loop can be
//! driven from tests. End of input behaves like choosing exit.

use std::io::{self, BufRead, Write};

use luokka_core::{ClassAdmin, Directory, Error};

use crate::output;

const CLASS_PROMPT: &str = "Class name (e.g. s23ätiv): ";

/// Menu entries in display order
const ENTRIES: [&str; 6] = [
    "New class",
    "New student",
    "Add students to class",
    "List classes",
    "List students",
    "Exit",
];

pub struct Menu<'a, D, R, W> {
    admin: &'a ClassAdmin<D>,
    input: R,
    out: W,
}

impl<'a, D: Directory, R: BufRead, W: Write> Menu<'a, D, R, W> {
    pub fn new(admin: &'a ClassAdmin<D>, input: R, out: W) -> Self {
        Self { admin, input, out }
    }

    /// Run until the operator exits or input ends.
    ///
    /// # Errors
    /// Returns an error only if the terminal itself fails
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.show()?;
            let Some(choice) = self.prompt("Choose [1-6]: ")? else {
                break;
            };

            let result = match choice.as_str() {
                "1" => self.create_class(),
                "2" => self.create_student(),
                "3" => self.add_students(),
                "4" => self.list_classes(),
                "5" => self.list_students(),
                "6" => break,
                _ => {
                    writeln!(self.out, "Invalid choice")?;
                    continue;
                }
            };

            match result {
                Ok(()) => {}
                Err(Failure::Eof) => break,
                Err(Failure::Op(err)) => {
                    tracing::debug!(code = err.code(), "operation failed");
                    output::write_error(&mut self.out, &err)?;
                }
                Err(Failure::Io(err)) => return Err(err),
            }
        }
        writeln!(self.out, "Done!")
    }

    fn show(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "=============================")?;
        writeln!(self.out, "   FreeIPA class management")?;
        writeln!(self.out, "=============================")?;
        for (i, entry) in ENTRIES.iter().enumerate() {
            writeln!(self.out, "{}) {entry}", i + 1)?;
        }
        Ok(())
    }

    /// Trimmed answer, `None` at end of input
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask(&mut self, label: &str) -> Result<String, Failure> {
        self.prompt(label)?.ok_or(Failure::Eof)
    }

    fn confirm(&mut self, label: &str) -> Result<bool, Failure> {
        Ok(self.ask(label)?.eq_ignore_ascii_case("y"))
    }

    fn create_class(&mut self) -> Step {
        let raw = self.ask(CLASS_PROMPT)?;
        let class = self.admin.create_class(&raw)?;
        writeln!(self.out, "Class created: {class}")?;
        Ok(())
    }

    fn create_student(&mut self) -> Step {
        let raw = self.ask("Student id (231054 / o231054): ")?;
        let (uid, exists) = self.admin.student_exists(&raw)?;
        if exists {
            return Err(Error::AlreadyExists {
                kind: "Student",
                name: uid.to_string(),
            }
            .into());
        }

        let given = self.ask("First name: ")?;
        let surname = self.ask("Surname: ")?;
        let uid = self.admin.create_student(uid.as_str(), &given, &surname)?;
        writeln!(
            self.out,
            "Student created: {uid} (password: {})",
            self.admin.initial_password()
        )?;

        if self.confirm("Add to a class? (y/n): ")? {
            let raw_class = self.ask(CLASS_PROMPT)?;
            let class = self.admin.enroll(&uid, &raw_class)?;
            writeln!(self.out, "Student added to class {class}")?;
        }
        Ok(())
    }

    fn add_students(&mut self) -> Step {
        let students = self.ask("Student ids separated by commas or spaces: ")?;
        let class = self.ask(CLASS_PROMPT)?;
        let result = self.admin.add_students(&class, &students)?;
        output::write_reconciliation(&mut self.out, &result)?;
        Ok(())
    }

    fn list_classes(&mut self) -> Step {
        let classes = self.admin.list_classes()?;
        output::write_classes(&mut self.out, &classes)?;
        Ok(())
    }

    fn list_students(&mut self) -> Step {
        let class = if self.confirm("Filter by class? (y/n): ")? {
            Some(self.ask(CLASS_PROMPT)?)
        } else {
            None
        };

        let students = self.admin.list_students(class.as_deref())?;
        if class.is_some() && students.is_empty() {
            writeln!(self.out, "No students in this class")?;
            return Ok(());
        }
        output::write_students(&mut self.out, &students)?;
        Ok(())
    }
}

/// Why a menu action stopped early
enum Failure {
    Op(Error),
    Io(io::Error),
    Eof,
}

type Step = Result<(), Failure>;

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Self::Op(err)
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

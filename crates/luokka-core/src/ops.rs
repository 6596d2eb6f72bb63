//! Class and student operations
//!
//! [`ClassAdmin`] is what the menu and the subcommands drive. Each method
//! validates operator input, consults the directory, performs the mutation
//! and writes the audit log.

use std::collections::BTreeSet;

use crate::audit::AuditLog;
use crate::directory::{
    Directory, DirectoryError, MemberAdd, MembershipSet, NewStudent, StudentRecord,
};
use crate::error::{Error, Result};
use crate::ident::{split_candidates, ClassName, StudentId};
use crate::reconcile::{reconcile_with_members, Reconciliation};

const CLASS: &str = "Class";
const STUDENT: &str = "Student";

/// Administrative operations against one directory
pub struct ClassAdmin<D> {
    directory: D,
    log: AuditLog,
    initial_password: String,
}

impl<D: Directory> ClassAdmin<D> {
    pub fn new(directory: D, log: AuditLog, initial_password: impl Into<String>) -> Self {
        Self {
            directory,
            log,
            initial_password: initial_password.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &D {
        &self.directory
    }

    #[must_use]
    pub fn audit_log(&self) -> &AuditLog {
        &self.log
    }

    #[must_use]
    pub fn initial_password(&self) -> &str {
        &self.initial_password
    }

    /// Create the group for a new class.
    ///
    /// # Errors
    /// `InvalidFormat` for a bad name, `AlreadyExists` if the group exists
    pub fn create_class(&self, raw: &str) -> Result<ClassName> {
        let class = parse_class(raw)?;

        if self.directory.group_exists(&class)? {
            return Err(Error::AlreadyExists {
                kind: CLASS,
                name: class.to_string(),
            });
        }

        self.directory
            .create_group(&class, &format!("Group for class {class}"))
            .map_err(|e| duplicate_as_exists(e, CLASS, class.as_str()))?;

        tracing::info!(%class, "created class");
        self.log.record(&format!("Created group {class}"));
        Ok(class)
    }

    /// Check a raw student id and whether the account already exists.
    ///
    /// # Errors
    /// `InvalidFormat` for a bad id
    pub fn student_exists(&self, raw_id: &str) -> Result<(StudentId, bool)> {
        let uid = parse_student(raw_id)?;
        let exists = self.directory.user_exists(&uid)?;
        Ok((uid, exists))
    }

    /// Create a student account with the initial password.
    ///
    /// # Errors
    /// `InvalidFormat` for a bad id, `AlreadyExists` if the account exists,
    /// `MissingField` for a blank name
    pub fn create_student(
        &self,
        raw_id: &str,
        given_name: &str,
        surname: &str,
    ) -> Result<StudentId> {
        let (uid, exists) = self.student_exists(raw_id)?;
        if exists {
            return Err(Error::AlreadyExists {
                kind: STUDENT,
                name: uid.to_string(),
            });
        }

        let given_name = given_name.trim();
        let surname = surname.trim();
        if given_name.is_empty() {
            return Err(Error::MissingField("first name"));
        }
        if surname.is_empty() {
            return Err(Error::MissingField("surname"));
        }

        let student = NewStudent {
            uid,
            given_name: given_name.to_string(),
            surname: surname.to_string(),
            initial_password: self.initial_password.clone(),
        };
        self.directory
            .create_user(&student)
            .map_err(|e| duplicate_as_exists(e, STUDENT, student.uid.as_str()))?;

        tracing::info!(uid = %student.uid, "created student");
        self.log.record(&format!("Created user {}", student.uid));
        Ok(student.uid)
    }

    /// Put one student into a class.
    ///
    /// # Errors
    /// `InvalidFormat` for a bad class name, `NotFound` if the class is
    /// missing, `AlreadyMember` if the student is already in it
    pub fn enroll(&self, uid: &StudentId, raw_class: &str) -> Result<ClassName> {
        let class = parse_class(raw_class)?;
        if !self.directory.group_exists(&class)? {
            return Err(Error::NotFound {
                kind: CLASS,
                name: class.to_string(),
            });
        }

        let outcome = self
            .directory
            .add_members(&class, std::slice::from_ref(uid))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Directory(DirectoryError::Protocol("empty member add result".into()))
            })?;

        match outcome {
            MemberAdd::Added => {
                tracing::info!(%uid, %class, "enrolled student");
                self.log.record(&format!("{uid} added to class {class}"));
                Ok(class)
            }
            MemberAdd::AlreadyMember => Err(Error::AlreadyMember {
                student: uid.to_string(),
                class: class.to_string(),
            }),
            MemberAdd::Failed(reason) => Err(Error::MemberAddFailed {
                student: uid.to_string(),
                class: class.to_string(),
                reason,
            }),
        }
    }

    /// Add a comma/whitespace separated list of students to a class.
    ///
    /// # Errors
    /// `InvalidFormat` for a bad class name or an empty list, `NotFound` if
    /// the class is missing, `DirectoryUnavailable` if the batch can't run
    pub fn add_students(&self, raw_class: &str, raw_students: &str) -> Result<Reconciliation> {
        let class = parse_class(raw_class)?;
        let candidates = split_candidates(raw_students);
        if candidates.is_empty() {
            return Err(Error::MissingField("student ids"));
        }

        // Nothing valid to add: report without touching the directory
        if !candidates.iter().any(|raw| StudentId::parse(raw).is_some()) {
            let result = reconcile_with_members(
                &self.directory,
                &class,
                &MembershipSet::default(),
                &candidates,
            )?;
            self.record_reconciliation(&result);
            return Ok(result);
        }

        let members = self
            .directory
            .group_members(&class)?
            .ok_or_else(|| Error::NotFound {
                kind: CLASS,
                name: class.to_string(),
            })?;

        let result = reconcile_with_members(&self.directory, &class, &members, &candidates)?;
        self.record_reconciliation(&result);
        Ok(result)
    }

    fn record_reconciliation(&self, result: &Reconciliation) {
        let class = &result.class;
        if !result.added.is_empty() {
            self.log
                .record(&format!("Added to class {class}: {}", join(&result.added)));
        }
        let skipped = skipped_summary(result);
        if !skipped.is_empty() {
            self.log.record(&format!("Skipped: {}", skipped.join(", ")));
        }
        self.log.record(&format!(
            "{} users added to class {class}",
            result.added_count()
        ));
        self.log.record(&format!(
            "{} users could not be added to class {class}",
            result.skipped_count()
        ));
        tracing::info!(
            %class,
            added = result.added_count(),
            skipped = result.skipped_count(),
            "reconciled class membership"
        );
    }

    /// Names of all groups that are classes, sorted.
    ///
    /// # Errors
    /// Returns an error if the directory can't be queried
    pub fn list_classes(&self) -> Result<Vec<ClassName>> {
        let mut classes: Vec<ClassName> = self
            .directory
            .find_groups(None)?
            .iter()
            .filter_map(|name| ClassName::parse(name).filter(|c| c.as_str() == name))
            .collect();
        classes.sort();
        classes.dedup();
        Ok(classes)
    }

    /// Student accounts, optionally only those in `raw_class`.
    ///
    /// # Errors
    /// `InvalidFormat` for a bad class name, `NotFound` if the class is
    /// missing
    pub fn list_students(&self, raw_class: Option<&str>) -> Result<Vec<StudentRecord>> {
        let members: Option<BTreeSet<String>> = match raw_class {
            Some(raw) => {
                let class = parse_class(raw)?;
                let set = self.directory.group_members(&class)?.ok_or_else(|| {
                    Error::NotFound {
                        kind: CLASS,
                        name: class.to_string(),
                    }
                })?;
                Some(set.all().into_iter().map(str::to_string).collect())
            }
            None => None,
        };

        if members.as_ref().is_some_and(BTreeSet::is_empty) {
            return Ok(Vec::new());
        }

        let mut students: Vec<StudentRecord> = self
            .directory
            .find_users(None)?
            .into_iter()
            .filter(|u| StudentId::from_canonical(&u.uid).is_some())
            .filter(|u| members.as_ref().map_or(true, |m| m.contains(&u.uid)))
            .collect();
        students.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(students)
    }
}

/// Human-readable reasons for every candidate that was not added
#[must_use]
pub fn skipped_summary(result: &Reconciliation) -> Vec<String> {
    result
        .invalid_format
        .iter()
        .map(|r| format!("{} ({})", r.raw, r.reason))
        .chain(result.not_found.iter().map(|u| format!("{u} (no such user)")))
        .chain(
            result
                .already_member
                .iter()
                .map(|u| format!("{u} (already a member)")),
        )
        .collect()
}

fn join(uids: &[StudentId]) -> String {
    uids.iter()
        .map(StudentId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_class(raw: &str) -> Result<ClassName> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::MissingField("class name"));
    }
    ClassName::parse(raw).ok_or_else(|| Error::InvalidFormat {
        what: "class name",
        input: raw.to_string(),
    })
}

fn parse_student(raw: &str) -> Result<StudentId> {
    StudentId::parse(raw).ok_or_else(|| Error::InvalidFormat {
        what: "student id",
        input: raw.trim().to_string(),
    })
}

fn duplicate_as_exists(err: DirectoryError, kind: &'static str, name: &str) -> Error {
    if err.is_duplicate() {
        Error::AlreadyExists {
            kind,
            name: name.to_string(),
        }
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use tempfile::TempDir;

    fn admin(dir: MemoryDirectory, temp: &TempDir) -> ClassAdmin<MemoryDirectory> {
        ClassAdmin::new(dir, AuditLog::new(temp.path().join("audit.log"), 200), "changeme")
    }

    #[test]
    fn test_create_class_canonicalizes() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new(), &temp);

        let class = admin.create_class("S23ätiv").unwrap();
        assert_eq!(class.as_str(), "s23ativ");
        assert_eq!(
            admin.directory().description("s23ativ").as_deref(),
            Some("Group for class s23ativ")
        );

        let log = admin.audit_log().lines().unwrap();
        assert!(log[0].ends_with("Created group s23ativ"));
    }

    #[test]
    fn test_create_class_rejects_bad_input_without_calls() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new(), &temp);

        assert!(matches!(admin.create_class("   "), Err(Error::MissingField(_))));
        let err = admin.create_class("s2ativ").unwrap_err();
        assert_eq!(err.code(), "INVALID_FORMAT");
        assert_eq!(admin.directory().round_trips(), 0);
    }

    #[test]
    fn test_create_existing_class() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new().with_group("s23ativ"), &temp);

        let err = admin.create_class("s23ativ").unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        // show only, no add
        assert_eq!(admin.directory().round_trips(), 1);
        assert!(admin.audit_log().lines().unwrap().is_empty());
    }

    #[test]
    fn test_create_student() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new(), &temp);

        let uid = admin.create_student(" 231054 ", " Aino ", "Aalto").unwrap();
        assert_eq!(uid.as_str(), "o231054");
        let record = admin.directory().user("o231054").unwrap();
        assert_eq!(record.given_name, "Aino");
        assert_eq!(record.surname, "Aalto");
    }

    #[test]
    fn test_create_student_errors() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new().with_user("o231054", "A", "B"), &temp);

        assert!(matches!(
            admin.create_student("23105", "A", "B"),
            Err(Error::InvalidFormat { .. })
        ));
        assert!(matches!(
            admin.create_student("o231054", "A", "B"),
            Err(Error::AlreadyExists { .. })
        ));
        assert!(matches!(
            admin.create_student("o999999", "", "B"),
            Err(Error::MissingField("first name"))
        ));
        assert!(matches!(
            admin.create_student("o999999", "A", " "),
            Err(Error::MissingField("surname"))
        ));
        assert!(admin.directory().user("o999999").is_none());
    }

    #[test]
    fn test_enroll() {
        let temp = TempDir::new().unwrap();
        let admin = admin(
            MemoryDirectory::new()
                .with_group("s23ativ")
                .with_user("o111111", "A", "B"),
            &temp,
        );
        let uid = StudentId::parse("111111").unwrap();

        admin.enroll(&uid, "s23ätiv").unwrap();
        assert!(admin.directory().direct_members("s23ativ").contains("o111111"));

        assert!(matches!(
            admin.enroll(&uid, "s23ativ"),
            Err(Error::AlreadyMember { .. })
        ));
        assert!(matches!(
            admin.enroll(&uid, "s24ativ"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_enroll_refused_carries_reason() {
        let temp = TempDir::new().unwrap();
        let admin = admin(
            MemoryDirectory::new()
                .with_group("s23ativ")
                .with_user("o111111", "A", "B"),
            &temp,
        );
        admin.directory().fail_add("o111111", "Insufficient access");
        let uid = StudentId::parse("111111").unwrap();

        let err = admin.enroll(&uid, "s23ativ").unwrap_err();
        assert_eq!(err.code(), "DIRECTORY_ERROR");
        assert_eq!(
            err.to_string(),
            "Could not add o111111 to s23ativ: Insufficient access"
        );
        assert!(admin.audit_log().lines().unwrap().is_empty());
    }

    #[test]
    fn test_add_students_round_trips() {
        let temp = TempDir::new().unwrap();
        let mut dir = MemoryDirectory::new().with_group("s23ativ");
        for i in 1..=5 {
            dir = dir.with_user(&format!("o{i:06}"), "Test", "Student");
        }
        let admin = admin(dir, &temp);

        let result = admin
            .add_students("s23ativ", "000001 000002 000003 000004 000005")
            .unwrap();
        assert_eq!(result.added_count(), 5);
        // membership + existence check + add
        assert_eq!(admin.directory().round_trips(), 3);

        admin.directory().reset_round_trips();
        let result = admin.add_students("s23ativ", "000001 000002").unwrap();
        assert_eq!(result.already_member.len(), 2);
        assert_eq!(admin.directory().round_trips(), 2);
    }

    #[test]
    fn test_add_students_only_invalid_makes_no_calls() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new().with_group("s23ativ"), &temp);

        let result = admin.add_students("s23ativ", "bad nope").unwrap();
        assert_eq!(result.invalid_format.len(), 2);
        assert_eq!(result.added_count(), 0);
        assert_eq!(admin.directory().round_trips(), 0);
    }

    #[test]
    fn test_add_students_missing_class_costs_one_call() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new().with_user("o111111", "A", "A"), &temp);

        let err = admin.add_students("s23ativ", "111111").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(admin.directory().round_trips(), 1);
    }

    #[test]
    fn test_add_students_logs_summary() {
        let temp = TempDir::new().unwrap();
        let admin = admin(
            MemoryDirectory::new()
                .with_group("s23ativ")
                .with_user("o111111", "A", "A")
                .with_user("o222222", "B", "B")
                .with_member("s23ativ", "o222222"),
            &temp,
        );

        let result = admin
            .add_students("s23ativ", "111111, 222222 333333,oops")
            .unwrap();
        assert_eq!(result.added_count(), 1);
        assert_eq!(result.skipped_count(), 3);

        let log = admin.audit_log().lines().unwrap();
        assert_eq!(log.len(), 4);
        assert!(log[0].ends_with("Added to class s23ativ: o111111"));
        assert!(log[1].contains("oops (invalid student id)"));
        assert!(log[1].contains("o333333 (no such user)"));
        assert!(log[1].contains("o222222 (already a member)"));
        assert!(log[2].ends_with("1 users added to class s23ativ"));
        assert!(log[3].ends_with("3 users could not be added to class s23ativ"));
    }

    #[test]
    fn test_add_students_to_missing_class() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new().with_user("o111111", "A", "A"), &temp);

        let err = admin.add_students("s23ativ", "111111").unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "Class", .. }));
        assert!(matches!(
            admin.add_students("s23ativ", " , "),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn test_add_students_directory_down() {
        let temp = TempDir::new().unwrap();
        let admin = admin(MemoryDirectory::new().with_group("s23ativ"), &temp);
        admin.directory().set_unavailable(true);

        let err = admin.add_students("s23ativ", "111111").unwrap_err();
        assert!(err.is_fatal());
        assert!(admin.audit_log().lines().unwrap().is_empty());
    }

    #[test]
    fn test_list_classes_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        let admin = admin(
            MemoryDirectory::new()
                .with_group("s24abcd")
                .with_group("admins")
                .with_group("ipausers")
                .with_group("s23ativ")
                .with_group("S23ATIV-old")
                .with_group("s23ativx"),
            &temp,
        );

        let classes: Vec<String> = admin
            .list_classes()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(classes, vec!["s23ativ", "s24abcd"]);
    }

    #[test]
    fn test_list_students() {
        let temp = TempDir::new().unwrap();
        let admin = admin(
            MemoryDirectory::new()
                .with_user("admin", "Administrator", "")
                .with_user("o222222", "Eero", "Eskola")
                .with_user("o111111", "Aino", "Aalto")
                .with_user("123456", "Not", "Student")
                .with_member("s23ativ", "o111111")
                .with_group("s24tyhj"),
            &temp,
        );

        let all = admin.list_students(None).unwrap();
        let uids: Vec<&str> = all.iter().map(|u| u.uid.as_str()).collect();
        assert_eq!(uids, vec!["o111111", "o222222"]);

        let in_class = admin.list_students(Some("s23ätiv")).unwrap();
        assert_eq!(in_class.len(), 1);
        assert_eq!(in_class[0].uid, "o111111");

        assert!(admin.list_students(Some("s24tyhj")).unwrap().is_empty());
        assert!(matches!(
            admin.list_students(Some("s99zzzz")),
            Err(Error::NotFound { .. })
        ));
    }
}

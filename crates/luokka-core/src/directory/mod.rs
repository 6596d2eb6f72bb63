//! Directory capability interface
//!
//! The identity directory is the system of record for classes and students.
//! Everything in this crate talks to it through the [`Directory`] trait; the
//! FreeIPA client ([`crate::ipa::IpaClient`]) and [`MemoryDirectory`] are
//! the two implementations.
//!
//! Expected absence is a value, not an error: `exists` queries return
//! `bool`, shows return `Option`, and batch entries carry a per-id outcome.
//! `Err` is reserved for the directory refusing or failing the call as a
//! whole.

mod memory;

pub use memory::MemoryDirectory;

use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::ident::{ClassName, StudentId};

/// Result type for directory calls
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors reported by a directory implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// Transport failure, expired session or rejected credentials
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The directory refused the command
    #[error("{name} ({code}): {message}")]
    Rejected {
        name: String,
        code: i64,
        message: String,
    },

    /// The response could not be understood
    #[error("unexpected directory response: {0}")]
    Protocol(String),
}

impl DirectoryError {
    /// FreeIPA error code for `DuplicateEntry`
    pub const DUPLICATE_ENTRY: i64 = 4002;

    /// Whether the directory reported that the entry already exists
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code == Self::DUPLICATE_ENTRY)
    }
}

/// Users belonging to a class, directly or through nested groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSet {
    pub direct: BTreeSet<String>,
    pub indirect: BTreeSet<String>,
}

impl MembershipSet {
    #[must_use]
    pub fn contains(&self, uid: &str) -> bool {
        self.direct.contains(uid) || self.indirect.contains(uid)
    }

    /// Direct and indirect members together, sorted
    #[must_use]
    pub fn all(&self) -> BTreeSet<&str> {
        self.direct
            .iter()
            .chain(self.indirect.iter())
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.indirect.is_empty()
    }
}

/// Outcome of one entry in a batched existence check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found,
    Missing,
    /// The entry errored for another reason
    Failed(String),
}

/// Outcome of one entry in a batched member add
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberAdd {
    Added,
    AlreadyMember,
    Failed(String),
}

/// A new student account
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub uid: StudentId,
    pub given_name: String,
    pub surname: String,
    pub initial_password: String,
}

impl NewStudent {
    /// Full name as stored in the account's `cn`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.surname)
    }
}

/// A user account as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRecord {
    pub uid: String,
    pub given_name: String,
    pub surname: String,
}

/// Operations the class tooling needs from an identity directory
pub trait Directory {
    /// Names of groups matching `criteria` (all groups when `None`)
    fn find_groups(&self, criteria: Option<&str>) -> DirectoryResult<Vec<String>>;

    /// Membership of a class, `None` if the group does not exist
    fn group_members(&self, class: &ClassName) -> DirectoryResult<Option<MembershipSet>>;

    fn group_exists(&self, class: &ClassName) -> DirectoryResult<bool>;

    fn create_group(&self, class: &ClassName, description: &str) -> DirectoryResult<()>;

    fn user_exists(&self, uid: &StudentId) -> DirectoryResult<bool>;

    fn create_user(&self, student: &NewStudent) -> DirectoryResult<()>;

    /// Existence of every id in a single round trip, one outcome per id in order
    fn check_users(&self, uids: &[StudentId]) -> DirectoryResult<Vec<Lookup>>;

    /// Add every id to `class` in a single round trip, one outcome per id in order
    fn add_members(
        &self,
        class: &ClassName,
        uids: &[StudentId],
    ) -> DirectoryResult<Vec<MemberAdd>>;

    /// User accounts matching `criteria` (all users when `None`)
    fn find_users(&self, criteria: Option<&str>) -> DirectoryResult<Vec<StudentRecord>>;
}

//! Batch membership reconciliation
//!
//! Adds a list of operator-typed student ids to a class using a constant
//! number of directory round trips: one batched existence check, one
//! membership fetch and one batched add, whatever the number of candidates.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::directory::{Directory, DirectoryResult, Lookup, MemberAdd, MembershipSet};
use crate::ident::{ClassName, StudentId};

/// Input that was not a student id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedInput {
    pub raw: String,
    pub reason: String,
}

/// Where every candidate ended up
///
/// The four lists are disjoint and together hold one entry per candidate
/// (duplicates included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub class: ClassName,
    pub added: Vec<StudentId>,
    pub already_member: Vec<StudentId>,
    pub not_found: Vec<StudentId>,
    pub invalid_format: Vec<RejectedInput>,
}

impl Reconciliation {
    fn new(class: &ClassName) -> Self {
        Self {
            class: class.clone(),
            added: Vec::new(),
            already_member: Vec::new(),
            not_found: Vec::new(),
            invalid_format: Vec::new(),
        }
    }

    /// Number of accounts actually added to the class
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    /// Number of candidates that were not added
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.already_member.len() + self.not_found.len() + self.invalid_format.len()
    }

    /// Total number of candidates accounted for
    #[must_use]
    pub fn len(&self) -> usize {
        self.added_count() + self.skipped_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reconcile `candidates` against the membership of `class`.
///
/// Candidates that don't normalize never reach the directory. Per-entry
/// failures of the batched add are demoted to `already_member`; only a
/// failure of a whole call (directory unreachable, session rejected) is
/// returned as an error, and then nothing partial is reported.
///
/// # Errors
/// Returns the directory error of the first call that fails as a whole
pub fn reconcile<D, S>(
    directory: &D,
    class: &ClassName,
    candidates: &[S],
) -> DirectoryResult<Reconciliation>
where
    D: Directory + ?Sized,
    S: AsRef<str>,
{
    run(directory, class, None, candidates)
}

/// Like [`reconcile`], with the class membership already fetched.
///
/// Skips the membership query, so at most two round trips remain.
///
/// # Errors
/// Returns the directory error of the first call that fails as a whole
pub fn reconcile_with_members<D, S>(
    directory: &D,
    class: &ClassName,
    members: &MembershipSet,
    candidates: &[S],
) -> DirectoryResult<Reconciliation>
where
    D: Directory + ?Sized,
    S: AsRef<str>,
{
    run(directory, class, Some(members), candidates)
}

fn run<D, S>(
    directory: &D,
    class: &ClassName,
    members: Option<&MembershipSet>,
    candidates: &[S],
) -> DirectoryResult<Reconciliation>
where
    D: Directory + ?Sized,
    S: AsRef<str>,
{
    let mut result = Reconciliation::new(class);

    let mut normalized = Vec::with_capacity(candidates.len());
    for raw in candidates {
        let raw = raw.as_ref();
        match StudentId::parse(raw) {
            Some(uid) => normalized.push(uid),
            None => result.invalid_format.push(RejectedInput {
                raw: raw.to_string(),
                reason: "invalid student id".to_string(),
            }),
        }
    }
    if normalized.is_empty() {
        return Ok(result);
    }

    let distinct = distinct(&normalized);
    let lookups = directory.check_users(&distinct)?;
    let mut existing = HashSet::new();
    for (uid, lookup) in distinct.iter().zip(lookups) {
        match lookup {
            Lookup::Found => {
                existing.insert(uid.clone());
            }
            Lookup::Missing => {}
            Lookup::Failed(reason) => {
                tracing::debug!(%uid, %reason, "existence check failed");
            }
        }
    }

    let mut present = Vec::with_capacity(normalized.len());
    for uid in normalized {
        if existing.contains(&uid) {
            present.push(uid);
        } else {
            result.not_found.push(uid);
        }
    }
    if present.is_empty() {
        return Ok(result);
    }

    let fetched;
    let members = match members {
        Some(members) => members,
        None => {
            fetched = directory.group_members(class)?.unwrap_or_default();
            &fetched
        }
    };

    let mut to_add = Vec::new();
    let mut queued = HashSet::new();
    for uid in &present {
        if !members.contains(uid.as_str()) && queued.insert(uid.clone()) {
            to_add.push(uid.clone());
        }
    }

    let mut outcomes: HashMap<StudentId, MemberAdd> = HashMap::new();
    if !to_add.is_empty() {
        let added = directory.add_members(class, &to_add)?;
        for (uid, outcome) in to_add.into_iter().zip(added) {
            if let MemberAdd::Failed(reason) = &outcome {
                tracing::warn!(%uid, %class, %reason, "member add failed");
            }
            outcomes.insert(uid, outcome);
        }
    }

    for uid in present {
        // Take the outcome so a duplicate occurrence lands in already_member
        match outcomes.remove(&uid) {
            Some(MemberAdd::Added) => result.added.push(uid),
            _ => result.already_member.push(uid),
        }
    }

    Ok(result)
}

fn distinct(uids: &[StudentId]) -> Vec<StudentId> {
    let mut seen = HashSet::new();
    uids.iter()
        .filter(|uid| seen.insert((*uid).clone()))
        .cloned()
        .collect()
}

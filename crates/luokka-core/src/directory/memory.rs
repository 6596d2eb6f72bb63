//! In-memory directory
//!
//! Holds groups and users in maps and counts every call as one round trip.
//! Used by the test suites of both crates.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    Directory, DirectoryError, DirectoryResult, Lookup, MemberAdd, MembershipSet, NewStudent,
    StudentRecord,
};
use crate::ident::{ClassName, StudentId};

#[derive(Debug, Default)]
struct Group {
    description: String,
    users: BTreeSet<String>,
    groups: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    groups: BTreeMap<String, Group>,
    users: BTreeMap<String, StudentRecord>,
    add_failures: BTreeMap<String, String>,
}

/// Directory kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RefCell<State>,
    round_trips: Cell<usize>,
    unavailable: Cell<bool>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group (any name, class or not)
    #[must_use]
    pub fn with_group(self, name: &str) -> Self {
        self.state
            .borrow_mut()
            .groups
            .entry(name.to_string())
            .or_default();
        self
    }

    #[must_use]
    pub fn with_user(self, uid: &str, given_name: &str, surname: &str) -> Self {
        self.state.borrow_mut().users.insert(
            uid.to_string(),
            StudentRecord {
                uid: uid.to_string(),
                given_name: given_name.to_string(),
                surname: surname.to_string(),
            },
        );
        self
    }

    /// Make `uid` a direct member of `group`, creating the group if needed
    #[must_use]
    pub fn with_member(self, group: &str, uid: &str) -> Self {
        self.state
            .borrow_mut()
            .groups
            .entry(group.to_string())
            .or_default()
            .users
            .insert(uid.to_string());
        self
    }

    /// Nest `child` inside `parent`; members of `child` become indirect
    /// members of `parent`
    #[must_use]
    pub fn with_nested_group(self, parent: &str, child: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.groups.entry(child.to_string()).or_default();
            state
                .groups
                .entry(parent.to_string())
                .or_default()
                .groups
                .insert(child.to_string());
        }
        self
    }

    /// Make the next member add of `uid` fail with `reason`
    pub fn fail_add(&self, uid: &str, reason: &str) {
        self.state
            .borrow_mut()
            .add_failures
            .insert(uid.to_string(), reason.to_string());
    }

    /// Simulate the directory going away (or coming back)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Number of calls made so far
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.round_trips.get()
    }

    pub fn reset_round_trips(&self) {
        self.round_trips.set(0);
    }

    #[must_use]
    pub fn description(&self, group: &str) -> Option<String> {
        self.state
            .borrow()
            .groups
            .get(group)
            .map(|g| g.description.clone())
    }

    #[must_use]
    pub fn user(&self, uid: &str) -> Option<StudentRecord> {
        self.state.borrow().users.get(uid).cloned()
    }

    #[must_use]
    pub fn direct_members(&self, group: &str) -> BTreeSet<String> {
        self.state
            .borrow()
            .groups
            .get(group)
            .map(|g| g.users.clone())
            .unwrap_or_default()
    }

    fn round_trip(&self) -> DirectoryResult<()> {
        self.round_trips.set(self.round_trips.get() + 1);
        if self.unavailable.get() {
            return Err(DirectoryError::Unavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

fn collect_indirect(
    groups: &BTreeMap<String, Group>,
    name: &str,
    seen: &mut BTreeSet<String>,
    out: &mut BTreeSet<String>,
) {
    let Some(group) = groups.get(name) else {
        return;
    };
    for child in &group.groups {
        if seen.insert(child.clone()) {
            if let Some(nested) = groups.get(child) {
                out.extend(nested.users.iter().cloned());
            }
            collect_indirect(groups, child, seen, out);
        }
    }
}

impl Directory for MemoryDirectory {
    fn find_groups(&self, criteria: Option<&str>) -> DirectoryResult<Vec<String>> {
        self.round_trip()?;
        let state = self.state.borrow();
        Ok(state
            .groups
            .keys()
            .filter(|name| criteria.map_or(true, |c| name.contains(c)))
            .cloned()
            .collect())
    }

    fn group_members(&self, class: &ClassName) -> DirectoryResult<Option<MembershipSet>> {
        self.round_trip()?;
        let state = self.state.borrow();
        let Some(group) = state.groups.get(class.as_str()) else {
            return Ok(None);
        };

        let mut indirect = BTreeSet::new();
        let mut seen = BTreeSet::from([class.as_str().to_string()]);
        collect_indirect(&state.groups, class.as_str(), &mut seen, &mut indirect);
        indirect.retain(|uid| !group.users.contains(uid));

        Ok(Some(MembershipSet {
            direct: group.users.clone(),
            indirect,
        }))
    }

    fn group_exists(&self, class: &ClassName) -> DirectoryResult<bool> {
        self.round_trip()?;
        Ok(self.state.borrow().groups.contains_key(class.as_str()))
    }

    fn create_group(&self, class: &ClassName, description: &str) -> DirectoryResult<()> {
        self.round_trip()?;
        let mut state = self.state.borrow_mut();
        if state.groups.contains_key(class.as_str()) {
            return Err(DirectoryError::Rejected {
                name: "DuplicateEntry".to_string(),
                code: DirectoryError::DUPLICATE_ENTRY,
                message: format!("group with name \"{class}\" already exists"),
            });
        }
        state.groups.insert(
            class.as_str().to_string(),
            Group {
                description: description.to_string(),
                ..Group::default()
            },
        );
        Ok(())
    }

    fn user_exists(&self, uid: &StudentId) -> DirectoryResult<bool> {
        self.round_trip()?;
        Ok(self.state.borrow().users.contains_key(uid.as_str()))
    }

    fn create_user(&self, student: &NewStudent) -> DirectoryResult<()> {
        self.round_trip()?;
        let mut state = self.state.borrow_mut();
        if state.users.contains_key(student.uid.as_str()) {
            return Err(DirectoryError::Rejected {
                name: "DuplicateEntry".to_string(),
                code: DirectoryError::DUPLICATE_ENTRY,
                message: format!("user with name \"{}\" already exists", student.uid),
            });
        }
        state.users.insert(
            student.uid.as_str().to_string(),
            StudentRecord {
                uid: student.uid.as_str().to_string(),
                given_name: student.given_name.clone(),
                surname: student.surname.clone(),
            },
        );
        Ok(())
    }

    fn check_users(&self, uids: &[StudentId]) -> DirectoryResult<Vec<Lookup>> {
        self.round_trip()?;
        let state = self.state.borrow();
        Ok(uids
            .iter()
            .map(|uid| {
                if state.users.contains_key(uid.as_str()) {
                    Lookup::Found
                } else {
                    Lookup::Missing
                }
            })
            .collect())
    }

    fn add_members(
        &self,
        class: &ClassName,
        uids: &[StudentId],
    ) -> DirectoryResult<Vec<MemberAdd>> {
        self.round_trip()?;
        let mut state = self.state.borrow_mut();
        let mut outcomes = Vec::with_capacity(uids.len());
        for uid in uids {
            if let Some(reason) = state.add_failures.remove(uid.as_str()) {
                outcomes.push(MemberAdd::Failed(reason));
                continue;
            }
            if !state.users.contains_key(uid.as_str()) {
                outcomes.push(MemberAdd::Failed("no such entry".to_string()));
                continue;
            }
            let Some(group) = state.groups.get_mut(class.as_str()) else {
                outcomes.push(MemberAdd::Failed(format!("{class}: group not found")));
                continue;
            };
            if group.users.insert(uid.as_str().to_string()) {
                outcomes.push(MemberAdd::Added);
            } else {
                outcomes.push(MemberAdd::AlreadyMember);
            }
        }
        Ok(outcomes)
    }

    fn find_users(&self, criteria: Option<&str>) -> DirectoryResult<Vec<StudentRecord>> {
        self.round_trip()?;
        let state = self.state.borrow();
        Ok(state
            .users
            .values()
            .filter(|u| criteria.map_or(true, |c| u.uid.contains(c)))
            .cloned()
            .collect())
    }
}

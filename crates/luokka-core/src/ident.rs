//! Student and class identifiers
//!
//! Operators type identifiers in many shapes (`231054`, ` o231054 `,
//! `S23ÄTIV`). Everything that reaches the directory goes through the
//! normalizers here first, so [`StudentId`] and [`ClassName`] values are
//! always canonical.

use serde::{Serialize, Serializer};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

const STUDENT_DIGITS: usize = 6;
const CLASS_NAME_LEN: usize = 7;

/// Canonical student account id: `o` followed by six digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudentId(String);

impl StudentId {
    /// Normalize operator input into a student id.
    ///
    /// Accepts `######` and `o######` (surrounding whitespace ignored).
    /// Anything else yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if is_digits(trimmed, STUDENT_DIGITS) {
            return Some(Self(format!("o{trimmed}")));
        }
        Self::from_canonical(trimmed)
    }

    /// Accept only the canonical `o######` form, without trimming.
    ///
    /// Used to pick student accounts out of directory listings, where a bare
    /// numeric uid is some other kind of account.
    #[must_use]
    pub fn from_canonical(uid: &str) -> Option<Self> {
        match uid.strip_prefix('o') {
            Some(digits) if is_digits(digits, STUDENT_DIGITS) => Some(Self(uid.to_string())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StudentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Canonical class (group) name: `s`, two digits, four lowercase letters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName(String);

impl ClassName {
    /// Canonicalize free-form input and accept it if it is a valid class name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = canonicalize_class_name(raw);
        is_valid_class_name(&canonical).then_some(Self(canonical))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ClassName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Normalize a raw student id. See [`StudentId::parse`].
#[must_use]
pub fn normalize_student_id(raw: &str) -> Option<StudentId> {
    StudentId::parse(raw)
}

/// Reduce free text to the character set class names are built from.
///
/// Lower-cases, decomposes (NFKD) so accented letters fall apart into a base
/// letter plus combining marks, drops everything non-ASCII, then keeps only
/// `[a-z0-9]`. The result is not necessarily a valid class name.
#[must_use]
pub fn canonicalize_class_name(raw: &str) -> String {
    raw.to_lowercase()
        .nfkd()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Exact match of `s` + 2 digits + 4 lowercase ASCII letters.
#[must_use]
pub fn is_valid_class_name(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == CLASS_NAME_LEN
        && bytes[0] == b's'
        && bytes[1..3].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_lowercase)
}

/// Split an operator-typed list of student ids on commas and whitespace.
#[must_use]
pub fn split_candidates(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

//! luokka core - class and student administration for FreeIPA
//!
//! Classes are directory groups named like `s23ativ`, students are user
//! accounts named like `o231054`. This crate normalizes operator input into
//! those identifiers, reconciles class membership with a constant number of
//! directory round trips, and wraps it all in [`ClassAdmin`].

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod audit;
pub mod config;
pub mod directory;
pub mod error;
pub mod ident;
pub mod ipa;
pub mod ops;
pub mod reconcile;

pub use audit::AuditLog;
pub use config::Settings;
pub use directory::{Directory, DirectoryError, MemoryDirectory};
pub use error::{Error, Result};
pub use ident::{ClassName, StudentId};
pub use ipa::IpaClient;
pub use ops::ClassAdmin;
pub use reconcile::{reconcile, reconcile_with_members, Reconciliation};

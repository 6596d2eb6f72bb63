//! Error taxonomy for class and student operations

use thiserror::Error;

use crate::directory::DirectoryError;

/// Result type for operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the operator
#[derive(Debug, Error)]
pub enum Error {
    /// Input does not match the identifier grammar
    #[error("Invalid {what}: '{input}'")]
    InvalidFormat { what: &'static str, input: String },

    /// A required value was left empty
    #[error("Missing {0}")]
    MissingField(&'static str),

    /// Referenced entity is absent from the directory
    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: &'static str, name: String },

    /// Create attempted on an entity that already exists
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// Student is already in the class
    #[error("{student} is already a member of {class}")]
    AlreadyMember { student: String, class: String },

    /// The directory refused to add one student to a class
    #[error("Could not add {student} to {class}: {reason}")]
    MemberAddFailed {
        student: String,
        class: String,
        reason: String,
    },

    /// Directory unreachable or credentials rejected
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// The directory refused the command
    #[error("Directory error: {0}")]
    Directory(DirectoryError),

    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get the error code for CLI/JSON output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } | Self::MissingField(_) => "INVALID_FORMAT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::AlreadyMember { .. } => "ALREADY_MEMBER",
            Self::DirectoryUnavailable(_) => "DIRECTORY_UNAVAILABLE",
            Self::Directory(_) | Self::MemberAddFailed { .. } => "DIRECTORY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether the current operation can't continue against this directory
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DirectoryUnavailable(_) | Self::Config(_))
    }

    /// What the operator can do about it, if anything obvious
    #[must_use]
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::DirectoryUnavailable(_) => Some(
                "Check that the FreeIPA server is reachable and that LUOKKA_PASSWORD \
                 holds valid credentials for the configured user.",
            ),
            Self::Config(_) => Some("Check the configuration file or pass --server."),
            _ => None,
        }
    }
}

impl From<DirectoryError> for Error {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unavailable(reason) => Self::DirectoryUnavailable(reason),
            other => Self::Directory(other),
        }
    }
}

//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use std::fmt;
use thiserror::Error;

/// Field of a roster entry a validation failure is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Identifier,
    Roster,
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryField::Identifier => write!(f, "identifier"),
            EntryField::Roster => write!(f, "roster"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Validation failed: {field} {message}")]
    Validation { field: EntryField, message: String },

    /// Persisting an entry failed for a reason other than identifier validation.
    /// Aborts the whole bulk creation.
    #[error("Could not create roster entry '{identifier}': {reason}")]
    IdentifierCreation { identifier: String, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Input error: {0}")]
    Input(String),
}

impl DomainError {
    /// True for validation failures on the identifier field (blank or already taken).
    pub fn is_identifier_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Validation {
                field: EntryField::Identifier,
                ..
            }
        )
    }

    /// True when the entry's roster is missing.
    pub fn is_roster_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Validation {
                field: EntryField::Roster,
                ..
            }
        )
    }
}

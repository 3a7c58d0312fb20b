//! Domain entities. Pure data structures for the core business.
//!
//! No SQL/IO types here — these are mapped from adapters.

use crate::domain::errors::{DomainError, EntryField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RosterId = i64;
pub type RosterEntryId = i64;
pub type UserId = i64;
pub type AssignmentId = i64;
pub type GroupAssignmentId = i64;

/// A named collection of student identifiers for a course/classroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub id: RosterId,
    pub identifier: String,
    pub created_at: DateTime<Utc>,
}

/// One identifier slot within a roster, optionally linked to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: RosterEntryId,
    pub roster_id: RosterId,
    pub identifier: String,
    pub user_id: Option<UserId>,
    /// Student id in the external LMS the roster was imported from.
    pub lms_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RosterEntry {
    pub fn is_linked(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Write model for a roster entry. Validated before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRosterEntry {
    pub roster_id: RosterId,
    pub identifier: String,
    pub lms_user_id: Option<String>,
}

impl NewRosterEntry {
    pub fn new(roster_id: RosterId, identifier: impl Into<String>, lms_user_id: Option<String>) -> Self {
        Self {
            roster_id,
            identifier: identifier.into(),
            lms_user_id,
        }
    }

    /// Presence check on the identifier. Roster presence is checked by the store,
    /// which is the only place that knows whether `roster_id` exists.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.identifier.trim().is_empty() {
            return Err(DomainError::Validation {
                field: EntryField::Identifier,
                message: "can't be blank".to_string(),
            });
        }
        Ok(())
    }
}

/// An authenticated account. Entries link to it once a student joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub github: Option<GithubAccount>,
}

/// GitHub identity of a user. Source of the account columns in CSV exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubAccount {
    pub github_id: i64,
    pub login: String,
    pub name: Option<String>,
}

/// Roster entry joined with the creation time of the linked user's assignment repo.
/// `repo_created_at` is `None` when the entry is unlinked or the user has no repo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWithRepo {
    pub entry: RosterEntry,
    pub repo_created_at: Option<DateTime<Utc>>,
}

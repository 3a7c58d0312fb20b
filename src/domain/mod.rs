//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod duplicates;
pub mod entities;
pub mod errors;
pub mod ordering;
pub mod search;

pub use duplicates::resolve_duplicates;
pub use entities::{
    AssignmentId, EntryWithRepo, GithubAccount, GroupAssignmentId, NewRosterEntry, Roster,
    RosterEntry, RosterEntryId, RosterId, User, UserId,
};
pub use errors::{DomainError, EntryField};
pub use ordering::{AcceptanceStatus, SortMode};

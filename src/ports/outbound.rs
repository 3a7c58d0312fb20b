//! Outbound ports. Application calls into storage.
//!
//! Implemented by adapters (SQLite, in-memory).

use crate::domain::{
    AssignmentId, DomainError, EntryWithRepo, GithubAccount, GroupAssignmentId, NewRosterEntry,
    Roster, RosterEntry, RosterEntryId, RosterId, User, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Roster repository. Rosters, their entries, and units of work for bulk writes.
#[async_trait::async_trait]
pub trait RosterRepoPort: Send + Sync {
    async fn create_roster(&self, identifier: &str) -> Result<Roster, DomainError>;

    async fn find_roster(&self, roster_id: RosterId) -> Result<Option<Roster>, DomainError>;

    async fn list_rosters(&self) -> Result<Vec<Roster>, DomainError>;

    /// Delete a roster and every entry it owns.
    async fn delete_roster(&self, roster_id: RosterId) -> Result<(), DomainError>;

    /// Insert a single entry outside any unit of work.
    ///
    /// # Errors
    /// `Validation { field: Identifier }` for a blank or already-taken identifier,
    /// `Validation { field: Roster }` when the roster does not exist.
    async fn insert_entry(&self, entry: &NewRosterEntry) -> Result<RosterEntry, DomainError>;

    async fn find_entry(&self, entry_id: RosterEntryId) -> Result<Option<RosterEntry>, DomainError>;

    /// Entries of a roster in insertion order.
    async fn list_entries(&self, roster_id: RosterId) -> Result<Vec<RosterEntry>, DomainError>;

    /// Attach (`Some`) or detach (`None`) the linked user.
    async fn set_entry_user(
        &self,
        entry_id: RosterEntryId,
        user_id: Option<UserId>,
    ) -> Result<RosterEntry, DomainError>;

    async fn delete_entry(&self, entry_id: RosterEntryId) -> Result<(), DomainError>;

    /// Open an atomic unit of work. Nothing written through it is visible to other
    /// readers until `commit`; dropping it or calling `rollback` discards the writes.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError>;
}

/// Transaction scope used by the bulk entry creator.
#[async_trait::async_trait]
pub trait UnitOfWork: Send {
    async fn roster_exists(&mut self, roster_id: RosterId) -> Result<bool, DomainError>;

    /// Identifiers currently persisted for the roster, as seen inside this unit of work.
    async fn existing_identifiers(&mut self, roster_id: RosterId) -> Result<HashSet<String>, DomainError>;

    /// Validate and persist one entry. Field-level validation failures are reported
    /// as `DomainError::Validation`; anything else is a storage failure.
    async fn create_entry(&mut self, entry: &NewRosterEntry) -> Result<RosterEntry, DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Users and their GitHub accounts.
#[async_trait::async_trait]
pub trait UserPort: Send + Sync {
    async fn create_user(&self, github: Option<GithubAccount>) -> Result<User, DomainError>;

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, DomainError>;

    /// Delete a user. Roster entries linked to the user are deleted with it.
    async fn delete_user(&self, user_id: UserId) -> Result<(), DomainError>;

    /// GitHub accounts of every user linked to an entry of the roster.
    async fn linked_accounts(&self, roster_id: RosterId) -> Result<HashMap<UserId, GithubAccount>, DomainError>;
}

/// Assignment repos and team membership: the "accepted" and "on a team" facts.
#[async_trait::async_trait]
pub trait AssignmentPort: Send + Sync {
    /// Record that `user_id` accepted the assignment (its repo was created at `created_at`).
    async fn record_assignment_repo(
        &self,
        assignment_id: AssignmentId,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Users with a repo for the assignment.
    async fn accepted_user_ids(&self, assignment_id: AssignmentId) -> Result<HashSet<UserId>, DomainError>;

    /// Entries of the roster left-joined with the linked user's repo for the assignment.
    async fn entries_with_repo_created_at(
        &self,
        roster_id: RosterId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<EntryWithRepo>, DomainError>;

    /// Record that `user_id` is on the access list of some team's repo for the group assignment.
    async fn record_team_access(
        &self,
        group_assignment_id: GroupAssignmentId,
        team_name: &str,
        user_id: UserId,
    ) -> Result<(), DomainError>;

    /// Users already on a team for the group assignment.
    async fn team_member_ids(&self, group_assignment_id: GroupAssignmentId) -> Result<HashSet<UserId>, DomainError>;

    /// user id -> team name for the group assignment. Feeds the CSV `group_name` column.
    async fn team_names(&self, group_assignment_id: GroupAssignmentId) -> Result<HashMap<UserId, String>, DomainError>;
}

//! In-memory storage adapter. Implements every outbound storage port.
//!
//! Used by tests and by `ROSTER_STORAGE=memory` runs. A unit of work holds the
//! write lock for its whole lifetime and stages writes on a copy of the data;
//! `commit` swaps the copy in, `rollback` (or drop) discards it.

use crate::domain::{
    AssignmentId, DomainError, EntryField, EntryWithRepo, GithubAccount, GroupAssignmentId,
    NewRosterEntry, Roster, RosterEntry, RosterEntryId, RosterId, User, UserId,
};
use crate::ports::{AssignmentPort, RosterRepoPort, UnitOfWork, UserPort};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

#[derive(Debug, Default, Clone)]
struct MemoryData {
    next_id: i64,
    rosters: BTreeMap<RosterId, Roster>,
    entries: BTreeMap<RosterEntryId, RosterEntry>,
    users: BTreeMap<UserId, User>,
    /// (assignment, user) -> repo created at
    assignment_repos: HashMap<(AssignmentId, UserId), DateTime<Utc>>,
    /// (group assignment, user) -> team name
    team_access: HashMap<(GroupAssignmentId, UserId), String>,
}

impl MemoryData {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Same checks as the SQLite adapter: identifier present, roster exists,
    /// identifier unique within the roster.
    fn insert_entry(&mut self, new_entry: &NewRosterEntry) -> Result<RosterEntry, DomainError> {
        new_entry.validate()?;
        if !self.rosters.contains_key(&new_entry.roster_id) {
            return Err(DomainError::Validation {
                field: EntryField::Roster,
                message: "must exist".to_string(),
            });
        }
        let taken = self
            .entries
            .values()
            .any(|e| e.roster_id == new_entry.roster_id && e.identifier == new_entry.identifier);
        if taken {
            return Err(DomainError::Validation {
                field: EntryField::Identifier,
                message: "has already been taken".to_string(),
            });
        }

        let entry = RosterEntry {
            id: self.allocate_id(),
            roster_id: new_entry.roster_id,
            identifier: new_entry.identifier.clone(),
            user_id: None,
            lms_user_id: new_entry.lms_user_id.clone(),
            created_at: Utc::now(),
        };
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn identifiers_of(&self, roster_id: RosterId) -> HashSet<String> {
        self.entries
            .values()
            .filter(|e| e.roster_id == roster_id)
            .map(|e| e.identifier.clone())
            .collect()
    }

    fn entries_of(&self, roster_id: RosterId) -> Vec<RosterEntry> {
        self.entries
            .values()
            .filter(|e| e.roster_id == roster_id)
            .cloned()
            .collect()
    }
}

/// In-memory repository. Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepo {
    data: Arc<RwLock<MemoryData>>,
    /// Identifiers whose insert fails with a storage error (fault injection for tests).
    failing_identifiers: Arc<RwLock<HashSet<String>>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later insert of `identifier` fail with a storage (non-validation) error.
    pub async fn fail_on_identifier(&self, identifier: &str) {
        self.failing_identifiers
            .write()
            .await
            .insert(identifier.to_string());
    }
}

#[async_trait::async_trait]
impl RosterRepoPort for MemoryRepo {
    async fn create_roster(&self, identifier: &str) -> Result<Roster, DomainError> {
        let mut data = self.data.write().await;
        let roster = Roster {
            id: data.allocate_id(),
            identifier: identifier.to_string(),
            created_at: Utc::now(),
        };
        data.rosters.insert(roster.id, roster.clone());
        Ok(roster)
    }

    async fn find_roster(&self, roster_id: RosterId) -> Result<Option<Roster>, DomainError> {
        Ok(self.data.read().await.rosters.get(&roster_id).cloned())
    }

    async fn list_rosters(&self) -> Result<Vec<Roster>, DomainError> {
        Ok(self.data.read().await.rosters.values().cloned().collect())
    }

    async fn delete_roster(&self, roster_id: RosterId) -> Result<(), DomainError> {
        let mut data = self.data.write().await;
        if data.rosters.remove(&roster_id).is_none() {
            return Err(DomainError::NotFound {
                kind: "roster",
                id: roster_id,
            });
        }
        data.entries.retain(|_, e| e.roster_id != roster_id);
        Ok(())
    }

    async fn insert_entry(&self, entry: &NewRosterEntry) -> Result<RosterEntry, DomainError> {
        if self.failing_identifiers.read().await.contains(&entry.identifier) {
            return Err(DomainError::Repo(format!("injected failure for '{}'", entry.identifier)));
        }
        self.data.write().await.insert_entry(entry)
    }

    async fn find_entry(&self, entry_id: RosterEntryId) -> Result<Option<RosterEntry>, DomainError> {
        Ok(self.data.read().await.entries.get(&entry_id).cloned())
    }

    async fn list_entries(&self, roster_id: RosterId) -> Result<Vec<RosterEntry>, DomainError> {
        Ok(self.data.read().await.entries_of(roster_id))
    }

    async fn set_entry_user(
        &self,
        entry_id: RosterEntryId,
        user_id: Option<UserId>,
    ) -> Result<RosterEntry, DomainError> {
        let mut data = self.data.write().await;
        let entry = data.entries.get_mut(&entry_id).ok_or(DomainError::NotFound {
            kind: "roster entry",
            id: entry_id,
        })?;
        entry.user_id = user_id;
        Ok(entry.clone())
    }

    async fn delete_entry(&self, entry_id: RosterEntryId) -> Result<(), DomainError> {
        match self.data.write().await.entries.remove(&entry_id) {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound {
                kind: "roster entry",
                id: entry_id,
            }),
        }
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let failing = self.failing_identifiers.read().await.clone();
        let guard = Arc::clone(&self.data).write_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            staged,
            failing,
        }))
    }
}

/// Unit of work over the in-memory data. Holds the write lock until commit/rollback.
struct MemoryUnitOfWork {
    guard: OwnedRwLockWriteGuard<MemoryData>,
    staged: MemoryData,
    failing: HashSet<String>,
}

#[async_trait::async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn roster_exists(&mut self, roster_id: RosterId) -> Result<bool, DomainError> {
        Ok(self.staged.rosters.contains_key(&roster_id))
    }

    async fn existing_identifiers(&mut self, roster_id: RosterId) -> Result<HashSet<String>, DomainError> {
        Ok(self.staged.identifiers_of(roster_id))
    }

    async fn create_entry(&mut self, entry: &NewRosterEntry) -> Result<RosterEntry, DomainError> {
        if self.failing.contains(&entry.identifier) {
            return Err(DomainError::Repo(format!("injected failure for '{}'", entry.identifier)));
        }
        self.staged.insert_entry(entry)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let MemoryUnitOfWork {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        debug!("discarding staged in-memory writes");
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserPort for MemoryRepo {
    async fn create_user(&self, github: Option<GithubAccount>) -> Result<User, DomainError> {
        let mut data = self.data.write().await;
        let user = User {
            id: data.allocate_id(),
            github,
        };
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.data.read().await.users.get(&user_id).cloned())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), DomainError> {
        let mut data = self.data.write().await;
        if data.users.remove(&user_id).is_none() {
            return Err(DomainError::NotFound {
                kind: "user",
                id: user_id,
            });
        }
        data.entries.retain(|_, e| e.user_id != Some(user_id));
        data.assignment_repos.retain(|(_, u), _| *u != user_id);
        data.team_access.retain(|(_, u), _| *u != user_id);
        Ok(())
    }

    async fn linked_accounts(&self, roster_id: RosterId) -> Result<HashMap<UserId, GithubAccount>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .entries
            .values()
            .filter(|e| e.roster_id == roster_id)
            .filter_map(|e| e.user_id)
            .filter_map(|user_id| {
                let github = data.users.get(&user_id)?.github.clone()?;
                Some((user_id, github))
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl AssignmentPort for MemoryRepo {
    async fn record_assignment_repo(
        &self,
        assignment_id: AssignmentId,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.data
            .write()
            .await
            .assignment_repos
            .insert((assignment_id, user_id), created_at);
        Ok(())
    }

    async fn accepted_user_ids(&self, assignment_id: AssignmentId) -> Result<HashSet<UserId>, DomainError> {
        Ok(self
            .data
            .read()
            .await
            .assignment_repos
            .keys()
            .filter(|(a, _)| *a == assignment_id)
            .map(|(_, u)| *u)
            .collect())
    }

    async fn entries_with_repo_created_at(
        &self,
        roster_id: RosterId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<EntryWithRepo>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .entries_of(roster_id)
            .into_iter()
            .map(|entry| {
                let repo_created_at = entry
                    .user_id
                    .and_then(|u| data.assignment_repos.get(&(assignment_id, u)).copied());
                EntryWithRepo {
                    entry,
                    repo_created_at,
                }
            })
            .collect())
    }

    async fn record_team_access(
        &self,
        group_assignment_id: GroupAssignmentId,
        team_name: &str,
        user_id: UserId,
    ) -> Result<(), DomainError> {
        self.data
            .write()
            .await
            .team_access
            .insert((group_assignment_id, user_id), team_name.to_string());
        Ok(())
    }

    async fn team_member_ids(&self, group_assignment_id: GroupAssignmentId) -> Result<HashSet<UserId>, DomainError> {
        Ok(self
            .data
            .read()
            .await
            .team_access
            .keys()
            .filter(|(g, _)| *g == group_assignment_id)
            .map(|(_, u)| *u)
            .collect())
    }

    async fn team_names(&self, group_assignment_id: GroupAssignmentId) -> Result<HashMap<UserId, String>, DomainError> {
        Ok(self
            .data
            .read()
            .await
            .team_access
            .iter()
            .filter(|((g, _), _)| *g == group_assignment_id)
            .map(|((_, u), name)| (*u, name.clone()))
            .collect())
    }
}

//! Roster maintenance and duplicate-safe bulk entry creation.
//!
//! - Resolves duplicate identifiers against the roster before writing
//! - Writes the whole batch inside one unit of work
//! - Skips identifier validation failures; any other failure rolls back the batch

use crate::domain::{
    resolve_duplicates, DomainError, EntryField, NewRosterEntry, Roster, RosterEntry,
    RosterEntryId, RosterId, UserId,
};
use crate::ports::{RosterRepoPort, UnitOfWork, UserPort};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Roster service. Creates rosters and entries, links entries to users.
pub struct RosterService {
    repo: Arc<dyn RosterRepoPort>,
    users: Arc<dyn UserPort>,
}

impl RosterService {
    pub fn new(repo: Arc<dyn RosterRepoPort>, users: Arc<dyn UserPort>) -> Self {
        Self { repo, users }
    }

    pub async fn create_roster(&self, identifier: &str) -> Result<Roster, DomainError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(DomainError::Validation {
                field: EntryField::Roster,
                message: "name can't be blank".to_string(),
            });
        }
        let roster = self.repo.create_roster(identifier).await?;
        info!(roster_id = roster.id, identifier, "created roster");
        Ok(roster)
    }

    pub async fn rosters(&self) -> Result<Vec<Roster>, DomainError> {
        self.repo.list_rosters().await
    }

    /// Look up a roster, failing with `NotFound` if it does not exist.
    pub async fn roster(&self, roster_id: RosterId) -> Result<Roster, DomainError> {
        self.repo
            .find_roster(roster_id)
            .await?
            .ok_or(DomainError::NotFound {
                kind: "roster",
                id: roster_id,
            })
    }

    pub async fn entries(&self, roster_id: RosterId) -> Result<Vec<RosterEntry>, DomainError> {
        self.repo.list_entries(roster_id).await
    }

    /// Create one entry per identifier, suffixing duplicates (`alice`, `alice-1`).
    ///
    /// `lms_user_ids` pairs positionally with `identifiers`; missing positions are `None`.
    /// Returns the persisted entries in input order. Entries whose identifier fails
    /// validation are left out. A missing roster, checked inside the unit of work and
    /// again by every insert, is `DomainError::Validation` on the roster field. Any other
    /// persistence failure rolls back every entry written by this call and returns
    /// `DomainError::IdentifierCreation`.
    pub async fn create_entries(
        &self,
        identifiers: &[String],
        roster: &Roster,
        lms_user_ids: &[Option<String>],
    ) -> Result<Vec<RosterEntry>, DomainError> {
        let mut uow = self.repo.begin().await?;
        let written = Self::write_batch(uow.as_mut(), identifiers, roster.id, lms_user_ids).await;
        match written {
            Ok(created) => {
                uow.commit().await?;
                info!(
                    roster_id = roster.id,
                    requested = identifiers.len(),
                    created = created.len(),
                    "created roster entries"
                );
                Ok(created)
            }
            Err(e) => {
                warn!(roster_id = roster.id, error = %e, "rolling back roster entry batch");
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(roster_id = roster.id, error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn write_batch(
        uow: &mut dyn UnitOfWork,
        identifiers: &[String],
        roster_id: RosterId,
        lms_user_ids: &[Option<String>],
    ) -> Result<Vec<RosterEntry>, DomainError> {
        if !uow.roster_exists(roster_id).await? {
            return Err(DomainError::Validation {
                field: EntryField::Roster,
                message: format!("must exist (id {})", roster_id),
            });
        }
        let existing = uow.existing_identifiers(roster_id).await?;
        let resolved = resolve_duplicates(identifiers, &existing);

        let mut created = Vec::with_capacity(resolved.len());
        for (i, identifier) in resolved.into_iter().enumerate() {
            let lms_user_id = lms_user_ids.get(i).cloned().flatten();
            let new_entry = NewRosterEntry::new(roster_id, identifier, lms_user_id);
            match uow.create_entry(&new_entry).await {
                Ok(entry) => created.push(entry),
                Err(e) if e.is_identifier_validation() => {
                    debug!(roster_id, identifier = %new_entry.identifier, error = %e, "skipping entry");
                }
                Err(e) if e.is_roster_validation() => return Err(e),
                Err(e) => {
                    return Err(DomainError::IdentifierCreation {
                        identifier: new_entry.identifier,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(created)
    }

    /// Insert a single entry as given. No suffixing; validation errors are returned.
    pub async fn add_entry(
        &self,
        roster_id: RosterId,
        identifier: &str,
        lms_user_id: Option<String>,
    ) -> Result<RosterEntry, DomainError> {
        let new_entry = NewRosterEntry::new(roster_id, identifier, lms_user_id);
        new_entry.validate()?;
        let entry = self.repo.insert_entry(&new_entry).await?;
        info!(roster_id, entry_id = entry.id, "added roster entry");
        Ok(entry)
    }

    /// Link an entry to a user once the student joins.
    pub async fn link_user(
        &self,
        entry_id: RosterEntryId,
        user_id: UserId,
    ) -> Result<RosterEntry, DomainError> {
        if self.users.find_user(user_id).await?.is_none() {
            return Err(DomainError::NotFound {
                kind: "user",
                id: user_id,
            });
        }
        let entry = self.repo.set_entry_user(entry_id, Some(user_id)).await?;
        info!(entry_id, user_id, "linked roster entry");
        Ok(entry)
    }

    pub async fn unlink_user(&self, entry_id: RosterEntryId) -> Result<RosterEntry, DomainError> {
        let entry = self.repo.set_entry_user(entry_id, None).await?;
        info!(entry_id, "unlinked roster entry");
        Ok(entry)
    }

    pub async fn remove_entry(&self, entry_id: RosterEntryId) -> Result<(), DomainError> {
        self.repo.delete_entry(entry_id).await?;
        info!(entry_id, "removed roster entry");
        Ok(())
    }

    pub async fn delete_roster(&self, roster_id: RosterId) -> Result<(), DomainError> {
        self.repo.delete_roster(roster_id).await?;
        info!(roster_id, "deleted roster");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryRepo;
    use crate::domain::GithubAccount;

    fn service(repo: &Arc<MemoryRepo>) -> RosterService {
        RosterService::new(repo.clone(), repo.clone())
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn identifiers(entries: &[RosterEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.identifier.as_str()).collect()
    }

    #[tokio::test]
    async fn test_duplicates_in_batch_get_suffixes() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();

        let created = svc
            .create_entries(&ids(&["alice", "alice"]), &roster, &[])
            .await
            .unwrap();

        assert_eq!(identifiers(&created), vec!["alice", "alice-1"]);
        assert!(created.iter().all(|e| e.roster_id == roster.id));
        assert_eq!(svc.entries(roster.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_collision_with_existing_entry_gets_suffix() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();
        svc.add_entry(roster.id, "bob", None).await.unwrap();

        let created = svc.create_entries(&ids(&["bob"]), &roster, &[]).await.unwrap();

        assert_eq!(identifiers(&created), vec!["bob-1"]);
    }

    #[tokio::test]
    async fn test_lms_ids_pair_positionally_and_short_list_pads_with_none() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();

        let created = svc
            .create_entries(&ids(&["a", "b", "c"]), &roster, &[Some("lms-a".to_string()), None])
            .await
            .unwrap();

        let lms: Vec<Option<&str>> = created.iter().map(|e| e.lms_user_id.as_deref()).collect();
        assert_eq!(lms, vec![Some("lms-a"), None, None]);
    }

    #[tokio::test]
    async fn test_blank_identifier_is_skipped_without_aborting() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();

        let created = svc
            .create_entries(&ids(&["alice", "   ", "bob"]), &roster, &[])
            .await
            .unwrap();

        assert_eq!(identifiers(&created), vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back_whole_batch() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();
        repo.fail_on_identifier("bob").await;

        let err = svc
            .create_entries(&ids(&["alice", "bob", "carol"]), &roster, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::IdentifierCreation { ref identifier, .. } if identifier == "bob"));
        assert!(svc.entries(roster.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_roster_is_a_validation_error() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let ghost = Roster {
            id: 999,
            identifier: "ghost".to_string(),
            created_at: chrono::Utc::now(),
        };

        let err = svc.create_entries(&ids(&["alice"]), &ghost, &[]).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Validation {
                field: EntryField::Roster,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_add_entry_rejects_blank_identifier() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();

        let err = svc.add_entry(roster.id, "", None).await.unwrap_err();
        assert!(err.is_identifier_validation());
    }

    #[tokio::test]
    async fn test_link_and_unlink_user() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();
        let entry = svc.add_entry(roster.id, "alice", None).await.unwrap();
        let user = repo
            .create_user(Some(GithubAccount {
                github_id: 1,
                login: "alice-gh".to_string(),
                name: None,
            }))
            .await
            .unwrap();

        let linked = svc.link_user(entry.id, user.id).await.unwrap();
        assert_eq!(linked.user_id, Some(user.id));

        let unlinked = svc.unlink_user(entry.id).await.unwrap();
        assert_eq!(unlinked.user_id, None);
    }

    #[tokio::test]
    async fn test_link_to_unknown_user_is_not_found() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        let roster = svc.create_roster("CS 101").await.unwrap();
        let entry = svc.add_entry(roster.id, "alice", None).await.unwrap();

        let err = svc.link_user(entry.id, 42).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "user", id: 42 }));
    }

    #[tokio::test]
    async fn test_create_roster_rejects_blank_name() {
        let repo = Arc::new(MemoryRepo::new());
        let svc = service(&repo);
        assert!(svc.create_roster("  ").await.is_err());
    }
}

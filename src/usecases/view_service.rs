//! Roster list view: sorting, search and team filtering.

use crate::domain::ordering::{order_by_identifier, order_by_repo_created_at, order_for_view};
use crate::domain::search::{search_by_identifier, students_not_on_team};
use crate::domain::{AssignmentId, DomainError, GroupAssignmentId, RosterEntry, RosterId, SortMode};
use crate::ports::{AssignmentPort, RosterRepoPort};
use std::sync::Arc;
use tracing::debug;

/// Read-side service for displaying a roster.
pub struct RosterViewService {
    repo: Arc<dyn RosterRepoPort>,
    assignments: Arc<dyn AssignmentPort>,
}

impl RosterViewService {
    pub fn new(repo: Arc<dyn RosterRepoPort>, assignments: Arc<dyn AssignmentPort>) -> Self {
        Self { repo, assignments }
    }

    /// Entries in the chosen sort mode.
    ///
    /// `RepoCreatedAt` needs an assignment; without one it falls back to
    /// identifier order.
    pub async fn sorted_entries(
        &self,
        roster_id: RosterId,
        mode: SortMode,
        assignment_id: Option<AssignmentId>,
    ) -> Result<Vec<RosterEntry>, DomainError> {
        match (mode, assignment_id) {
            (SortMode::RepoCreatedAt, Some(assignment_id)) => {
                let mut rows = self
                    .assignments
                    .entries_with_repo_created_at(roster_id, assignment_id)
                    .await?;
                order_by_repo_created_at(&mut rows);
                Ok(rows.into_iter().map(|r| r.entry).collect())
            }
            (SortMode::RepoCreatedAt, None) => {
                debug!(roster_id, "no assignment for repo sort; using identifier order");
                self.by_identifier(roster_id).await
            }
            (SortMode::StudentIdentifier, _) => self.by_identifier(roster_id).await,
        }
    }

    async fn by_identifier(&self, roster_id: RosterId) -> Result<Vec<RosterEntry>, DomainError> {
        let mut entries = self.repo.list_entries(roster_id).await?;
        order_by_identifier(&mut entries);
        Ok(entries)
    }

    /// Sorted entries whose identifier contains `query` (case-insensitive).
    pub async fn search(
        &self,
        roster_id: RosterId,
        query: &str,
        mode: SortMode,
        assignment_id: Option<AssignmentId>,
    ) -> Result<Vec<RosterEntry>, DomainError> {
        let entries = self.sorted_entries(roster_id, mode, assignment_id).await?;
        Ok(search_by_identifier(&entries, query)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Accepted students first, then linked students who have not accepted, then unlinked.
    pub async fn order_for_view(
        &self,
        roster_id: RosterId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<RosterEntry>, DomainError> {
        let accepted = self.assignments.accepted_user_ids(assignment_id).await?;
        let mut entries = self.repo.list_entries(roster_id).await?;
        order_for_view(&mut entries, &accepted);
        Ok(entries)
    }

    /// Entries not yet on a team for the group assignment, in identifier order.
    pub async fn students_not_on_team(
        &self,
        roster_id: RosterId,
        group_assignment_id: GroupAssignmentId,
    ) -> Result<Vec<RosterEntry>, DomainError> {
        let on_team = self.assignments.team_member_ids(group_assignment_id).await?;
        let entries = self.by_identifier(roster_id).await?;
        Ok(students_not_on_team(&entries, &on_team)
            .into_iter()
            .cloned()
            .collect())
    }
}

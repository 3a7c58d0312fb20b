//! Export service. Renders a roster as CSV and writes it to disk.

use crate::adapters::export::entries_to_csv;
use crate::domain::{DomainError, GroupAssignmentId, RosterId, UserId};
use crate::ports::{AssignmentPort, RosterRepoPort, UserPort};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub struct ExportService {
    repo: Arc<dyn RosterRepoPort>,
    users: Arc<dyn UserPort>,
    assignments: Arc<dyn AssignmentPort>,
}

impl ExportService {
    pub fn new(
        repo: Arc<dyn RosterRepoPort>,
        users: Arc<dyn UserPort>,
        assignments: Arc<dyn AssignmentPort>,
    ) -> Self {
        Self {
            repo,
            users,
            assignments,
        }
    }

    /// CSV for the roster. `group_names` adds the `group_name` column when non-empty.
    pub async fn export_roster(
        &self,
        roster_id: RosterId,
        group_names: &HashMap<UserId, String>,
    ) -> Result<String, DomainError> {
        let entries = self.repo.list_entries(roster_id).await?;
        let accounts = self.users.linked_accounts(roster_id).await?;
        entries_to_csv(&entries, &accounts, group_names)
            .map_err(|e| DomainError::Export(format!("Failed to generate CSV: {}", e)))
    }

    /// CSV for the roster with each student's team for the group assignment.
    pub async fn export_roster_with_teams(
        &self,
        roster_id: RosterId,
        group_assignment_id: GroupAssignmentId,
    ) -> Result<String, DomainError> {
        let group_names = self.assignments.team_names(group_assignment_id).await?;
        self.export_roster(roster_id, &group_names).await
    }

    /// Write the roster CSV to `dir/roster_{id}.csv` and return the path.
    ///
    /// Writes to a temp file first, syncs it, then renames over the target so a
    /// crash never leaves a half-written export.
    pub async fn export_to_file(
        &self,
        roster_id: RosterId,
        group_names: &HashMap<UserId, String>,
        dir: &Path,
    ) -> Result<PathBuf, DomainError> {
        let csv = self.export_roster(roster_id, group_names).await?;

        fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::Export(format!("create export dir: {}", e)))?;
        let path = dir.join(format!("roster_{}.csv", roster_id));
        let temp_path = path.with_extension("csv.tmp");

        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::Export(format!("create temp file: {}", e)))?;
        f.write_all(csv.as_bytes())
            .await
            .map_err(|e| DomainError::Export(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::Export(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| DomainError::Export(format!("atomic rename failed: {}", e)))?;

        info!(path = %path.display(), roster_id, "roster exported");
        Ok(path)
    }
}

//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Main menu: import students, add one, list (with sort mode), search, export CSV.

use crate::adapters::import::read_identifier_file;
use crate::domain::{AssignmentId, DomainError, Roster, RosterEntry, SortMode};
use crate::ports::InputPort;
use crate::usecases::{ExportService, RosterService, RosterViewService};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, CustomType, InquireError, Select, Text};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const NEW_ROSTER: &str = "+ New roster";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Import,
    AddStudent,
    List,
    Search,
    Export,
    SwitchRoster,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 7] = [
        MenuItem::Import,
        MenuItem::AddStudent,
        MenuItem::List,
        MenuItem::Search,
        MenuItem::Export,
        MenuItem::SwitchRoster,
        MenuItem::Quit,
    ];
}

impl std::fmt::Display for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MenuItem::Import => "Import students from file",
            MenuItem::AddStudent => "Add a student",
            MenuItem::List => "List students",
            MenuItem::Search => "Search students",
            MenuItem::Export => "Export CSV",
            MenuItem::SwitchRoster => "Switch roster",
            MenuItem::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// Prompt styling shared by every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightGreen))
        .with_highlighted_option_prefix(Styled::new("▸").with_fg(Color::LightYellow));
    inquire::set_global_render_config(config);
}

/// Esc / Ctrl-C on a prompt means "go back", not an error.
fn cancelled(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

fn input_err(e: InquireError) -> DomainError {
    DomainError::Input(e.to_string())
}

fn print_entries(entries: &[RosterEntry]) {
    if entries.is_empty() {
        println!("  (no students)");
        return;
    }
    for entry in entries {
        let status = if entry.is_linked() { "linked" } else { "-" };
        let lms = entry.lms_user_id.as_deref().unwrap_or("");
        println!("  {:<30} {:<8} {}", entry.identifier, status, lms);
    }
    println!("  {} student(s)", entries.len());
}

/// `stored` is `requested` with a `-N` suffix.
fn is_suffixed_form(requested: &str, stored: &str) -> bool {
    stored
        .strip_prefix(requested)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Pairs created entries with the identifiers they were requested as, in input order,
/// and returns the pairs that were renamed. Requested identifiers with no created
/// entry (skipped by validation) are passed over.
fn renamed_duplicates<'a>(
    requested: &'a [String],
    created: &'a [RosterEntry],
) -> Vec<(&'a str, &'a str)> {
    let mut renamed = Vec::new();
    let mut created = created.iter().peekable();
    for wanted in requested {
        let Some(&entry) = created.peek() else { break };
        if entry.identifier == *wanted {
            created.next();
        } else if is_suffixed_form(wanted, &entry.identifier) {
            renamed.push((wanted.as_str(), entry.identifier.as_str()));
            created.next();
        }
    }
    renamed
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    rosters: Arc<RosterService>,
    view: Arc<RosterViewService>,
    export: Arc<ExportService>,
    export_dir: PathBuf,
    default_roster: Option<String>,
}

impl TuiInputPort {
    pub fn new(
        rosters: Arc<RosterService>,
        view: Arc<RosterViewService>,
        export: Arc<ExportService>,
        export_dir: PathBuf,
        default_roster: Option<String>,
    ) -> Self {
        Self {
            rosters,
            view,
            export,
            export_dir,
            default_roster,
        }
    }

    /// Pick an existing roster or create one. `None` when the user backs out.
    async fn choose_roster(&self, allow_default: bool) -> Result<Option<Roster>, DomainError> {
        let rosters = self.rosters.rosters().await?;

        if allow_default {
            if let Some(name) = &self.default_roster {
                if let Some(r) = rosters.iter().find(|r| &r.identifier == name) {
                    return Ok(Some(r.clone()));
                }
                warn!(roster = %name, "default roster not found");
            }
        }

        let mut options: Vec<String> = rosters
            .iter()
            .map(|r| format!("{} (#{})", r.identifier, r.id))
            .collect();
        options.push(NEW_ROSTER.to_string());

        let picked = match Select::new("Roster", options.clone()).prompt() {
            Ok(p) => p,
            Err(e) if cancelled(&e) => return Ok(None),
            Err(e) => return Err(input_err(e)),
        };

        if picked == NEW_ROSTER {
            let name = match Text::new("Roster name:").prompt() {
                Ok(n) => n,
                Err(e) if cancelled(&e) => return Ok(None),
                Err(e) => return Err(input_err(e)),
            };
            return self.rosters.create_roster(&name).await.map(Some);
        }

        let index = options.iter().position(|o| o == &picked).unwrap_or(0);
        Ok(rosters.get(index).cloned())
    }

    async fn import(&self, roster: &Roster) -> Result<(), DomainError> {
        let path = Text::new("Path to identifier file (.txt or .csv):")
            .prompt()
            .map_err(input_err)?;
        let import = read_identifier_file(path.trim()).await?;
        if import.identifiers.is_empty() {
            println!("No identifiers found.");
            return Ok(());
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Creating {} entries...", import.identifiers.len()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        let result = self
            .rosters
            .create_entries(&import.identifiers, roster, &import.lms_user_ids)
            .await;
        spinner.finish_and_clear();

        let created = result?;
        println!("Created {} student(s).", created.len());
        for (requested, stored) in renamed_duplicates(&import.identifiers, &created) {
            println!("  renamed duplicate {} -> {}", requested, stored);
        }
        Ok(())
    }

    async fn add_student(&self, roster: &Roster) -> Result<(), DomainError> {
        let identifier = Text::new("Student identifier:").prompt().map_err(input_err)?;
        match self.rosters.add_entry(roster.id, identifier.trim(), None).await {
            Ok(entry) => println!("Added {}.", entry.identifier),
            Err(e @ DomainError::Validation { .. }) => println!("Not added: {}", e),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn prompt_sort(&self) -> Result<(SortMode, Option<AssignmentId>), DomainError> {
        let labels: Vec<&str> = SortMode::all().iter().map(|m| m.label()).collect();
        let label = Select::new("Sort by", labels).prompt().map_err(input_err)?;
        let mode = SortMode::from_label(label).unwrap_or_default();
        let assignment = match mode {
            SortMode::RepoCreatedAt => Some(
                CustomType::<AssignmentId>::new("Assignment id:")
                    .prompt()
                    .map_err(input_err)?,
            ),
            SortMode::StudentIdentifier => None,
        };
        Ok((mode, assignment))
    }

    async fn list(&self, roster: &Roster) -> Result<(), DomainError> {
        let (mode, assignment) = self.prompt_sort()?;
        let entries = self.view.sorted_entries(roster.id, mode, assignment).await?;
        print_entries(&entries);
        Ok(())
    }

    async fn search(&self, roster: &Roster) -> Result<(), DomainError> {
        let query = Text::new("Search identifier:").prompt().map_err(input_err)?;
        let entries = self
            .view
            .search(roster.id, &query, SortMode::StudentIdentifier, None)
            .await?;
        print_entries(&entries);
        Ok(())
    }

    async fn export_csv(&self, roster: &Roster) -> Result<(), DomainError> {
        let with_teams = Confirm::new("Include team names from a group assignment?")
            .with_default(false)
            .prompt()
            .map_err(input_err)?;
        if with_teams {
            let group_assignment = CustomType::<i64>::new("Group assignment id:")
                .prompt()
                .map_err(input_err)?;
            let csv = self
                .export
                .export_roster_with_teams(roster.id, group_assignment)
                .await?;
            println!("{}", csv);
            return Ok(());
        }
        let path = self
            .export
            .export_to_file(roster.id, &HashMap::new(), &self.export_dir)
            .await?;
        println!("Exported to {}", path.display());
        Ok(())
    }

    /// Run one menu action; cancelled prompts return to the menu.
    async fn dispatch(&self, item: MenuItem, roster: &Roster) -> Result<(), DomainError> {
        let result = match item {
            MenuItem::Import => self.import(roster).await,
            MenuItem::AddStudent => self.add_student(roster).await,
            MenuItem::List => self.list(roster).await,
            MenuItem::Search => self.search(roster).await,
            MenuItem::Export => self.export_csv(roster).await,
            MenuItem::SwitchRoster | MenuItem::Quit => Ok(()),
        };
        match result {
            Err(DomainError::Input(msg)) => {
                warn!(error = %msg, "prompt aborted");
                Ok(())
            }
            other => other,
        }
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let Some(mut roster) = self.choose_roster(true).await? else {
            return Ok(());
        };

        loop {
            println!();
            let prompt = format!("{} ›", roster.identifier);
            let item = match Select::new(&prompt, MenuItem::ALL.to_vec()).prompt() {
                Ok(item) => item,
                Err(e) if cancelled(&e) => MenuItem::Quit,
                Err(e) => return Err(input_err(e)),
            };

            match item {
                MenuItem::Quit => return Ok(()),
                MenuItem::SwitchRoster => {
                    if let Some(r) = self.choose_roster(false).await? {
                        roster = r;
                    }
                }
                other => {
                    if let Err(e) = self.dispatch(other, &roster).await {
                        println!("Error: {}", e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn created(identifiers: &[&str]) -> Vec<RosterEntry> {
        identifiers
            .iter()
            .enumerate()
            .map(|(i, identifier)| RosterEntry {
                id: i as i64 + 1,
                roster_id: 1,
                identifier: identifier.to_string(),
                user_id: None,
                lms_user_id: None,
                created_at: Utc::now(),
            })
            .collect()
    }

    fn requested(identifiers: &[&str]) -> Vec<String> {
        identifiers.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_renamed_duplicates_pairs_by_position() {
        let wanted = requested(&["alice", "alice", "alice-1"]);
        let stored = created(&["alice", "alice-1", "alice-1-1"]);
        assert_eq!(
            renamed_duplicates(&wanted, &stored),
            vec![("alice", "alice-1"), ("alice-1", "alice-1-1")]
        );
    }

    #[test]
    fn test_renamed_duplicates_passes_over_skipped_identifiers() {
        let wanted = requested(&["bob", "carol", "bob"]);
        let stored = created(&["bob-1", "bob-2"]);
        assert_eq!(
            renamed_duplicates(&wanted, &stored),
            vec![("bob", "bob-1"), ("bob", "bob-2")]
        );
    }

    #[test]
    fn test_suffixed_form_needs_digits() {
        assert!(is_suffixed_form("x", "x-12"));
        assert!(!is_suffixed_form("x", "x-"));
        assert!(!is_suffixed_form("x", "x-y"));
        assert!(!is_suffixed_form("x", "x"));
    }
}

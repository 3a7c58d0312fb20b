//! Display ordering for roster entries.
//!
//! Each ordering is a pure comparator over entries plus the context it needs
//! (repo timestamps, accepted users). Ties always fall back to the entry id so a
//! given roster renders the same way every time.

use crate::domain::entities::{EntryWithRepo, RosterEntry, UserId};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Selectable sort modes for the roster list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    StudentIdentifier,
    RepoCreatedAt,
}

impl SortMode {
    pub fn all() -> &'static [SortMode] {
        &[SortMode::StudentIdentifier, SortMode::RepoCreatedAt]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::StudentIdentifier => "Student identifier",
            SortMode::RepoCreatedAt => "Created at",
        }
    }

    pub fn from_label(label: &str) -> Option<SortMode> {
        Self::all().iter().copied().find(|m| m.label() == label)
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier ascending (byte order), then id.
pub fn order_by_identifier(entries: &mut [RosterEntry]) {
    entries.sort_by(|a, b| a.identifier.cmp(&b.identifier).then(a.id.cmp(&b.id)));
}

/// Repo creation time ascending; entries without a repo go last, then id.
pub fn order_by_repo_created_at(rows: &mut [EntryWithRepo]) {
    rows.sort_by(|a, b| {
        nulls_last(&a.repo_created_at, &b.repo_created_at).then(a.entry.id.cmp(&b.entry.id))
    });
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Acceptance status of an entry relative to one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AcceptanceStatus {
    Accepted = 0,
    LinkedNotAccepted = 1,
    Unlinked = 2,
}

impl AcceptanceStatus {
    pub fn of(entry: &RosterEntry, accepted_user_ids: &HashSet<UserId>) -> Self {
        match entry.user_id {
            None => AcceptanceStatus::Unlinked,
            Some(user_id) if accepted_user_ids.contains(&user_id) => AcceptanceStatus::Accepted,
            Some(_) => AcceptanceStatus::LinkedNotAccepted,
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

/// Accepted first, then linked-but-not-accepted, then unlinked; ties by id.
pub fn order_for_view(entries: &mut [RosterEntry], accepted_user_ids: &HashSet<UserId>) {
    entries.sort_by_cached_key(|e| (AcceptanceStatus::of(e, accepted_user_ids), e.id));
}

//! Search and filter over roster entries.

use crate::domain::entities::{RosterEntry, UserId};
use std::collections::HashSet;

/// Case-insensitive substring match on the identifier. A blank query keeps everything;
/// any other query is matched as typed, surrounding whitespace included.
pub fn search_by_identifier<'a>(entries: &'a [RosterEntry], query: &str) -> Vec<&'a RosterEntry> {
    if query.trim().is_empty() {
        return entries.iter().collect();
    }
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|e| e.identifier.to_lowercase().contains(&needle))
        .collect()
}

/// Entries that are unlinked, or whose user is not on any team for the group assignment.
pub fn students_not_on_team<'a>(
    entries: &'a [RosterEntry],
    team_member_ids: &HashSet<UserId>,
) -> Vec<&'a RosterEntry> {
    entries
        .iter()
        .filter(|e| match e.user_id {
            None => true,
            Some(user_id) => !team_member_ids.contains(&user_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: i64, identifier: &str, user_id: Option<i64>) -> RosterEntry {
        RosterEntry {
            id,
            roster_id: 1,
            identifier: identifier.to_string(),
            user_id,
            lms_user_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let entries = vec![
            entry(1, "Alice.Smith", None),
            entry(2, "bob", None),
            entry(3, "MALICE", None),
        ];
        let hits: Vec<i64> = search_by_identifier(&entries, "alic").iter().map(|e| e.id).collect();
        assert_eq!(hits, vec![1, 3]);
    }

    #[test]
    fn test_blank_query_matches_all() {
        let entries = vec![entry(1, "a", None), entry(2, "b", None)];
        assert_eq!(search_by_identifier(&entries, "  ").len(), 2);
    }

    #[test]
    fn test_surrounding_whitespace_is_part_of_the_query() {
        let entries = vec![entry(1, "alice", None), entry(2, "mary ann", None)];
        assert!(search_by_identifier(&entries, " alice").is_empty());
        let hits: Vec<i64> = search_by_identifier(&entries, " ann").iter().map(|e| e.id).collect();
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn test_not_on_team_keeps_unlinked_and_teamless() {
        let entries = vec![
            entry(1, "unlinked", None),
            entry(2, "on-team", Some(20)),
            entry(3, "no-team", Some(30)),
        ];
        let on_team: HashSet<i64> = [20].into_iter().collect();
        let ids: Vec<i64> = students_not_on_team(&entries, &on_team).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}

//! Roster CSV export. Uses the `csv` crate for quoting and escaping.
//!
//! Columns: `identifier,github_username,github_id,name[,group_name]`, every field quoted.

use crate::domain::{GithubAccount, RosterEntry, UserId};
use std::collections::HashMap;

const BASE_COLUMNS: [&str; 4] = ["identifier", "github_username", "github_id", "name"];
const GROUP_COLUMN: &str = "group_name";

/// Convert roster entries to a CSV string, one row per entry sorted by identifier.
///
/// # Arguments
/// * `entries` - Entries of one roster (any order)
/// * `accounts` - GitHub account of each linked user; missing accounts export as empty fields
/// * `group_names` - user id -> team name. The `group_name` column is only written
///   when this map is non-empty; entries without a group get an empty field.
pub fn entries_to_csv(
    entries: &[RosterEntry],
    accounts: &HashMap<UserId, GithubAccount>,
    group_names: &HashMap<UserId, String>,
) -> Result<String, csv::Error> {
    let with_groups = !group_names.is_empty();

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::Always)
        .has_headers(false)
        .from_writer(Vec::new());

    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    if with_groups {
        header.push(GROUP_COLUMN);
    }
    wtr.write_record(&header)?;

    let mut sorted: Vec<&RosterEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    for entry in sorted {
        let account = entry.user_id.and_then(|id| accounts.get(&id));
        let login = account.map(|a| a.login.clone()).unwrap_or_default();
        let github_id = account.map(|a| a.github_id.to_string()).unwrap_or_default();
        let name = account.and_then(|a| a.name.clone()).unwrap_or_default();

        let mut row = vec![entry.identifier.clone(), login, github_id, name];
        if with_groups {
            let group = entry
                .user_id
                .and_then(|id| group_names.get(&id))
                .cloned()
                .unwrap_or_default();
            row.push(group);
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))
    })?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

//! Identifier list import.
//!
//! Two formats are accepted:
//! - a plain list, one identifier per line;
//! - CSV with a header row naming an `identifier` column and, optionally, an
//!   `lms_user_id` column.
//!
//! Values are trimmed and blank rows skipped.

use crate::domain::DomainError;
use std::path::Path;

const IDENTIFIER_HEADER: &str = "identifier";
const LMS_HEADER: &str = "lms_user_id";

/// Parsed import, ready for `RosterService::create_entries`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdentifierImport {
    pub identifiers: Vec<String>,
    /// Same length as `identifiers` when the file has an `lms_user_id` column, empty otherwise.
    pub lms_user_ids: Vec<Option<String>>,
}

pub async fn read_identifier_file(path: impl AsRef<Path>) -> Result<IdentifierImport, DomainError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DomainError::Import(format!("{}: {}", path.display(), e)))?;
    parse_identifiers(&text)
}

pub fn parse_identifiers(text: &str) -> Result<IdentifierImport, DomainError> {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if header_columns(first_line).is_some() {
        parse_csv(text)
    } else {
        Ok(parse_plain(text))
    }
}

/// (identifier column, lms column) when `line` is a CSV header naming an identifier column.
fn header_columns(line: &str) -> Option<(usize, Option<usize>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());
    let record = rdr.records().next()?.ok()?;
    columns_of(&record)
}

fn columns_of(record: &csv::StringRecord) -> Option<(usize, Option<usize>)> {
    let position = |name: &str| record.iter().position(|f| f.eq_ignore_ascii_case(name));
    let identifier = position(IDENTIFIER_HEADER)?;
    Some((identifier, position(LMS_HEADER)))
}

fn parse_plain(text: &str) -> IdentifierImport {
    IdentifierImport {
        identifiers: text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        lms_user_ids: Vec::new(),
    }
}

fn parse_csv(text: &str) -> Result<IdentifierImport, DomainError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut columns = None;
    let mut import = IdentifierImport::default();

    for record in rdr.records() {
        let record = record.map_err(|e| DomainError::Import(e.to_string()))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let Some((id_col, lms_col)) = columns else {
            columns = columns_of(&record);
            if columns.is_none() {
                return Err(DomainError::Import("missing identifier column".to_string()));
            }
            continue;
        };

        let identifier = record.get(id_col).unwrap_or("");
        if identifier.is_empty() {
            continue;
        }
        import.identifiers.push(identifier.to_string());
        if let Some(lms_col) = lms_col {
            let lms = record.get(lms_col).filter(|v| !v.is_empty()).map(str::to_string);
            import.lms_user_ids.push(lms);
        }
    }

    Ok(import)
}

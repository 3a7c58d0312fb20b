//! Import adapters. Read identifier lists uploaded by instructors.

pub mod identifier_file;

pub use identifier_file::{parse_identifiers, read_identifier_file, IdentifierImport};

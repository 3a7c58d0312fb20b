//! Infrastructure adapters. Implement outbound ports.
//!
//! Storage, CSV export, identifier import, terminal UI. Map errors to DomainError.

pub mod export;
pub mod import;
pub mod persistence;
pub mod ui;

//! Export adapters. Render rosters for download.

pub mod csv_export;

pub use csv_export::entries_to_csv;

//! classroom-roster: student rosters with duplicate-safe bulk import, display ordering
//! and CSV export, in a hexagonal layout.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;

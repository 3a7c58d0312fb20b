//! Application use cases. Orchestrate domain logic via ports.

pub mod export_service;
pub mod roster_service;
pub mod view_service;

pub use export_service::ExportService;
pub use roster_service::RosterService;
pub use view_service::RosterViewService;

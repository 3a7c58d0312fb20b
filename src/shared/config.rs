//! Application configuration. Storage backend, paths, default roster.

use serde::Deserialize;
use std::path::PathBuf;

/// Default directory for the database and exports.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Storage backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    /// Nothing persisted; useful for demos and dry runs.
    Memory,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding roster.db. Read from ROSTER_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Storage backend: "sqlite" (default) or "memory". Read from ROSTER_STORAGE.
    #[serde(default)]
    pub storage: Option<StorageKind>,

    /// Roster selected on startup when it exists (matched by name). Read from ROSTER_DEFAULT_ROSTER.
    #[serde(default)]
    pub default_roster: Option<String>,

    /// Directory CSV exports are written to. Read from ROSTER_EXPORT_DIR.
    #[serde(default)]
    pub export_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("ROSTER"));
        if let Ok(path) = std::env::var("ROSTER_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Returns the data directory. Defaults to ./data.
    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    /// Returns the storage backend. Defaults to SQLite.
    pub fn storage_or_default(&self) -> StorageKind {
        self.storage.unwrap_or_default()
    }

    /// Returns the export directory. Defaults to `<data_dir>/exports`.
    pub fn export_dir_or_default(&self) -> PathBuf {
        self.export_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir_or_default().join("exports"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.data_dir_or_default(), PathBuf::from("./data"));
        assert_eq!(cfg.storage_or_default(), StorageKind::Sqlite);
        assert_eq!(cfg.export_dir_or_default(), PathBuf::from("./data/exports"));
    }

    #[test]
    fn test_export_dir_follows_data_dir() {
        let cfg = AppConfig {
            data_dir: Some("/srv/roster".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.export_dir_or_default(), PathBuf::from("/srv/roster/exports"));
    }
}

//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use classroom_roster::adapters::persistence::{MemoryRepo, SqliteRepo};
use classroom_roster::adapters::ui::tui::TuiInputPort;
use classroom_roster::ports::{AssignmentPort, InputPort, RosterRepoPort, UserPort};
use classroom_roster::shared::{AppConfig, StorageKind};
use classroom_roster::usecases::{ExportService, RosterService, RosterViewService};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The three storage ports, all served by one adapter.
struct Storage {
    repo: Arc<dyn RosterRepoPort>,
    users: Arc<dyn UserPort>,
    assignments: Arc<dyn AssignmentPort>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    classroom_roster::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration, using defaults");
        AppConfig::default()
    });

    let storage = open_storage(&cfg).await?;

    // --- Services ---
    let roster_service = Arc::new(RosterService::new(
        Arc::clone(&storage.repo),
        Arc::clone(&storage.users),
    ));
    let view_service = Arc::new(RosterViewService::new(
        Arc::clone(&storage.repo),
        Arc::clone(&storage.assignments),
    ));
    let export_service = Arc::new(ExportService::new(
        Arc::clone(&storage.repo),
        Arc::clone(&storage.users),
        Arc::clone(&storage.assignments),
    ));

    let export_dir = cfg.export_dir_or_default();
    info!(path = %export_dir.display(), "export directory");

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        roster_service,
        view_service,
        export_service,
        export_dir,
        cfg.default_roster.clone(),
    ));

    // --- Run (main menu -> import / list / search / export) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

/// Build the configured storage adapter and hand it out behind each port.
async fn open_storage(cfg: &AppConfig) -> anyhow::Result<Storage> {
    match cfg.storage_or_default() {
        StorageKind::Sqlite => {
            let data_path = cfg.data_dir_or_default();
            let data_dir_abs = data_path
                .canonicalize()
                .unwrap_or_else(|_| data_path.clone());
            info!(path = %data_dir_abs.display(), "data directory");
            let sqlite_repo = Arc::new(
                SqliteRepo::connect(&data_path)
                    .await
                    .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
            );
            Ok(Storage {
                repo: Arc::clone(&sqlite_repo) as Arc<dyn RosterRepoPort>,
                users: Arc::clone(&sqlite_repo) as Arc<dyn UserPort>,
                assignments: sqlite_repo as Arc<dyn AssignmentPort>,
            })
        }
        StorageKind::Memory => {
            warn!("ROSTER_STORAGE=memory: nothing will be persisted");
            let memory_repo = Arc::new(MemoryRepo::new());
            Ok(Storage {
                repo: Arc::clone(&memory_repo) as Arc<dyn RosterRepoPort>,
                users: Arc::clone(&memory_repo) as Arc<dyn UserPort>,
                assignments: memory_repo as Arc<dyn AssignmentPort>,
            })
        }
    }
}

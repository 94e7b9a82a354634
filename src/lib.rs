pub mod audio;
pub mod db;
pub mod mirror;
pub mod models;
pub mod plan;
pub mod recorder;
pub mod settings;
pub mod sync;
pub mod timer;

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{info, warn};

use audio::ChimeHandle;
use db::Database;
use mirror::LocalMirror;
use plan::PlanStore;
use recorder::SessionRecorder;
use settings::SettingsStore;
use sync::{BackgroundSync, HttpRemote, NoSyncHost, RemoteSink, SyncCoordinator, SyncHost};
use timer::TimerController;

/// Initialize logging (reads RUST_LOG env var).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

/// Fully wired tracker core: stores, timer, and the sync pipeline.
pub struct App {
    pub settings: Arc<SettingsStore>,
    pub plans: Arc<PlanStore>,
    pub mirror: Arc<LocalMirror>,
    pub recorder: Arc<SessionRecorder>,
    pub timer: TimerController,
    pub coordinator: Arc<SyncCoordinator>,
    pub db: Option<Database>,
    sync: Option<Arc<BackgroundSync>>,
}

impl App {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
        let cfg = settings.current();

        let mirror = Arc::new(LocalMirror::new(data_dir.join("time_logs.json"))?);
        let plans = Arc::new(PlanStore::new(
            data_dir.join("day_plans.json"),
            cfg.total_day_hours,
        )?);

        let remote: Arc<dyn RemoteSink> = Arc::new(HttpRemote::new(
            &cfg.endpoint_url,
            Duration::from_secs(cfg.send_timeout_secs),
        )?);

        // The outbox is best-effort: if the store cannot be opened we
        // degrade to immediate sends instead of refusing to start.
        let db = match Database::new(data_dir.join("tracker.sqlite3")) {
            Ok(db) => Some(db),
            Err(err) => {
                warn!("Outbox storage unavailable, sessions will be sent directly: {err:#}");
                None
            }
        };

        let sync = db.clone().map(|db| {
            Arc::new(BackgroundSync::spawn(
                db,
                remote.clone(),
                Duration::from_secs(cfg.retry_interval_secs),
            ))
        });
        let host: Arc<dyn SyncHost> = match &sync {
            Some(sync) => sync.clone(),
            None => Arc::new(NoSyncHost),
        };

        let coordinator = Arc::new(SyncCoordinator::new(db.clone(), remote, host));
        let recorder = Arc::new(SessionRecorder::new(
            mirror.clone(),
            plans.clone(),
            coordinator.clone(),
            settings.clone(),
            ChimeHandle::new(),
        ));
        let timer = TimerController::new(recorder.clone());

        // Flush anything a previous run left behind.
        if let Some(sync) = &sync {
            info!("Requesting startup drain of the sync outbox");
            let _ = sync.request_sync();
        }

        Ok(Self {
            settings,
            plans,
            mirror,
            recorder,
            timer,
            coordinator,
            db,
            sync,
        })
    }

    /// Stop the background sync worker. In-flight sends finish; pending
    /// outbox entries wait for the next launch.
    pub async fn shutdown(&self) {
        if let Some(sync) = &self.sync {
            sync.shutdown().await;
        }
    }
}

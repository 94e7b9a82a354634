use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{error, info};
use tokio::{sync::Notify, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use super::{drain::drain_outbox, remote::RemoteSink};
use crate::db::Database;

/// The host deferred-trigger facility: the coordinator registers a request
/// and the host invokes the drain at a time of its own choosing.
pub trait SyncHost: Send + Sync {
    /// Whether deferred sync is usable in this environment at all.
    fn is_available(&self) -> bool;
    /// Ask the host to run the drain at the next opportunity. Timing is the
    /// host's call; the only promise is "eventually, while the host lives".
    fn request_sync(&self) -> Result<()>;
}

/// Stand-in host for environments without a durable deferred-sync facility.
/// The coordinator sees it as unavailable and sends records directly.
pub struct NoSyncHost;

impl SyncHost for NoSyncHost {
    fn is_available(&self) -> bool {
        false
    }

    fn request_sync(&self) -> Result<()> {
        Err(anyhow!("deferred sync is not available"))
    }
}

/// Tokio-backed host: a background task waits for sync requests, runs one
/// drain pass per wakeup, and re-arms a retry timer whenever a pass halts.
/// Requests arriving mid-pass coalesce into the next pass.
pub struct BackgroundSync {
    notify: Arc<Notify>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundSync {
    pub fn spawn(db: Database, remote: Arc<dyn RemoteSink>, retry_interval: Duration) -> Self {
        let notify = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(run_loop(
            db,
            remote,
            notify.clone(),
            cancel.clone(),
            retry_interval,
        ));

        Self {
            notify,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!("Sync worker did not shut down cleanly: {err}");
            }
        }
    }
}

impl SyncHost for BackgroundSync {
    fn is_available(&self) -> bool {
        true
    }

    fn request_sync(&self) -> Result<()> {
        self.notify.notify_one();
        Ok(())
    }
}

async fn run_loop(
    db: Database,
    remote: Arc<dyn RemoteSink>,
    notify: Arc<Notify>,
    cancel: CancellationToken,
    retry_interval: Duration,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = notify.notified() => {}
        }

        loop {
            let report = match drain_outbox(&db, remote.as_ref()).await {
                Ok(report) => report,
                Err(err) => {
                    error!("Drain pass failed: {err:#}");
                    break;
                }
            };

            if !report.halted {
                break;
            }

            info!(
                "Drain halted with {} entries pending; retrying in {}s",
                report.remaining,
                retry_interval.as_secs()
            );

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = notify.notified() => {}
                _ = time::sleep(retry_interval) => {}
            }
        }
    }
}

use std::sync::Arc;

use log::{debug, info, warn};

use super::{host::SyncHost, remote::RemoteSink};
use crate::{db::Database, models::SessionRecord};

/// How a record left the coordinator. `LocalOnly` means the remote copy was
/// lost; the caller owns surfacing that warning to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Durably queued; the host will drain it later.
    Queued,
    /// Delivered to the remote right away.
    Sent,
    /// Immediate send failed with no durable path available. The mirror
    /// already holds the time; only the remote copy is missing.
    LocalOnly,
}

/// Routes each accepted record either into the durable outbox (preferred)
/// or straight to the remote when no durable path exists.
///
/// Failures here never block the caller: by the time a record reaches the
/// coordinator the mirror has already been updated, so the user's view of
/// progress is settled regardless of what happens to the remote copy.
pub struct SyncCoordinator {
    /// None when the store could not be opened (StorageUnavailable at
    /// startup); every record then takes the immediate path.
    db: Option<Database>,
    remote: Arc<dyn RemoteSink>,
    host: Arc<dyn SyncHost>,
}

impl SyncCoordinator {
    pub fn new(db: Option<Database>, remote: Arc<dyn RemoteSink>, host: Arc<dyn SyncHost>) -> Self {
        Self { db, remote, host }
    }

    pub async fn submit(&self, record: SessionRecord) -> DeliveryOutcome {
        if self.host.is_available() {
            if let Some(db) = &self.db {
                match db.append_outbox(&record).await {
                    Ok(id) => return self.register_drain(db, id, &record).await,
                    Err(err) => {
                        warn!("Outbox append failed, sending directly: {err:#}");
                    }
                }
            }
        }

        match self.remote.send(&record).await {
            Ok(()) => {
                info!(
                    "Sent session for '{}' ({}ms) directly",
                    record.category, record.duration_ms
                );
                DeliveryOutcome::Sent
            }
            Err(err) => {
                warn!(
                    "Session for '{}' on {} was not saved remotely and will not be retried: {err}",
                    record.category, record.day
                );
                DeliveryOutcome::LocalOnly
            }
        }
    }

    async fn register_drain(
        &self,
        db: &Database,
        id: i64,
        record: &SessionRecord,
    ) -> DeliveryOutcome {
        match self.host.request_sync() {
            Ok(()) => {
                debug!(
                    "Queued session for '{}' as outbox entry {id}",
                    record.category
                );
                DeliveryOutcome::Queued
            }
            Err(err) => {
                warn!("Deferred sync registration failed for entry {id}: {err:#}");
                // The entry is already durable. Try to ship it now; on
                // success clear it so a future drain does not resend it.
                if self.remote.send(record).await.is_ok() {
                    if let Err(err) = db.remove_outbox(id).await {
                        warn!("Failed to clear entry {id} after direct send: {err:#}");
                    }
                    return DeliveryOutcome::Sent;
                }
                // Send failed too, but the durable copy survives for the
                // next successful registration or the next launch.
                DeliveryOutcome::Queued
            }
        }
    }
}

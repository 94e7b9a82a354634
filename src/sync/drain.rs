use anyhow::Result;
use log::{info, warn};

use super::remote::RemoteSink;
use crate::db::Database;

/// What one drain pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: usize,
    pub remaining: usize,
    pub halted: bool,
}

/// Flush the current outbox snapshot to the remote in insertion order.
///
/// Each entry is deleted only after the remote acknowledges it. The first
/// failure halts the whole pass: the failed entry is not deleted and no
/// later entry is attempted, so delivery order always matches append order
/// and a systemic outage is never masked by partial progress. Entries
/// appended after the snapshot was taken wait for the next pass.
///
/// May be invoked concurrently with itself or with new appends; overlapping
/// passes can double-send (the contract is at-least-once) and deletes are
/// idempotent, so no coordination is needed.
pub async fn drain_outbox(db: &Database, remote: &dyn RemoteSink) -> Result<DrainReport> {
    let entries = db.list_outbox().await?;
    let total = entries.len();
    if total == 0 {
        return Ok(DrainReport::default());
    }

    info!("Draining outbox: {total} entries pending");

    let mut sent = 0;
    for entry in entries {
        match remote.send(&entry.record).await {
            Ok(()) => {
                db.remove_outbox(entry.id).await?;
                sent += 1;
            }
            Err(err) => {
                warn!(
                    "Sync halted at outbox entry {} ({} left for next pass): {err}",
                    entry.id,
                    total - sent
                );
                return Ok(DrainReport {
                    sent,
                    remaining: total - sent,
                    halted: true,
                });
            }
        }
    }

    info!("Outbox drained: {sent} entries synced");
    Ok(DrainReport {
        sent,
        remaining: 0,
        halted: false,
    })
}

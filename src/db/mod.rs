use std::{
    convert::TryFrom,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{OutboxEntry, SessionRecord};
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Handle to the durable outbox store.
///
/// All SQLite access happens on one dedicated thread; callers submit
/// closures over an mpsc channel and await the reply on a oneshot. Every
/// operation is atomic at single-entry granularity (an append assigns one
/// id, a delete removes one id); no multi-entry transactions exist.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    /// Open (or create) the store. An error here is the StorageUnavailable
    /// condition: the caller is expected to fall back to immediate sends.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("tracker-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Outbox database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Durably persist a record and return its assigned id. Ids are strictly
    /// increasing across the life of the store, including across restarts.
    pub async fn append_outbox(&self, record: &SessionRecord) -> Result<i64> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sync_outbox (category, duration_ms, day, target_hours)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.category,
                    to_i64(record.duration_ms)?,
                    record.day,
                    record.target_hours,
                ],
            )
            .context("failed to append outbox entry")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// All pending entries in insertion order (oldest first). This order is
    /// the drain's replay order.
    pub async fn list_outbox(&self) -> Result<Vec<OutboxEntry>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category, duration_ms, day, target_hours
                 FROM sync_outbox
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(OutboxEntry {
                    id: row.get(0)?,
                    record: SessionRecord {
                        category: row.get(1)?,
                        duration_ms: to_u64(row.get::<_, i64>(2)?, "duration_ms")?,
                        day: row.get(3)?,
                        target_hours: row.get(4)?,
                    },
                });
            }

            Ok(entries)
        })
        .await
    }

    /// Delete one entry. Deleting an id that is already gone is a no-op, not
    /// an error, so a retried drain can double-delete safely.
    pub async fn remove_outbox(&self, id: i64) -> Result<()> {
        self.execute(move |conn| {
            conn.execute("DELETE FROM sync_outbox WHERE id = ?1", params![id])
                .context("failed to delete outbox entry")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, duration_ms: u64) -> SessionRecord {
        SessionRecord {
            category: category.into(),
            duration_ms,
            day: "2025-10-14".into(),
            target_hours: 1.0,
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("outbox.sqlite3")).unwrap();

        let first = db.append_outbox(&record("Project", 5000)).await.unwrap();
        let second = db.append_outbox(&record("Call", 1500)).await.unwrap();
        assert!(second > first);

        let entries = db.list_outbox().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[0].record.category, "Project");
        assert_eq!(entries[1].record.duration_ms, 1500);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.sqlite3");

        let id = {
            let db = Database::new(path.clone()).unwrap();
            db.append_outbox(&record("Project", 30000)).await.unwrap()
        };

        let db = Database::new(path).unwrap();
        let entries = db.list_outbox().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);

        // Ids keep increasing after a restart.
        let next = db.append_outbox(&record("Call", 2000)).await.unwrap();
        assert!(next > id);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("outbox.sqlite3")).unwrap();

        let id = db.append_outbox(&record("Project", 5000)).await.unwrap();
        db.remove_outbox(id).await.unwrap();
        db.remove_outbox(id).await.unwrap();
        db.remove_outbox(9999).await.unwrap();

        assert!(db.list_outbox().await.unwrap().is_empty());
    }
}

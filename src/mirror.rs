use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::RwLock,
};

/// Cumulative time per category per day, persisted as one JSON blob
/// (day -> category -> milliseconds).
///
/// This is the user's source of truth for tracking progress: it is updated
/// synchronously when a session is accepted and never reads or reacts to
/// sync state. The remote copy is a best-effort export; even if a send never
/// succeeds, the mirror keeps the time.
pub struct LocalMirror {
    path: PathBuf,
    data: RwLock<HashMap<String, HashMap<String, u64>>>,
}

impl LocalMirror {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read time logs from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Add `duration_ms` to the (category, day) total and persist the whole
    /// map. Returns the new total for that pair.
    pub fn record_session(&self, category: &str, day: &str, duration_ms: u64) -> Result<u64> {
        let mut guard = self.data.write().unwrap();
        let total = guard
            .entry(day.to_string())
            .or_default()
            .entry(category.to_string())
            .or_insert(0);
        *total += duration_ms;
        let new_total = *total;
        self.persist(&guard)?;
        Ok(new_total)
    }

    pub fn totals_for_day(&self, day: &str) -> HashMap<String, u64> {
        self.data
            .read()
            .unwrap()
            .get(day)
            .cloned()
            .unwrap_or_default()
    }

    fn persist(&self, data: &HashMap<String, HashMap<String, u64>>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write time logs to {}", self.path.display()))
    }
}

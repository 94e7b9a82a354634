use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// User-tunable knobs, persisted as pretty JSON next to the data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Sessions shorter than this are dropped before they touch the mirror
    /// or the outbox.
    pub min_session_ms: u64,
    /// Remote endpoint accepting completed session records.
    pub endpoint_url: String,
    /// Bound on each remote send; a hung request would otherwise stall the
    /// drain batch indefinitely.
    pub send_timeout_secs: u64,
    /// How long a halted drain waits before the next attempt.
    pub retry_interval_secs: u64,
    /// Hours a single day plan may allocate in total.
    pub total_day_hours: f64,
    /// Logical tracking day override (YYYY-MM-DD). None follows the clock.
    pub pinned_day: Option<String>,
    /// Play a chime when a countdown completes on its own.
    pub completion_sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_session_ms: 1000,
            endpoint_url: "http://127.0.0.1:8000/api/save-time".into(),
            send_timeout_secs: 30,
            retry_interval_secs: 60,
            total_day_hours: 9.0,
            pinned_day: None,
            completion_sound: true,
        }
    }
}

impl Settings {
    /// The day new sessions are attributed to: the pinned day if one is set,
    /// otherwise today (UTC).
    pub fn tracking_day(&self) -> String {
        self.pinned_day
            .clone()
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> Settings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn set_pinned_day(&self, day: Option<String>) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.pinned_day = day;
        self.persist(&guard)
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn pinned_day_overrides_clock() {
        let settings = Settings {
            pinned_day: Some("2025-10-14".into()),
            ..Settings::default()
        };
        assert_eq!(settings.tracking_day(), "2025-10-14");
    }

    #[test]
    fn unpinned_day_is_a_valid_date() {
        let day = Settings::default().tracking_day();
        NaiveDate::parse_from_str(&day, "%Y-%m-%d").unwrap();
    }

    #[test]
    fn store_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store.set_pinned_day(Some("2025-10-14".into())).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.current().pinned_day.as_deref(), Some("2025-10-14"));
        assert_eq!(reloaded.current().min_session_ms, 1000);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.current().send_timeout_secs, 30);
    }
}

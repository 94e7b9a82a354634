use std::sync::Arc;

use log::{debug, error, info};

use crate::{
    audio::ChimeHandle,
    mirror::LocalMirror,
    models::SessionRecord,
    plan::PlanStore,
    settings::SettingsStore,
    sync::{DeliveryOutcome, SyncCoordinator},
};

/// Why a finished run did or did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Below the minimum-duration threshold; nothing stored, nothing queued.
    Discarded,
    /// Accepted: the mirror was updated and the record routed for delivery.
    Accepted(DeliveryOutcome),
}

/// Finalizes a contiguous timed run into a `SessionRecord` and routes it.
///
/// The mirror update is optimistic and happens before any delivery attempt,
/// so the user's tracking view never waits on the network.
pub struct SessionRecorder {
    mirror: Arc<LocalMirror>,
    plans: Arc<PlanStore>,
    coordinator: Arc<SyncCoordinator>,
    settings: Arc<SettingsStore>,
    chime: ChimeHandle,
}

impl SessionRecorder {
    pub fn new(
        mirror: Arc<LocalMirror>,
        plans: Arc<PlanStore>,
        coordinator: Arc<SyncCoordinator>,
        settings: Arc<SettingsStore>,
        chime: ChimeHandle,
    ) -> Self {
        Self {
            mirror,
            plans,
            coordinator,
            settings,
            chime,
        }
    }

    /// Finalize one contiguous run. `completed` is true only when a
    /// countdown ran to zero on its own; manual stops pass false.
    pub async fn finish_session(
        &self,
        category: &str,
        duration_ms: u64,
        completed: bool,
    ) -> RecordOutcome {
        let settings = self.settings.current();

        if duration_ms < settings.min_session_ms {
            debug!(
                "Session for '{category}' lasted {duration_ms}ms, below the {}ms threshold; dropped",
                settings.min_session_ms
            );
            return RecordOutcome::Discarded;
        }

        let day = settings.tracking_day();
        let target_hours = self.plans.target_for(&day, category).unwrap_or(0.0);

        match self.mirror.record_session(category, &day, duration_ms) {
            Ok(total) => {
                info!("Recorded {duration_ms}ms for '{category}' on {day} (total {total}ms)")
            }
            // The record still goes out; only the local view is stale.
            Err(err) => error!("Failed to persist time logs: {err:#}"),
        }

        if completed && settings.completion_sound {
            if let Err(err) = self.chime.play() {
                debug!("Completion chime unavailable: {err}");
            }
        }

        let record = SessionRecord {
            category: category.to_string(),
            duration_ms,
            day,
            target_hours,
        };

        RecordOutcome::Accepted(self.coordinator.submit(record).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{NoSyncHost, RemoteSink, SendError};
    use crate::{models::PlannedCategory, settings::Settings};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MemoryRemote {
        accept: bool,
        sent: Mutex<Vec<SessionRecord>>,
    }

    #[async_trait]
    impl RemoteSink for MemoryRemote {
        async fn send(&self, record: &SessionRecord) -> Result<(), SendError> {
            if self.accept {
                self.sent.lock().unwrap().push(record.clone());
                Ok(())
            } else {
                Err(SendError::Rejected(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ))
            }
        }
    }

    fn recorder_with(
        dir: &tempfile::TempDir,
        accept: bool,
    ) -> (SessionRecorder, Arc<MemoryRemote>, Arc<LocalMirror>) {
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        settings
            .update(Settings {
                pinned_day: Some("2025-10-14".into()),
                completion_sound: false,
                ..Settings::default()
            })
            .unwrap();

        let mirror = Arc::new(LocalMirror::new(dir.path().join("time_logs.json")).unwrap());
        let plans = Arc::new(PlanStore::new(dir.path().join("day_plans.json"), 9.0).unwrap());
        plans
            .add_category(
                "2025-10-14",
                PlannedCategory {
                    name: "Project".into(),
                    target_hours: 3.0,
                },
            )
            .unwrap();

        let remote = Arc::new(MemoryRemote {
            accept,
            sent: Mutex::new(Vec::new()),
        });
        let coordinator = Arc::new(SyncCoordinator::new(
            None,
            remote.clone(),
            Arc::new(NoSyncHost),
        ));

        let recorder = SessionRecorder::new(
            mirror.clone(),
            plans,
            coordinator,
            settings,
            ChimeHandle::new(),
        );
        (recorder, remote, mirror)
    }

    #[tokio::test]
    async fn short_sessions_are_dropped_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, remote, mirror) = recorder_with(&dir, true);

        let outcome = recorder.finish_session("Project", 400, false).await;
        assert_eq!(outcome, RecordOutcome::Discarded);
        assert!(mirror.totals_for_day("2025-10-14").is_empty());
        assert!(remote.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn accepted_session_updates_mirror_and_captures_target() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, remote, mirror) = recorder_with(&dir, true);

        let outcome = recorder.finish_session("Project", 5000, false).await;
        assert_eq!(outcome, RecordOutcome::Accepted(DeliveryOutcome::Sent));
        assert_eq!(mirror.totals_for_day("2025-10-14").get("Project"), Some(&5000));

        let sent = remote.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target_hours, 3.0);
        assert_eq!(sent[0].day, "2025-10-14");
    }

    #[tokio::test]
    async fn unplanned_category_defaults_to_zero_target() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, remote, _) = recorder_with(&dir, true);

        recorder.finish_session("Gym", 2000, false).await;
        assert_eq!(remote.sent.lock().unwrap()[0].target_hours, 0.0);
    }

    #[tokio::test]
    async fn mirror_keeps_time_when_delivery_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, _, mirror) = recorder_with(&dir, false);

        let outcome = recorder.finish_session("Project", 8000, false).await;
        assert_eq!(outcome, RecordOutcome::Accepted(DeliveryOutcome::LocalOnly));
        assert_eq!(mirror.totals_for_day("2025-10-14").get("Project"), Some(&8000));
    }
}

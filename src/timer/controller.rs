use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::Utc;
use log::info;
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time, time::Instant};
use uuid::Uuid;

use crate::recorder::{RecordOutcome, SessionRecorder};

use super::{TimerMode, TimerState, TimerStatus};

#[derive(Debug, Serialize, Clone)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub remaining_ms: i64,
}

/// Drives the timer state machine and hands finished runs to the recorder.
///
/// Countdown runs are watched by a periodic tick task that detects natural
/// completion; stopwatch runs have no deadline and need no ticker.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    recorder: Arc<SessionRecorder>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(recorder: Arc<SessionRecorder>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            recorder,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub async fn get_state(&self) -> TimerState {
        let mut guard = self.state.lock().await;
        guard.sync_elapsed_from_anchor();
        guard.clone()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let mut guard = self.state.lock().await;
        guard.sync_elapsed_from_anchor();
        TimerSnapshot {
            remaining_ms: guard.remaining_ms(),
            state: guard.clone(),
        }
    }

    /// Begin a new contiguous run. A run already in progress (e.g. the user
    /// switched category) is finalized and recorded first.
    pub async fn start(
        &self,
        category: &str,
        mode: TimerMode,
        target_ms: u64,
    ) -> Result<TimerState> {
        if mode == TimerMode::Countdown && target_ms == 0 {
            bail!("target_ms must be greater than zero for countdown mode");
        }
        if category.trim().is_empty() {
            bail!("category cannot be empty");
        }

        let previous = {
            let mut state = self.state.lock().await;
            state.take_run()
        };
        self.cancel_ticker().await;
        if let Some((prev_category, elapsed)) = previous {
            self.recorder
                .finish_session(&prev_category, elapsed, false)
                .await;
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!("Started {mode:?} session {session_id} for '{category}'");

        {
            let mut state = self.state.lock().await;
            state.begin_run(
                session_id,
                category.to_string(),
                mode,
                target_ms,
                started_at,
                Instant::now(),
            );
        }

        if mode == TimerMode::Countdown {
            self.spawn_ticker().await;
        }

        Ok(self.get_state().await)
    }

    /// Finalize the current run and hold in Paused. This is also the
    /// page-hide path: the session is recorded, and a later start opens a
    /// fresh run.
    pub async fn pause(&self) -> Result<RecordOutcome> {
        let (category, elapsed) = {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Running {
                bail!("no running timer to pause");
            }
            state.pause();
            let category = state
                .category
                .clone()
                .unwrap_or_default();
            (category, state.elapsed_ms)
        };
        self.cancel_ticker().await;

        Ok(self.recorder.finish_session(&category, elapsed, false).await)
    }

    /// Finalize and return to Idle. Returns None when nothing was running
    /// (a paused or completed run was already recorded).
    pub async fn stop(&self) -> Option<RecordOutcome> {
        let run = {
            let mut state = self.state.lock().await;
            state.take_run()
        };
        self.cancel_ticker().await;

        match run {
            Some((category, elapsed)) => {
                Some(self.recorder.finish_session(&category, elapsed, false).await)
            }
            None => None,
        }
    }

    /// Discard the current run without recording anything.
    pub async fn reset(&self) {
        {
            let mut state = self.state.lock().await;
            *state = TimerState::default();
        }
        self.cancel_ticker().await;
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let recorder = self.recorder.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                interval.tick().await;

                let finished = {
                    let mut guard = state.lock().await;
                    if guard.status != TimerStatus::Running {
                        break;
                    }
                    guard.sync_elapsed_from_anchor();
                    if guard.mode == TimerMode::Countdown && guard.remaining_ms() <= 0 {
                        guard.complete();
                        guard
                            .category
                            .clone()
                            .map(|category| (category, guard.elapsed_ms))
                    } else {
                        None
                    }
                };

                if let Some((category, elapsed)) = finished {
                    recorder.finish_session(&category, elapsed, true).await;
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

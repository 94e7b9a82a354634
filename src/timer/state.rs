use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    Countdown,
    Stopwatch,
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::Countdown
    }
}

/// One contiguous timed run against a single category.
///
/// A run is never resumed: pausing or stopping finalizes it, and starting
/// again opens a fresh run with its own elapsed time. `run_anchor` uses the
/// tokio clock so tick-driven tests can pause and advance time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub mode: TimerMode,
    pub session_id: Option<String>,
    pub category: Option<String>,
    pub target_ms: u64,
    pub elapsed_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub run_anchor: Option<Instant>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            mode: TimerMode::Countdown,
            session_id: None,
            category: None,
            target_ms: 0,
            elapsed_ms: 0,
            started_at: None,
            run_anchor: None,
        }
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Countdown: milliseconds left, clamped at zero. Stopwatch: elapsed.
    pub fn remaining_ms(&self) -> i64 {
        match (self.status, self.mode) {
            (TimerStatus::Idle, _) => 0,
            (_, TimerMode::Countdown) => {
                let remaining = self.target_ms as i64 - self.current_elapsed_ms() as i64;
                cmp::max(remaining, 0)
            }
            (_, TimerMode::Stopwatch) => self.current_elapsed_ms() as i64,
        }
    }

    pub fn current_elapsed_ms(&self) -> u64 {
        if let (TimerStatus::Running, Some(anchor)) = (self.status, self.run_anchor) {
            anchor.elapsed().as_millis() as u64
        } else {
            self.elapsed_ms
        }
    }

    pub fn sync_elapsed_from_anchor(&mut self) {
        if let (TimerStatus::Running, Some(anchor)) = (self.status, self.run_anchor) {
            self.elapsed_ms = anchor.elapsed().as_millis() as u64;
        }
    }

    pub fn begin_run(
        &mut self,
        session_id: String,
        category: String,
        mode: TimerMode,
        target_ms: u64,
        started_at: DateTime<Utc>,
        now: Instant,
    ) {
        *self = Self {
            status: TimerStatus::Running,
            mode,
            session_id: Some(session_id),
            category: Some(category),
            target_ms,
            elapsed_ms: 0,
            started_at: Some(started_at),
            run_anchor: Some(now),
        };
    }

    /// Freeze the run for recording; the session itself is finished.
    pub fn pause(&mut self) {
        self.sync_elapsed_from_anchor();
        self.status = TimerStatus::Paused;
        self.run_anchor = None;
    }

    /// Natural countdown completion: elapsed is clamped to the target.
    pub fn complete(&mut self) {
        self.sync_elapsed_from_anchor();
        self.elapsed_ms = self.elapsed_ms.min(self.target_ms);
        self.status = TimerStatus::Completed;
        self.run_anchor = None;
    }

    /// If a run is in progress, capture its category and elapsed time for
    /// the recorder; either way the state returns to Idle.
    pub fn take_run(&mut self) -> Option<(String, u64)> {
        let run = if self.status == TimerStatus::Running {
            self.sync_elapsed_from_anchor();
            self.category.clone().map(|cat| (cat, self.elapsed_ms))
        } else {
            None
        };
        *self = Self::default();
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(mode: TimerMode, target_ms: u64) -> TimerState {
        let mut state = TimerState::new();
        state.begin_run(
            "s1".into(),
            "Project".into(),
            mode,
            target_ms,
            Utc::now(),
            Instant::now(),
        );
        state
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_remaining_counts_down_and_clamps() {
        let state = running(TimerMode::Countdown, 2000);
        assert_eq!(state.remaining_ms(), 2000);

        tokio::time::advance(std::time::Duration::from_millis(1500)).await;
        assert_eq!(state.remaining_ms(), 500);

        tokio::time::advance(std::time::Duration::from_millis(1500)).await;
        assert_eq!(state.remaining_ms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stopwatch_remaining_is_elapsed() {
        let state = running(TimerMode::Stopwatch, 0);
        tokio::time::advance(std::time::Duration::from_millis(3200)).await;
        assert_eq!(state.remaining_ms(), 3200);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_elapsed() {
        let mut state = running(TimerMode::Stopwatch, 0);
        tokio::time::advance(std::time::Duration::from_millis(900)).await;
        state.pause();

        tokio::time::advance(std::time::Duration::from_secs(10)).await;
        assert_eq!(state.status, TimerStatus::Paused);
        assert_eq!(state.current_elapsed_ms(), 900);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_clamps_elapsed_to_target() {
        let mut state = running(TimerMode::Countdown, 2000);
        tokio::time::advance(std::time::Duration::from_millis(2600)).await;
        state.complete();

        assert_eq!(state.status, TimerStatus::Completed);
        assert_eq!(state.elapsed_ms, 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn take_run_captures_only_running_state() {
        let mut state = running(TimerMode::Stopwatch, 0);
        tokio::time::advance(std::time::Duration::from_millis(1200)).await;

        let run = state.take_run();
        assert_eq!(run, Some(("Project".into(), 1200)));
        assert_eq!(state.status, TimerStatus::Idle);

        assert_eq!(state.take_run(), None);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimingStatus {
    #[default]
    Idle,
    Tracking,
    Paused,
    /// Transient: the session has been finalised and is being handed off
    /// for persistence. The engine returns to `Idle` straight after.
    Completed,
}

impl TimingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingStatus::Idle => "Idle",
            TimingStatus::Tracking => "Tracking",
            TimingStatus::Paused => "Paused",
            TimingStatus::Completed => "Completed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TimingStatus::Tracking | TimingStatus::Paused)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimingState {
    pub status: TimingStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub active_ms: u64,
    /// Active time banked from earlier tracking windows; combines with
    /// `running_since` to give the live value.
    #[serde(skip)]
    pub active_ms_baseline: u64,
    #[serde(skip)]
    pub running_since: Option<DateTime<Utc>>,
}

impl TimingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_active_ms(&self, now: DateTime<Utc>) -> u64 {
        match (self.status, self.running_since) {
            (TimingStatus::Tracking, Some(anchor)) => self
                .active_ms_baseline
                .saturating_add(elapsed_ms(anchor, now)),
            _ => self.active_ms,
        }
    }

    pub fn sync_active_from_anchor(&mut self, now: DateTime<Utc>) {
        if let (TimingStatus::Tracking, Some(anchor)) = (self.status, self.running_since) {
            self.active_ms = self.active_ms_baseline.saturating_add(elapsed_ms(anchor, now));
        }
    }

    pub fn begin_session(&mut self, session_id: String, start_at: DateTime<Utc>) {
        *self = Self {
            status: TimingStatus::Tracking,
            session_id: Some(session_id),
            started_at: Some(start_at),
            active_ms: 0,
            active_ms_baseline: 0,
            running_since: Some(start_at),
        };
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.sync_active_from_anchor(now);
        self.status = TimingStatus::Paused;
        self.running_since = None;
        self.active_ms_baseline = self.active_ms;
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        self.status = TimingStatus::Tracking;
        self.active_ms_baseline = self.active_ms;
        self.running_since = Some(now);
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.sync_active_from_anchor(now);
        self.status = TimingStatus::Completed;
        self.running_since = None;
        self.active_ms_baseline = self.active_ms;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

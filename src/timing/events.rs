use log::trace;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{Lap, SessionSummary};

use super::TimingSnapshot;

/// Everything the controller tells the outside world.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum TimingEvent {
    StateChanged(TimingSnapshot),
    Tick(TimingSnapshot),
    LapCompleted(Lap),
    SessionSaved(SessionSummary),
}

impl TimingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TimingEvent::StateChanged(_) => "timing-state-changed",
            TimingEvent::Tick(_) => "timing-tick",
            TimingEvent::LapCompleted(_) => "lap-completed",
            TimingEvent::SessionSaved(_) => "session-saved",
        }
    }

    /// Broadcasts to every subscriber. Having none is normal for a headless
    /// run and only traced.
    pub fn emit(self, events: &broadcast::Sender<TimingEvent>) {
        let name = self.name();
        match events.send(self) {
            Ok(receivers) => trace!("{name} sent to {receivers} subscribers"),
            Err(_) => trace!("{name} dropped, no subscribers"),
        }
    }
}

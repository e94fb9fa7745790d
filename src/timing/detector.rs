//! Start/finish crossing detection and lap rollover.
//!
//! Detection is edge-triggered: a lap closes when the rider *enters* the
//! tolerance circle around the course reference, not on every fix while
//! inside it. Lap 1 is never closed automatically because a session starts
//! on the line; the first entry would otherwise produce a zero-length lap.

use chrono::{DateTime, Utc};

use crate::geo::Coordinate;
use crate::models::{Lap, Session};

use super::TrackRecorder;

/// First lap number eligible for automatic completion.
pub const FIRST_AUTO_LAP: u32 = 2;

#[derive(Debug, Clone, Default)]
pub struct LapDetector {
    was_near: bool,
}

impl LapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the latest "near start line" flag. Returns `true` when the
    /// current lap should be closed.
    pub fn observe(&mut self, near: bool, current_lap: u32) -> bool {
        let rising_edge = near && !self.was_near;
        self.was_near = near;
        rising_edge && current_lap >= FIRST_AUTO_LAP
    }

    pub fn reset(&mut self) {
        self.was_near = false;
    }

    /// Closes the open lap of `session` and opens the next one.
    ///
    /// The closed lap takes `now` as its end time, the recorder's last fix as
    /// its end coordinate and the recorder's per-lap speed readings as its
    /// final average. The new lap starts at `start_coordinate` (the course
    /// reference) with zeroed counters. Returns the closed lap, or `None` if
    /// the session had no open lap.
    pub fn roll_over(
        &self,
        session: &mut Session,
        recorder: &mut TrackRecorder,
        now: DateTime<Utc>,
        start_coordinate: Option<Coordinate>,
    ) -> Option<Lap> {
        let lap = session.laps.last_mut().filter(|lap| !lap.is_completed())?;
        lap.end_time = Some(now);
        lap.end_coordinate = recorder.last_position();
        lap.average_speed_mps = recorder.lap_average_speed_mps();
        let closed = lap.clone();

        recorder.reset_lap();
        session
            .laps
            .push(Lap::open(closed.number + 1, now, start_coordinate));

        Some(closed)
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// One timed segment of a session. A lap without `end_time` is still open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub number: u32,
    pub start_time: DateTime<Utc>,
    /// Absent only for a course-less session before its first fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_coordinate: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_coordinate: Option<Coordinate>,
    pub distance_m: f64,
    pub max_speed_mps: f64,
    pub average_speed_mps: f64,
}

impl Lap {
    pub fn open(number: u32, start_time: DateTime<Utc>, start_coordinate: Option<Coordinate>) -> Self {
        Self {
            number,
            start_time,
            start_coordinate,
            end_time: None,
            end_coordinate: None,
            distance_m: 0.0,
            max_speed_mps: 0.0,
            average_speed_mps: 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }

    /// `end - start` for a completed lap; `None` while the lap is open.
    pub fn lap_time(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Time since the lap started, for live display.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.lap_time().unwrap_or_else(|| now - self.start_time)
    }
}

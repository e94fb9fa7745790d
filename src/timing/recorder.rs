//! Running totals for the active session: distance, speed and proximity to
//! the course's start/finish reference.

use chrono::{DateTime, Utc};
use log::debug;

use crate::geo::{haversine_m, Coordinate, GpsSample};
use crate::models::{Course, Session};

/// Accumulates fixes into a [`Session`].
///
/// The recorder does not check the timing status; the engine only hands it
/// samples while tracking.
#[derive(Debug, Clone, Default)]
pub struct TrackRecorder {
    course: Option<Course>,
    last_timestamp: Option<DateTime<Utc>>,
    last_position: Option<Coordinate>,
    /// Where the next distance leg starts. Cleared on resume so the gap
    /// across a pause is never counted.
    leg_start: Option<Coordinate>,
    current_speed_mps: f64,
    lap_speed_sum: f64,
    lap_speed_count: u32,
    distance_to_reference_m: Option<f64>,
    near_start_line: bool,
}

impl TrackRecorder {
    pub fn new(course: Option<&Course>) -> Self {
        Self {
            course: course.cloned(),
            ..Self::default()
        }
    }

    /// Applies one fix. Returns `false` when the fix is older than the last
    /// recorded one and was dropped to keep the track time-ordered.
    pub fn record(&mut self, sample: GpsSample, session: &mut Session) -> bool {
        if let Some(last) = self.last_timestamp {
            if sample.timestamp < last {
                debug!("dropping out-of-order fix {} (last {last})", sample.timestamp);
                return false;
            }
        }

        if let Some(from) = &self.leg_start {
            let leg_m = haversine_m(from, &sample.coordinate);
            session.total_distance_m += leg_m;
            if let Some(lap) = open_lap(session) {
                lap.distance_m += leg_m;
            }
        }

        if let Some(speed) = sample.valid_speed() {
            self.current_speed_mps = speed;
            self.lap_speed_sum += speed;
            self.lap_speed_count += 1;
            let average = self.lap_average_speed_mps();
            if let Some(lap) = open_lap(session) {
                lap.max_speed_mps = lap.max_speed_mps.max(speed);
                lap.average_speed_mps = average;
            }
        }

        if let Some(lap) = open_lap(session) {
            if lap.start_coordinate.is_none() {
                lap.start_coordinate = Some(sample.coordinate);
            }
        }

        self.distance_to_reference_m = self
            .course
            .as_ref()
            .map(|c| c.distance_to_reference_m(&sample.coordinate));
        self.near_start_line = self
            .course
            .as_ref()
            .is_some_and(|c| c.contains(&sample.coordinate));

        self.last_timestamp = Some(sample.timestamp);
        self.last_position = Some(sample.coordinate);
        self.leg_start = Some(sample.coordinate);
        session.track.push(sample);
        true
    }

    /// Forgets where the last leg ended. The first fix after a resume starts
    /// a fresh leg; the timestamp guard and the last position are kept.
    pub fn break_leg(&mut self) {
        self.leg_start = None;
    }

    /// Clears the per-lap speed readings at a lap boundary. Current speed
    /// and the previous fix carry over into the next lap.
    pub fn reset_lap(&mut self) {
        self.lap_speed_sum = 0.0;
        self.lap_speed_count = 0;
    }

    /// Mean of the valid speed readings in the current lap, zero if none.
    pub fn lap_average_speed_mps(&self) -> f64 {
        if self.lap_speed_count == 0 {
            0.0
        } else {
            self.lap_speed_sum / self.lap_speed_count as f64
        }
    }

    pub fn current_speed_mps(&self) -> f64 {
        self.current_speed_mps
    }

    pub fn distance_to_reference_m(&self) -> Option<f64> {
        self.distance_to_reference_m
    }

    pub fn near_start_line(&self) -> bool {
        self.near_start_line
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.last_position
    }
}

fn open_lap(session: &mut Session) -> Option<&mut crate::models::Lap> {
    session.laps.last_mut().filter(|lap| !lap.is_completed())
}

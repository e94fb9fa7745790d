//! Session records: one continuous timing run with its laps and GPS track.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::{Coordinate, GpsSample};

use super::{Course, CourseRef, Lap};

/// Host-supplied bike pointer. Never looked up or validated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BikeRef {
    pub id: String,
    pub name: String,
}

impl BikeRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseRef>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bike: Option<BikeRef>,
    /// Insertion order is lap order. Only the last lap may be open.
    pub laps: Vec<Lap>,
    pub total_distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_coordinate: Option<Coordinate>,
    /// Fixes in capture order.
    pub track: Vec<GpsSample>,
}

impl Session {
    pub fn begin(course: Option<&Course>, bike: Option<BikeRef>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            course: course.map(CourseRef::from),
            started_at,
            ended_at: None,
            bike,
            laps: Vec::new(),
            total_distance_m: 0.0,
            start_coordinate: course.map(|c| c.reference),
            track: Vec::new(),
        }
    }

    pub fn course_id(&self) -> Option<&str> {
        self.course.as_ref().map(|c| c.id.as_str())
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// `ended_at` (or `now` while running) minus `started_at`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.unwrap_or(now) - self.started_at
    }

    pub fn lap_count(&self) -> usize {
        self.laps.len()
    }

    pub fn current_lap(&self) -> Option<&Lap> {
        self.laps.last().filter(|lap| !lap.is_completed())
    }

    pub fn completed_laps(&self) -> impl Iterator<Item = &Lap> {
        self.laps.iter().filter(|lap| lap.is_completed())
    }

    pub fn best_lap(&self) -> Option<&Lap> {
        self.laps
            .iter()
            .filter_map(|lap| lap.lap_time().map(|time| (time, lap)))
            .min_by_key(|(time, _)| *time)
            .map(|(_, lap)| lap)
    }

    pub fn best_lap_time(&self) -> Option<Duration> {
        self.best_lap().and_then(Lap::lap_time)
    }

    pub fn average_lap_time(&self) -> Option<Duration> {
        let times: Vec<i64> = self
            .completed_laps()
            .filter_map(|lap| lap.lap_time())
            .map(|t| t.num_milliseconds())
            .collect();
        if times.is_empty() {
            return None;
        }
        let sum: i64 = times.iter().sum();
        Some(Duration::milliseconds(sum / times.len() as i64))
    }
}

/// Compact view of a finished session for event payloads and listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub course_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub lap_count: usize,
    pub best_lap_ms: Option<i64>,
    pub average_lap_ms: Option<i64>,
    pub total_distance_m: f64,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            course_name: session.course.as_ref().map(|c| c.name.clone()),
            started_at: session.started_at,
            ended_at: session.ended_at,
            lap_count: session.lap_count(),
            best_lap_ms: session.best_lap_time().map(|d| d.num_milliseconds()),
            average_lap_ms: session.average_lap_time().map(|d| d.num_milliseconds()),
            total_distance_m: session.total_distance_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(number: u32, start: DateTime<Utc>, secs: Option<i64>) -> Lap {
        let mut lap = Lap::open(number, start, None);
        lap.end_time = secs.map(|s| start + Duration::seconds(s));
        lap
    }

    #[test]
    fn derived_lap_times_skip_open_laps() {
        let t0 = Utc::now();
        let mut session = Session::begin(None, None, t0);
        session.laps = vec![
            lap(1, t0, Some(70)),
            lap(2, t0 + Duration::seconds(70), Some(64)),
            lap(3, t0 + Duration::seconds(134), None),
        ];

        assert_eq!(session.lap_count(), 3);
        assert_eq!(session.best_lap_time(), Some(Duration::seconds(64)));
        assert_eq!(session.average_lap_time(), Some(Duration::seconds(67)));
        assert_eq!(session.current_lap().map(|l| l.number), Some(3));
    }

    #[test]
    fn no_completed_laps_means_no_best() {
        let t0 = Utc::now();
        let mut session = Session::begin(None, None, t0);
        assert_eq!(session.best_lap_time(), None);
        assert_eq!(session.average_lap_time(), None);

        session.laps.push(lap(1, t0, None));
        assert_eq!(session.best_lap_time(), None);
    }

    #[test]
    fn duration_uses_now_while_running() {
        let t0 = Utc::now();
        let mut session = Session::begin(None, None, t0);
        assert_eq!(session.duration(t0 + Duration::seconds(30)), Duration::seconds(30));

        session.ended_at = Some(t0 + Duration::seconds(10));
        assert_eq!(session.duration(t0 + Duration::seconds(30)), Duration::seconds(10));
    }

    #[test]
    fn begin_copies_course_reference() {
        let course = Course::new_custom("Home", Coordinate::new(35.0, 135.0), 50.0, None, Utc::now());
        let session = Session::begin(Some(&course), Some(BikeRef::new("b1", "CBR600RR")), Utc::now());
        assert_eq!(session.course_id(), Some(course.id.as_str()));
        assert_eq!(session.start_coordinate, Some(course.reference));
        assert_eq!(session.bike.as_ref().map(|b| b.name.as_str()), Some("CBR600RR"));
    }
}

//! Single-owner session state machine.
//!
//! `Idle -> Tracking -> {Paused <-> Tracking} -> Idle`. Calls that do not
//! fit the current state are no-ops: they return `false`/`None` and leave
//! everything untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::GpsSample;
use crate::models::{BikeRef, Course, Lap, Session};

use super::{LapDetector, TimingState, TimingStatus, TrackRecorder};

/// What happened to a fix handed to [`TimingEngine::record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Not tracking, or the fix was out of order.
    Dropped,
    Recorded,
    /// The fix crossed the start/finish line and closed this lap.
    LapCompleted(Lap),
}

/// Live values for display. Produced on every tick and state change.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimingSnapshot {
    pub status: TimingStatus,
    pub session_id: Option<String>,
    pub course_name: Option<String>,
    pub current_lap: u32,
    pub lap_count: usize,
    pub total_distance_m: f64,
    pub lap_distance_m: f64,
    pub current_speed_mps: f64,
    pub lap_max_speed_mps: f64,
    pub distance_to_reference_m: Option<f64>,
    pub near_start_line: bool,
    pub active_ms: u64,
    pub lap_elapsed_ms: u64,
    pub best_lap_ms: Option<i64>,
}

#[derive(Debug, Default)]
pub struct TimingEngine {
    state: TimingState,
    course: Option<Course>,
    session: Option<Session>,
    recorder: TrackRecorder,
    detector: LapDetector,
}

impl TimingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TimingStatus {
        self.state.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn current_lap_number(&self) -> u32 {
        self.session
            .as_ref()
            .and_then(|s| s.laps.last())
            .map(|lap| lap.number)
            .unwrap_or(0)
    }

    /// Begins a session against `course` and opens lap 1. Only valid from
    /// `Idle`.
    pub fn start(&mut self, course: Option<Course>, bike: Option<BikeRef>, now: DateTime<Utc>) -> bool {
        if self.state.status != TimingStatus::Idle {
            return false;
        }

        let mut session = Session::begin(course.as_ref(), bike, now);
        session.laps.push(Lap::open(1, now, session.start_coordinate));

        self.recorder = TrackRecorder::new(course.as_ref());
        self.detector = LapDetector::new();
        self.state.begin_session(session.id.clone(), now);
        self.course = course;
        self.session = Some(session);
        true
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.status != TimingStatus::Tracking {
            return false;
        }
        self.state.pause(now);
        true
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.status != TimingStatus::Paused {
            return false;
        }
        self.state.resume(now);
        self.recorder.break_leg();
        true
    }

    /// Finalises the session and returns it for persistence. An open lap is
    /// handed over as-is, without an end time. Valid from any non-idle state.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Session> {
        if !self.state.status.is_active() {
            return None;
        }

        self.state.complete(now);
        let mut session = self.session.take()?;
        session.ended_at = Some(now);

        self.state.reset();
        self.course = None;
        self.recorder = TrackRecorder::default();
        self.detector.reset();
        Some(session)
    }

    /// Manual lap marker. Works for any lap number, including lap 1.
    pub fn complete_lap(&mut self, now: DateTime<Utc>) -> Option<Lap> {
        if self.state.status != TimingStatus::Tracking {
            return None;
        }
        self.roll_lap(now)
    }

    /// Feeds one fix through the recorder and the detector.
    pub fn record(&mut self, sample: GpsSample, now: DateTime<Utc>) -> RecordOutcome {
        if self.state.status != TimingStatus::Tracking {
            return RecordOutcome::Dropped;
        }
        let Some(session) = self.session.as_mut() else {
            return RecordOutcome::Dropped;
        };
        if !self.recorder.record(sample, session) {
            return RecordOutcome::Dropped;
        }

        let lap_number = self.current_lap_number();
        if self.detector.observe(self.recorder.near_start_line(), lap_number) {
            if let Some(lap) = self.roll_lap(now) {
                return RecordOutcome::LapCompleted(lap);
            }
        }
        RecordOutcome::Recorded
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TimingSnapshot {
        let session = self.session.as_ref();
        let open_lap = session.and_then(Session::current_lap);

        TimingSnapshot {
            status: self.state.status,
            session_id: self.state.session_id.clone(),
            course_name: self.course.as_ref().map(|c| c.name.clone()),
            current_lap: self.current_lap_number(),
            lap_count: session.map(Session::lap_count).unwrap_or(0),
            total_distance_m: session.map(|s| s.total_distance_m).unwrap_or(0.0),
            lap_distance_m: open_lap.map(|l| l.distance_m).unwrap_or(0.0),
            current_speed_mps: self.recorder.current_speed_mps(),
            lap_max_speed_mps: open_lap.map(|l| l.max_speed_mps).unwrap_or(0.0),
            distance_to_reference_m: self.recorder.distance_to_reference_m(),
            near_start_line: self.recorder.near_start_line(),
            active_ms: self.state.current_active_ms(now),
            lap_elapsed_ms: open_lap
                .map(|l| u64::try_from(l.elapsed(now).num_milliseconds()).unwrap_or(0))
                .unwrap_or(0),
            best_lap_ms: session
                .and_then(Session::best_lap_time)
                .map(|d| d.num_milliseconds()),
        }
    }

    fn roll_lap(&mut self, now: DateTime<Utc>) -> Option<Lap> {
        let start_coordinate = self.course.as_ref().map(|c| c.reference);
        let session = self.session.as_mut()?;
        self.detector
            .roll_over(session, &mut self.recorder, now, start_coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use chrono::Duration;

    fn course() -> Course {
        Course::new_custom("Test", Coordinate::new(35.0, 135.0), 50.0, None, Utc::now())
    }

    #[test]
    fn start_only_from_idle() {
        let t0 = Utc::now();
        let mut engine = TimingEngine::new();
        assert!(engine.start(Some(course()), None, t0));
        let id = engine.session().unwrap().id.clone();

        assert!(!engine.start(Some(course()), None, t0));
        assert_eq!(engine.session().unwrap().id, id);
        assert_eq!(engine.current_lap_number(), 1);
    }

    #[test]
    fn invalid_transitions_are_noops() {
        let t0 = Utc::now();
        let mut engine = TimingEngine::new();
        assert!(!engine.pause(t0));
        assert!(!engine.resume(t0));
        assert!(engine.stop(t0).is_none());
        assert!(engine.complete_lap(t0).is_none());
        assert_eq!(engine.status(), TimingStatus::Idle);

        engine.start(None, None, t0);
        assert!(!engine.resume(t0));
        assert!(engine.pause(t0));
        assert!(!engine.pause(t0));
        assert!(engine.complete_lap(t0).is_none());
        assert_eq!(engine.status(), TimingStatus::Paused);
    }

    #[test]
    fn samples_while_paused_are_dropped() {
        let t0 = Utc::now();
        let mut engine = TimingEngine::new();
        engine.start(Some(course()), None, t0);
        engine.record(GpsSample::at(35.0, 135.0, t0, Some(5.0)), t0);
        engine.record(
            GpsSample::at(35.001, 135.0, t0 + Duration::seconds(5), Some(5.0)),
            t0 + Duration::seconds(5),
        );
        let before = engine.session().unwrap().clone();

        engine.pause(t0 + Duration::seconds(6));
        let outcome = engine.record(
            GpsSample::at(35.01, 135.0, t0 + Duration::seconds(7), Some(50.0)),
            t0 + Duration::seconds(7),
        );
        assert_eq!(outcome, RecordOutcome::Dropped);
        engine.resume(t0 + Duration::seconds(8));

        assert_eq!(engine.session().unwrap(), &before);
    }

    #[test]
    fn movement_across_a_pause_is_not_credited() {
        let t0 = Utc::now();
        let mut engine = TimingEngine::new();
        engine.start(Some(course()), None, t0);
        engine.record(GpsSample::at(35.0, 135.0, t0, Some(5.0)), t0);

        engine.pause(t0 + Duration::seconds(1));
        assert!(engine.resume(t0 + Duration::seconds(120)));
        let outcome = engine.record(
            GpsSample::at(35.01, 135.0, t0 + Duration::seconds(121), Some(5.0)),
            t0 + Duration::seconds(121),
        );
        assert_eq!(outcome, RecordOutcome::Recorded);

        let session = engine.session().unwrap();
        assert_eq!(session.total_distance_m, 0.0);
        assert_eq!(session.laps[0].distance_m, 0.0);
        assert_eq!(session.track.len(), 2);
    }

    #[test]
    fn stop_resets_to_idle() {
        let t0 = Utc::now();
        let mut engine = TimingEngine::new();
        engine.start(Some(course()), Some(BikeRef::new("b", "Ninja")), t0);
        let session = engine.stop(t0 + Duration::seconds(90)).unwrap();

        assert_eq!(session.ended_at, Some(t0 + Duration::seconds(90)));
        assert_eq!(session.laps.len(), 1);
        assert!(!session.laps[0].is_completed());
        assert_eq!(engine.status(), TimingStatus::Idle);
        assert!(engine.session().is_none());

        let snap = engine.snapshot(t0);
        assert_eq!(snap.current_lap, 0);
        assert_eq!(snap.total_distance_m, 0.0);
    }

    #[test]
    fn stop_from_paused() {
        let t0 = Utc::now();
        let mut engine = TimingEngine::new();
        engine.start(None, None, t0);
        engine.pause(t0);
        assert!(engine.stop(t0 + Duration::seconds(1)).is_some());
        assert_eq!(engine.status(), TimingStatus::Idle);
    }

    #[test]
    fn snapshot_reflects_open_lap() {
        let t0 = Utc::now();
        let mut engine = TimingEngine::new();
        engine.start(Some(course()), None, t0);
        engine.record(GpsSample::at(35.0, 135.0, t0, Some(8.0)), t0);
        engine.record(
            GpsSample::at(35.001, 135.0, t0 + Duration::seconds(10), Some(11.0)),
            t0 + Duration::seconds(10),
        );

        let snap = engine.snapshot(t0 + Duration::seconds(12));
        assert_eq!(snap.status, TimingStatus::Tracking);
        assert_eq!(snap.current_lap, 1);
        assert_eq!(snap.current_speed_mps, 11.0);
        assert_eq!(snap.lap_max_speed_mps, 11.0);
        assert!(!snap.near_start_line);
        assert_eq!(snap.active_ms, 12_000);
        assert_eq!(snap.lap_elapsed_ms, 12_000);
        assert!((snap.total_distance_m - snap.lap_distance_m).abs() < 1e-9);
        assert_eq!(snap.best_lap_ms, None);
    }
}

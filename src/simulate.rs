//! Synthetic ride around a course: a circle through the start/finish point,
//! sampled at a fixed rate on a virtual clock and fed straight into the
//! timing engine.

use std::f64::consts::TAU;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lapkeeper_lib::geo::{Coordinate, GpsSample};
use lapkeeper_lib::models::{BikeRef, Course, Session};
use lapkeeper_lib::timing::{RecordOutcome, TimingEngine};

const METRES_PER_DEGREE: f64 = 111_320.0;
const DEFAULT_LAP_LENGTH_M: f64 = 1_500.0;

/// Per-lap speed variation, as a fraction of the requested speed.
const SPEED_SPREAD: f64 = 0.04;

/// Largest jitter change between two fixes, as a fraction of the distance
/// ridden between them. Keeps the reported track moving steadily through
/// the crossing radius at any sample rate.
const JITTER_DRIFT_PER_STEP: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct RideParams {
    pub laps: u32,
    pub speed_kmh: f64,
    pub noise_m: f64,
    pub hz: u32,
    pub seed: Option<u64>,
    pub bike: Option<String>,
}

/// Rides `params.laps` laps of `course` and returns the finished session.
///
/// Lap 1 is closed by a manual marker at the line, the way a rider taps the
/// button after the out-lap; every later lap closes on its own when the
/// track re-enters the crossing radius.
pub fn ride(course: &Course, params: &RideParams, started_at: DateTime<Utc>) -> Result<Session> {
    if !params.speed_kmh.is_finite() || params.speed_kmh <= 0.0 {
        bail!("speed must be positive, got {} km/h", params.speed_kmh);
    }
    if !params.noise_m.is_finite() || params.noise_m < 0.0 {
        bail!("noise must be zero or more metres, got {}", params.noise_m);
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let lap_length_m = course
        .expected_lap_distance_m
        .unwrap_or(DEFAULT_LAP_LENGTH_M);
    let radius_m = lap_length_m / TAU;
    let step = Duration::milliseconds(1000 / i64::from(params.hz.max(1)));
    let step_s = step.num_milliseconds() as f64 / 1000.0;
    let bike = params
        .bike
        .as_ref()
        .map(|name| BikeRef::new(name.to_lowercase().replace(' ', "-"), name.clone()));

    let mut engine = TimingEngine::new();
    engine.start(Some(course.clone()), bike, started_at);

    let mut now = started_at;
    let mut angle = 0.0_f64;
    let mut lap_speed_mps = lap_speed(&mut rng, params.speed_kmh);
    let mut completed = 0_u32;
    let slowest_step_m = params.speed_kmh / 3.6 * (1.0 - SPEED_SPREAD) * step_s;
    let mut jitter = Jitter::new(params.noise_m, slowest_step_m * JITTER_DRIFT_PER_STEP);
    // Safety net for a course whose tolerance swallows the whole circle.
    let max_steps = (f64::from(params.laps + 1) * lap_length_m / (lap_speed_mps * step_s) * 2.0) as u64;

    for _ in 0..max_steps {
        if completed >= params.laps {
            break;
        }

        now += step;
        let previous_angle = angle;
        angle += lap_speed_mps * step_s / radius_m;

        let offset = jitter.next(&mut rng);
        let position = position_on_circle(&course.reference, radius_m, angle, offset);
        let speed = lap_speed_mps * (1.0 + rng.gen_range(-0.02..=0.02));
        let sample = GpsSample::new(position, now, None, Some(speed), params.noise_m.max(1.0));

        if let RecordOutcome::LapCompleted(lap) = engine.record(sample, now) {
            debug!("lap {} closed automatically", lap.number);
            completed += 1;
            lap_speed_mps = lap_speed(&mut rng, params.speed_kmh);
        }

        let crossed_line = (previous_angle / TAU).floor() < (angle / TAU).floor();
        if crossed_line && engine.current_lap_number() == 1 {
            if let Some(lap) = engine.complete_lap(now) {
                debug!("lap {} closed by marker", lap.number);
                completed += 1;
                lap_speed_mps = lap_speed(&mut rng, params.speed_kmh);
            }
        }
    }

    if completed < params.laps {
        info!(
            "Stopped after {completed} of {} laps; course radius may be too small",
            params.laps
        );
    }

    match engine.stop(now) {
        Some(session) => Ok(session),
        None => bail!("simulation did not produce a session"),
    }
}

fn lap_speed<R: Rng>(rng: &mut R, speed_kmh: f64) -> f64 {
    speed_kmh / 3.6 * (1.0 + rng.gen_range(-SPEED_SPREAD..=SPEED_SPREAD))
}

/// GPS error as a bounded random walk: each axis wanders by at most `drift`
/// metres per fix and never leaves `[-bound, bound]`.
#[derive(Debug, Clone, Copy)]
struct Jitter {
    east_m: f64,
    north_m: f64,
    bound: f64,
    drift: f64,
}

impl Jitter {
    fn new(bound: f64, drift: f64) -> Self {
        Self {
            east_m: 0.0,
            north_m: 0.0,
            bound,
            drift: drift.min(bound),
        }
    }

    fn next<R: Rng>(&mut self, rng: &mut R) -> (f64, f64) {
        if self.bound > 0.0 && self.drift > 0.0 {
            let step_east = rng.gen_range(-self.drift..=self.drift);
            let step_north = rng.gen_range(-self.drift..=self.drift);
            self.east_m = (self.east_m + step_east).clamp(-self.bound, self.bound);
            self.north_m = (self.north_m + step_north).clamp(-self.bound, self.bound);
        }
        (self.east_m, self.north_m)
    }
}

/// Point at `angle` radians along a circle whose southernmost point is
/// `reference`, shifted by `(east, north)` metres.
fn position_on_circle(
    reference: &Coordinate,
    radius_m: f64,
    angle: f64,
    (jitter_east, jitter_north): (f64, f64),
) -> Coordinate {
    let east_m = radius_m * angle.sin() + jitter_east;
    let north_m = radius_m * (1.0 - angle.cos()) + jitter_north;

    let lat = reference.latitude + north_m / METRES_PER_DEGREE;
    let lon = reference.longitude
        + east_m / (METRES_PER_DEGREE * reference.latitude.to_radians().cos());
    Coordinate::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapkeeper_lib::store::repositories::preset_courses;

    fn params(laps: u32) -> RideParams {
        RideParams {
            laps,
            speed_kmh: 100.0,
            noise_m: 1.0,
            hz: 5,
            seed: Some(7),
            bike: Some("Test Bike".into()),
        }
    }

    #[test]
    fn rides_requested_number_of_laps() {
        let course = preset_courses().remove(0);
        let session = ride(&course, &params(3), Utc::now()).unwrap();

        assert_eq!(session.completed_laps().count(), 3);
        assert_eq!(session.laps.len(), 4);
        assert!(session.is_finished());
        assert_eq!(session.bike.as_ref().map(|b| b.id.as_str()), Some("test-bike"));

        let lap_sum: f64 = session.laps.iter().map(|l| l.distance_m).sum();
        assert!((lap_sum - session.total_distance_m).abs() < 1e-6);
    }

    #[test]
    fn same_seed_same_ride() {
        let course = preset_courses().remove(1);
        let t0 = Utc::now();
        let a = ride(&course, &params(2), t0).unwrap();
        let b = ride(&course, &params(2), t0).unwrap();
        assert_eq!(a.track, b.track);
        assert_eq!(a.best_lap_time(), b.best_lap_time());
    }

    #[test]
    fn circle_starts_on_reference() {
        let reference = Coordinate::new(35.0, 135.0);
        let p = position_on_circle(&reference, 300.0, 0.0, (0.0, 0.0));
        assert_eq!(p, reference);
    }

    #[test]
    fn jitter_stays_bounded_and_moves_slowly() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut jitter = Jitter::new(2.0, 0.05);
        let mut previous = (0.0, 0.0);
        for _ in 0..10_000 {
            let (east, north) = jitter.next(&mut rng);
            assert!(east.abs() <= 2.0 && north.abs() <= 2.0);
            assert!((east - previous.0).abs() <= 0.05 + 1e-12);
            assert!((north - previous.1).abs() <= 0.05 + 1e-12);
            previous = (east, north);
        }
    }

    #[test]
    fn high_sample_rate_rides_have_no_short_laps() {
        let course = preset_courses().remove(0);
        let lap_length_m = course.expected_lap_distance_m.unwrap_or(DEFAULT_LAP_LENGTH_M);
        let expected_ms = lap_length_m / (90.0 / 3.6) * 1000.0;

        for seed in 0..8 {
            let params = RideParams {
                laps: 3,
                speed_kmh: 90.0,
                noise_m: 2.0,
                hz: 50,
                seed: Some(seed),
                bike: None,
            };
            let session = ride(&course, &params, Utc::now()).unwrap();
            assert_eq!(session.completed_laps().count(), 3);
            for lap in session.completed_laps() {
                let ms = lap.lap_time().unwrap().num_milliseconds() as f64;
                assert!(
                    ms > expected_ms * 0.8,
                    "seed {seed}: lap {} took {ms} ms, expected about {expected_ms}",
                    lap.number
                );
            }
        }
    }

    #[test]
    fn rejects_bad_speed() {
        let course = preset_courses().remove(0);
        let mut p = params(1);
        p.speed_kmh = 0.0;
        assert!(ride(&course, &p, Utc::now()).is_err());
    }
}

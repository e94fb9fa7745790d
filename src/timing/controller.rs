use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{debug, error, info};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::config::TimingConfig;
use crate::geo::{Coordinate, GeoSampler, GpsSample};
use crate::models::{BikeRef, Course, Lap, Session, SessionSummary};
use crate::store::{CourseRegistry, SessionRepository};

use super::loop_worker::{apply_sample, sample_loop};
use super::{RecordOutcome, TimingEngine, TimingEvent, TimingSnapshot, TimingStatus};

struct SampleTask {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Async front of the timing engine: wires the location source and the
/// display ticker to it, persists finished sessions and broadcasts events.
#[derive(Clone)]
pub struct SessionController {
    engine: Arc<Mutex<TimingEngine>>,
    sampler: Arc<dyn GeoSampler>,
    courses: CourseRegistry,
    sessions: SessionRepository,
    events: broadcast::Sender<TimingEvent>,
    sample_task: Arc<Mutex<Option<SampleTask>>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: TimingConfig,
}

impl SessionController {
    pub fn new(
        sampler: Arc<dyn GeoSampler>,
        courses: CourseRegistry,
        sessions: SessionRepository,
        config: TimingConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            engine: Arc::new(Mutex::new(TimingEngine::new())),
            sampler,
            courses,
            sessions,
            events,
            sample_task: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimingEvent> {
        self.events.subscribe()
    }

    pub async fn get_snapshot(&self) -> TimingSnapshot {
        self.engine.lock().await.snapshot(Utc::now())
    }

    pub async fn status(&self) -> TimingStatus {
        self.engine.lock().await.status()
    }

    /// The in-progress session, if any.
    pub async fn current_session(&self) -> Option<Session> {
        self.engine.lock().await.session().cloned()
    }

    pub async fn start(&self, course: Option<Course>, bike: Option<BikeRef>) -> bool {
        let started = {
            let mut engine = self.engine.lock().await;
            engine.start(course, bike, Utc::now())
        };
        if !started {
            return false;
        }

        self.start_consuming().await;
        self.spawn_ticker().await;
        self.emit_state_changed().await;
        true
    }

    /// Starts against a stored or preset course looked up by id.
    pub async fn start_on(&self, course_id: &str, bike: Option<BikeRef>) -> Result<bool> {
        let course = self
            .courses
            .get(course_id)
            .ok_or_else(|| anyhow!("unknown course {course_id}"))?;
        Ok(self.start(Some(course), bike).await)
    }

    pub async fn pause(&self) -> bool {
        if !self.engine.lock().await.pause(Utc::now()) {
            return false;
        }
        self.stop_consuming().await;
        self.cancel_ticker().await;
        self.emit_state_changed().await;
        true
    }

    pub async fn resume(&self) -> bool {
        if !self.engine.lock().await.resume(Utc::now()) {
            return false;
        }
        self.start_consuming().await;
        self.spawn_ticker().await;
        self.emit_state_changed().await;
        true
    }

    /// Ends the session and saves it. A failed save is logged; the finished
    /// session is returned either way.
    pub async fn stop(&self) -> Option<Session> {
        if !self.engine.lock().await.status().is_active() {
            return None;
        }

        self.stop_consuming().await;
        self.cancel_ticker().await;

        let session = self.engine.lock().await.stop(Utc::now())?;
        info!(
            "Session {} stopped with {} laps",
            session.id,
            session.lap_count()
        );

        let repo = self.sessions.clone();
        let to_save = session.clone();
        match tokio::task::spawn_blocking(move || repo.save(&to_save)).await {
            Ok(Ok(())) => {
                TimingEvent::SessionSaved(SessionSummary::from(&session)).emit(&self.events);
            }
            Ok(Err(err)) => error!("Failed to persist session {}: {err:#}", session.id),
            Err(join_err) => error!("Session persistence task failed: {join_err}"),
        }

        self.emit_state_changed().await;
        Some(session)
    }

    pub async fn complete_lap(&self) -> Option<Lap> {
        let lap = self.engine.lock().await.complete_lap(Utc::now())?;
        info!("Lap {} marked manually", lap.number);
        TimingEvent::LapCompleted(lap.clone()).emit(&self.events);
        Some(lap)
    }

    /// Applies one fix directly, bypassing the sampler.
    pub async fn ingest(&self, sample: GpsSample) -> RecordOutcome {
        apply_sample(&self.engine, &self.events, sample).await
    }

    pub fn create_course(
        &self,
        name: &str,
        reference: Coordinate,
        tolerance_m: f64,
        expected_lap_distance_m: Option<f64>,
    ) -> Result<Course> {
        self.courses
            .create(name, reference, tolerance_m, expected_lap_distance_m, Utc::now())
    }

    pub fn list_courses(&self) -> Vec<Course> {
        self.courses.list()
    }

    pub fn course(&self, id: &str) -> Option<Course> {
        self.courses.get(id)
    }

    pub fn update_course(&self, course: &Course) -> Result<bool> {
        self.courses.update(course)
    }

    pub fn delete_course(&self, id: &str) -> Result<bool> {
        self.courses.delete(id)
    }

    pub fn best_lap_for_course(&self, course_id: &str) -> Option<Lap> {
        self.sessions.best_lap_for_course(course_id)
    }

    pub fn sessions_for_course(&self, course_id: &str) -> Vec<Session> {
        self.sessions.sessions_for_course(course_id)
    }

    pub fn all_sessions(&self) -> Vec<Session> {
        self.sessions.all_sessions()
    }

    pub fn session(&self, id: &str) -> Option<Session> {
        self.sessions.get(id)
    }

    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.sessions.delete(id)
    }

    async fn start_consuming(&self) {
        let mut guard = self.sample_task.lock().await;
        if guard.is_some() {
            return;
        }

        // Subscribe first so no fix published right after start is missed.
        let receiver = self.sampler.subscribe();
        self.sampler.start_updates();

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sample_loop(
            self.engine.clone(),
            receiver,
            self.events.clone(),
            cancel_token.clone(),
        ));
        *guard = Some(SampleTask {
            handle,
            cancel_token,
        });
    }

    async fn stop_consuming(&self) {
        self.sampler.stop_updates();

        let task = self.sample_task.lock().await.take();
        if let Some(task) = task {
            task.cancel_token.cancel();
            if let Err(err) = task.handle.await {
                error!("Sample loop task failed to join: {err}");
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let engine = self.engine.clone();
        let events = self.events.clone();
        let tick_interval = self.config.tick_interval;
        let emit_every = self.config.tick_events_every.max(1);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;

                let snapshot = {
                    let engine = engine.lock().await;
                    if engine.status() != TimingStatus::Tracking {
                        break;
                    }
                    engine.snapshot(Utc::now())
                };

                if ticks % emit_every == 0 {
                    TimingEvent::Tick(snapshot).emit(&events);
                }
                ticks = ticks.wrapping_add(1);
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.get_snapshot().await;
        debug!("Timing state is now {}", snapshot.status.as_str());
        TimingEvent::StateChanged(snapshot).emit(&self.events);
    }
}

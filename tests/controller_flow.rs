use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::time::{sleep, timeout};

use lapkeeper_lib::config::TimingConfig;
use lapkeeper_lib::geo::{Coordinate, GpsSample};
use lapkeeper_lib::store::MemoryStore;
use lapkeeper_lib::timing::{TimingEvent, TimingStatus};
use lapkeeper_lib::AppState;

fn app() -> AppState {
    let config = TimingConfig {
        tick_interval: StdDuration::from_millis(20),
        // Room for every tick of a slow run so no lap event is lagged out.
        event_channel_capacity: 4096,
        ..TimingConfig::default()
    };
    AppState::new(Arc::new(MemoryStore::new()), config)
}

async fn wait_for_fixes(app: &AppState, count: usize) {
    let reached = timeout(StdDuration::from_secs(2), async {
        loop {
            let len = app.timing.current_session().await.map(|s| s.track.len());
            if len == Some(count) {
                break;
            }
            sleep(StdDuration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "sample loop never applied {count} fixes");
}

#[tokio::test]
async fn full_session_over_the_sampler() {
    let app = app();
    let course = app
        .timing
        .create_course("Test loop", Coordinate::new(35.0, 135.0), 50.0, Some(900.0))
        .unwrap();
    let mut events = app.timing.subscribe();

    assert!(app.timing.start(Some(course.clone()), None).await);
    let t0 = Utc::now();
    let fix = |secs: i64, lat: f64| GpsSample::at(lat, 135.0, t0 + Duration::seconds(secs), Some(25.0));

    app.sampler.publish(fix(0, 35.0));
    app.sampler.publish(fix(20, 35.002));
    app.sampler.publish(fix(40, 35.0001));
    wait_for_fixes(&app, 3).await;
    assert_eq!(app.timing.get_snapshot().await.current_lap, 1);

    app.timing.complete_lap().await.unwrap();
    app.sampler.publish(fix(60, 35.002));
    app.sampler.publish(fix(80, 35.0001));
    wait_for_fixes(&app, 5).await;

    let snap = app.timing.get_snapshot().await;
    assert_eq!(snap.status, TimingStatus::Tracking);
    assert_eq!(snap.current_lap, 3);
    assert!(snap.near_start_line);
    assert!(snap.best_lap_ms.is_some());

    let session = app.timing.stop().await.unwrap();
    assert_eq!(session.completed_laps().count(), 2);
    assert!(session.laps[2].end_time.is_none());
    assert!(!app.sampler.is_active());

    let stored = app.sessions.get(&session.id).unwrap();
    assert_eq!(stored.id, session.id);
    assert_eq!(stored.laps.len(), 3);
    assert_eq!(app.timing.sessions_for_course(&course.id).len(), 1);
    assert!(app.timing.best_lap_for_course(&course.id).is_some());

    let mut saw_tick = false;
    let mut saw_saved = false;
    let mut lap_numbers = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            TimingEvent::Tick(_) => saw_tick = true,
            TimingEvent::SessionSaved(summary) => {
                saw_saved = true;
                assert_eq!(summary.id, session.id);
            }
            TimingEvent::LapCompleted(lap) => lap_numbers.push(lap.number),
            TimingEvent::StateChanged(_) => {}
        }
    }
    assert!(saw_tick);
    assert!(saw_saved);
    assert_eq!(lap_numbers, vec![1, 2]);
}

#[tokio::test]
async fn pause_drops_fixes_published_meanwhile() {
    let app = app();
    assert!(app.timing.start(None, None).await);
    let t0 = Utc::now();

    app.sampler.publish(GpsSample::at(35.0, 135.0, t0, Some(10.0)));
    wait_for_fixes(&app, 1).await;

    assert!(app.timing.pause().await);
    assert_eq!(app.timing.status().await, TimingStatus::Paused);
    let published = app
        .sampler
        .publish(GpsSample::at(36.0, 135.0, t0 + Duration::seconds(1), Some(10.0)));
    assert_eq!(published, 0);

    assert!(app.timing.resume().await);
    app.sampler
        .publish(GpsSample::at(35.0, 135.0001, t0 + Duration::seconds(2), Some(10.0)));
    wait_for_fixes(&app, 2).await;

    let session = app.timing.stop().await.unwrap();
    assert_eq!(session.total_distance_m, 0.0);
    assert_eq!(session.track.len(), 2);
}

#[tokio::test]
async fn resuming_far_away_adds_no_distance() {
    let app = app();
    assert!(app.timing.start(None, None).await);
    let t0 = Utc::now();

    app.sampler.publish(GpsSample::at(35.0, 135.0, t0, Some(10.0)));
    wait_for_fixes(&app, 1).await;
    assert!(app.timing.pause().await);

    // Roughly 1.1 km north of where tracking paused.
    assert!(app.timing.resume().await);
    app.sampler
        .publish(GpsSample::at(35.01, 135.0, t0 + Duration::seconds(300), Some(10.0)));
    wait_for_fixes(&app, 2).await;
    app.sampler
        .publish(GpsSample::at(35.0101, 135.0, t0 + Duration::seconds(301), Some(10.0)));
    wait_for_fixes(&app, 3).await;

    let session = app.timing.stop().await.unwrap();
    assert!(session.total_distance_m > 5.0 && session.total_distance_m < 20.0);
    assert_eq!(session.laps[0].distance_m, session.total_distance_m);
}

#[tokio::test]
async fn controls_outside_their_state_do_nothing() {
    let app = app();
    assert!(!app.timing.pause().await);
    assert!(!app.timing.resume().await);
    assert!(app.timing.complete_lap().await.is_none());
    assert!(app.timing.stop().await.is_none());
    assert!(app.timing.all_sessions().is_empty());

    assert!(app.timing.start(None, None).await);
    assert!(!app.timing.resume().await);
    assert!(app.timing.pause().await);
    assert!(app.timing.complete_lap().await.is_none());
    assert!(app.timing.stop().await.is_some());
    assert_eq!(app.timing.all_sessions().len(), 1);
}

#[tokio::test]
async fn course_management_through_the_controller() {
    let app = app();
    let presets = app.courses.presets().len();

    let mut course = app
        .timing
        .create_course("Paddock", Coordinate::new(34.0, 134.0), 30.0, None)
        .unwrap();
    assert_eq!(app.timing.list_courses().len(), presets + 1);

    course.tolerance_m = 45.0;
    assert!(app.timing.update_course(&course).unwrap());
    assert_eq!(app.timing.course(&course.id).unwrap().tolerance_m, 45.0);

    assert!(!app.timing.delete_course("preset-sugo").unwrap());
    assert!(app.timing.delete_course(&course.id).unwrap());
    assert_eq!(app.timing.list_courses().len(), presets);

    assert!(app.timing.start(None, None).await);
    let session = app.timing.stop().await.unwrap();
    assert!(app.timing.delete_session(&session.id).unwrap());
    assert!(app.timing.session(&session.id).is_none());
}

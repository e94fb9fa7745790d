use chrono::Duration;
use lapkeeper_lib::geo::mps_to_kmh;
use lapkeeper_lib::models::{Lap, Session};

/// `m:ss.mmm`, or `--:--.---` for an open lap.
pub fn format_lap_time(time: Option<Duration>) -> String {
    let Some(time) = time else {
        return "--:--.---".to_string();
    };
    let total_ms = time.num_milliseconds().max(0);
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

pub fn format_lap(lap: &Lap) -> String {
    format!(
        "lap {:>2}  {}  {:>7.0} m  max {:>5.1} km/h  avg {:>5.1} km/h",
        lap.number,
        format_lap_time(lap.lap_time()),
        lap.distance_m,
        mps_to_kmh(lap.max_speed_mps),
        mps_to_kmh(lap.average_speed_mps)
    )
}

pub fn format_session_line(session: &Session) -> String {
    format!(
        "{}  {}  {:<30}  {} laps  best {}",
        session.id,
        session.started_at.format("%Y-%m-%d %H:%M"),
        session
            .course
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("(no course)"),
        session.completed_laps().count(),
        format_lap_time(session.best_lap_time())
    )
}

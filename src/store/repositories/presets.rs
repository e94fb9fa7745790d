use chrono::{DateTime, Utc};

use crate::geo::Coordinate;
use crate::models::Course;

/// Crossing radius used for the built-in circuits.
pub const PRESET_TOLERANCE_M: f64 = 50.0;

// id, name, start/finish lat, lon, lap length (m)
const PRESETS: &[(&str, &str, f64, f64, f64)] = &[
    ("preset-tsukuba", "Tsukuba Circuit", 36.150_38, 139.920_44, 2_045.0),
    ("preset-suzuka", "Suzuka Circuit", 34.843_13, 136.540_72, 5_807.0),
    ("preset-motegi", "Twin Ring Motegi", 36.532_17, 140.227_53, 4_801.0),
    ("preset-fuji", "Fuji Speedway", 35.371_72, 138.927_18, 4_563.0),
    ("preset-sugo", "Sportsland SUGO", 38.139_74, 140.776_35, 3_586.0),
    ("preset-okayama", "Okayama International Circuit", 34.914_74, 134.221_06, 3_703.0),
];

/// The built-in, non-deletable courses.
pub fn preset_courses() -> Vec<Course> {
    PRESETS
        .iter()
        .map(|&(id, name, lat, lon, lap_m)| Course {
            id: id.to_string(),
            name: name.to_string(),
            reference: Coordinate::new(lat, lon),
            tolerance_m: PRESET_TOLERANCE_M,
            expected_lap_distance_m: Some(lap_m),
            is_preset: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        })
        .collect()
}

pub fn is_preset_id(id: &str) -> bool {
    PRESETS.iter().any(|(preset_id, ..)| *preset_id == id)
}

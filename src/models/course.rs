use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::{haversine_m, Coordinate};

/// A start/finish reference point that laps are timed against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub reference: Coordinate,
    /// Crossing-detection radius around `reference`, in metres.
    pub tolerance_m: f64,
    /// Informational only; never used for detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_lap_distance_m: Option<f64>,
    pub is_preset: bool,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// A new user-defined course with a freshly assigned id.
    pub fn new_custom(
        name: impl Into<String>,
        reference: Coordinate,
        tolerance_m: f64,
        expected_lap_distance_m: Option<f64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            reference,
            tolerance_m,
            expected_lap_distance_m,
            is_preset: false,
            created_at,
        }
    }

    pub fn distance_to_reference_m(&self, position: &Coordinate) -> f64 {
        haversine_m(&self.reference, position)
    }

    pub fn contains(&self, position: &Coordinate) -> bool {
        self.distance_to_reference_m(position) <= self.tolerance_m
    }
}

/// Denormalised pointer to the course a session ran against. The course may
/// since have been deleted, so the name is kept alongside the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseRef {
    pub id: String,
    pub name: String,
}

impl From<&Course> for CourseRef {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            name: course.name.clone(),
        }
    }
}

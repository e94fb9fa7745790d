use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::info;

use crate::geo::Coordinate;
use crate::models::Course;
use crate::store::{load_collection, save_collection, KeyValueStore, COURSES_KEY};

use super::presets::{is_preset_id, preset_courses};

/// Preset circuits plus the rider's own courses.
///
/// Presets live in memory only and always lead every listing; the store
/// holds custom courses alone.
#[derive(Clone)]
pub struct CourseRegistry {
    store: Arc<dyn KeyValueStore>,
    presets: Arc<Vec<Course>>,
}

impl CourseRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            presets: Arc::new(preset_courses()),
        }
    }

    pub fn presets(&self) -> &[Course] {
        &self.presets
    }

    /// Stored user courses. Anything claiming a preset id is ignored.
    pub fn custom(&self) -> Vec<Course> {
        let mut courses: Vec<Course> = load_collection(self.store.as_ref(), COURSES_KEY);
        courses.retain(|c| !c.is_preset && !is_preset_id(&c.id));
        courses
    }

    pub fn list(&self) -> Vec<Course> {
        let mut all = self.presets.to_vec();
        all.extend(self.custom());
        all
    }

    pub fn get(&self, id: &str) -> Option<Course> {
        self.presets
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .or_else(|| self.custom().into_iter().find(|c| c.id == id))
    }

    pub fn create(
        &self,
        name: &str,
        reference: Coordinate,
        tolerance_m: f64,
        expected_lap_distance_m: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<Course> {
        validate(name, &reference, tolerance_m, expected_lap_distance_m)?;

        let course = Course::new_custom(
            name.trim(),
            reference,
            tolerance_m,
            expected_lap_distance_m,
            now,
        );
        let mut custom = self.custom();
        custom.push(course.clone());
        save_collection(self.store.as_ref(), COURSES_KEY, &custom)?;

        info!("Created course '{}' ({})", course.name, course.id);
        Ok(course)
    }

    /// Replaces a user course by id. Presets and unknown ids are left alone
    /// and reported as `false`.
    pub fn update(&self, course: &Course) -> Result<bool> {
        if course.is_preset || is_preset_id(&course.id) {
            return Ok(false);
        }
        validate(
            &course.name,
            &course.reference,
            course.tolerance_m,
            course.expected_lap_distance_m,
        )?;

        let mut custom = self.custom();
        let Some(slot) = custom.iter_mut().find(|c| c.id == course.id) else {
            return Ok(false);
        };
        *slot = course.clone();
        save_collection(self.store.as_ref(), COURSES_KEY, &custom)?;
        Ok(true)
    }

    /// Removes a user course. Deleting a preset is a silent no-op.
    pub fn delete(&self, id: &str) -> Result<bool> {
        if is_preset_id(id) {
            info!("Ignoring delete of preset course {id}");
            return Ok(false);
        }

        let mut custom = self.custom();
        let before = custom.len();
        custom.retain(|c| c.id != id);
        if custom.len() == before {
            return Ok(false);
        }
        save_collection(self.store.as_ref(), COURSES_KEY, &custom)?;
        Ok(true)
    }
}

fn validate(
    name: &str,
    reference: &Coordinate,
    tolerance_m: f64,
    expected_lap_distance_m: Option<f64>,
) -> Result<()> {
    if name.trim().is_empty() {
        bail!("course name must not be empty");
    }
    if !(-90.0..=90.0).contains(&reference.latitude) || !(-180.0..=180.0).contains(&reference.longitude) {
        bail!(
            "reference ({}, {}) is not a valid coordinate",
            reference.latitude,
            reference.longitude
        );
    }
    if !tolerance_m.is_finite() || tolerance_m <= 0.0 {
        bail!("tolerance must be a positive number of metres, got {tolerance_m}");
    }
    if let Some(lap_m) = expected_lap_distance_m {
        if !lap_m.is_finite() || lap_m <= 0.0 {
            bail!("expected lap distance must be positive, got {lap_m}");
        }
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One location fix as delivered by the device.
///
/// Speed is in metres per second. Location providers report `-1` (or NaN)
/// when they have no speed estimate, so the constructor folds anything that
/// is not a finite, non-negative number into `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GpsSample {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    pub horizontal_accuracy_m: f64,
}

impl GpsSample {
    pub fn new(
        coordinate: Coordinate,
        timestamp: DateTime<Utc>,
        altitude_m: Option<f64>,
        speed_mps: Option<f64>,
        horizontal_accuracy_m: f64,
    ) -> Self {
        Self {
            coordinate,
            timestamp,
            altitude_m,
            speed_mps: speed_mps.filter(|s| s.is_finite() && *s >= 0.0),
            horizontal_accuracy_m,
        }
    }

    /// Shorthand for a fix with only position, time and speed.
    pub fn at(latitude: f64, longitude: f64, timestamp: DateTime<Utc>, speed_mps: Option<f64>) -> Self {
        Self::new(
            Coordinate::new(latitude, longitude),
            timestamp,
            None,
            speed_mps,
            5.0,
        )
    }

    /// Speed reading usable for max/average bookkeeping.
    ///
    /// Deserialized samples bypass `new`, so the filter is applied again here.
    pub fn valid_speed(&self) -> Option<f64> {
        self.speed_mps.filter(|s| s.is_finite() && *s >= 0.0)
    }
}

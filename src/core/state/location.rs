// src/core/state/location.rs

//! Defines `LocationFix`, a single immutable position report from a provider.

/// A single position report as delivered by a location provider.
///
/// Optional measurements are tracked with `Option` so that a present zero
/// (e.g. a speed of `0.0` while stationary) is distinguishable from an
/// absent value.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    /// The time the fix was taken, in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// The name of the provider that produced the fix (e.g. `gps`).
    pub provider: String,
    /// Altitude above the WGS84 ellipsoid, in meters.
    pub altitude: Option<f64>,
    /// Estimated horizontal accuracy radius, in meters.
    pub accuracy: Option<f32>,
    /// Bearing in degrees.
    pub bearing: Option<f32>,
    /// Speed over ground, in meters per second.
    pub speed: Option<f32>,
}

impl LocationFix {
    /// Creates a fix with only the mandatory fields set.
    pub fn new(timestamp: i64, latitude: f64, longitude: f64, provider: impl Into<String>) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            provider: provider.into(),
            altitude: None,
            accuracy: None,
            bearing: None,
            speed: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_bearing(mut self, bearing: f32) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Returns the age of the fix in seconds relative to `now_millis`.
    ///
    /// A fix stamped in the future (clock skew between provider and host)
    /// yields a negative age; it is reported as-is.
    pub fn age_secs(&self, now_millis: i64) -> f32 {
        (now_millis - self.timestamp) as f32 / 1000.0
    }
}

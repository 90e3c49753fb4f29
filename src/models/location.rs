//! Position model for geographic coordinates and their origin

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location coordinates
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Whether moving from `previous` to `self` counts as a new location.
    ///
    /// No previous position always counts as a change.
    #[must_use]
    pub fn has_changed(&self, previous: Option<&Coordinates>, threshold: f64) -> bool {
        match previous {
            None => true,
            Some(old) => {
                (self.latitude - old.latitude).abs() > threshold
                    || (self.longitude - old.longitude).abs() > threshold
            }
        }
    }

    /// Format latitude and longitude with six decimals, as sent to the API
    #[must_use]
    pub fn query_values(&self) -> (String, String) {
        (
            format!("{:.6}", self.latitude),
            format!("{:.6}", self.longitude),
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Where a position came from
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum PositionSource {
    /// Coordinates given in the configuration or on the command line
    Fixed,
    /// IP based lookup
    Ip,
    /// Coordinates of a named city
    City(String),
}

/// A located point with optional accuracy
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Position {
    pub coordinates: Coordinates,
    /// Accuracy radius in meters, when the provider reports one
    pub accuracy_m: Option<f64>,
    pub source: PositionSource,
}

impl Position {
    #[must_use]
    pub fn new(coordinates: Coordinates, source: PositionSource) -> Self {
        Self {
            coordinates,
            accuracy_m: None,
            source,
        }
    }

    #[must_use]
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    #[must_use]
    pub fn is_city_fallback(&self) -> bool {
        matches!(self.source, PositionSource::City(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_changed_without_previous() {
        let here = Coordinates::new(40.4168, -3.7038);
        assert!(here.has_changed(None, 0.01));
    }

    #[test]
    fn test_has_changed_threshold() {
        let old = Coordinates::new(40.4168, -3.7038);
        let nearby = Coordinates::new(40.4200, -3.7000);
        let moved = Coordinates::new(40.4400, -3.7038);

        assert!(!nearby.has_changed(Some(&old), 0.01));
        assert!(moved.has_changed(Some(&old), 0.01));
    }

    #[test]
    fn test_query_values_have_six_decimals() {
        let coords = Coordinates::new(40.4168, -3.7);
        let (lat, lon) = coords.query_values();
        assert_eq!(lat, "40.416800");
        assert_eq!(lon, "-3.700000");
    }

    #[test]
    fn test_display() {
        let coords = Coordinates::new(46.818_234, 8.227_456);
        assert_eq!(coords.to_string(), "46.8182, 8.2275");
    }
}

//! Geodesic coordinates
//!
//! Coordinates are plain `(latitude, longitude)` pairs in decimal degrees.
//! Distances are measured on the WGS84 ellipsoid (Vincenty's inverse
//! formula); near-antipodal pairs where it does not converge use haversine.

use geoutils::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when latitude is within ±90 and longitude within ±180
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }

    /// Geodesic distance to `other` in kilometres
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        if self == other {
            return 0.0;
        }
        let (from, to) = (self.location(), other.location());
        let distance = from
            .distance_to(&to)
            .unwrap_or_else(|_| from.haversine_distance_to(&to));
        distance.meters() / 1000.0
    }

    /// Whether this point lies within `max_km` of `center`
    pub fn within_km(&self, center: &Coordinate, max_km: f64) -> bool {
        self.distance_km(center) <= max_km
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self::new(lat, lon)
    }
}

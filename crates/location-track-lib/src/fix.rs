//! Raw position fixes and the display state derived from them

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single latitude/longitude measurement as reported by a location source
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fix {
    /// Latitude in degrees (WGS84)
    pub latitude: f64,
    /// Longitude in degrees (WGS84)
    pub longitude: f64,
}

impl Fix {
    /// Create a fix from raw coordinates
    ///
    /// # Arguments
    /// * `latitude` - Degrees north, in `-90.0..=90.0`
    /// * `longitude` - Degrees east, in `-180.0..=180.0`
    ///
    /// Out-of-range or non-finite values are accepted; [`Fix::is_available`] reports them.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// A fix whose coordinates the source could not determine.
    pub fn unavailable() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    /// Whether both coordinates are finite and inside the WGS84 range.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// What the presentation layer should show for the latest location
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LocationDisplay {
    /// No fix has been delivered yet
    #[default]
    Waiting,
    /// Latest accepted position
    Position { latitude: f64, longitude: f64 },
    /// The source reported a fix without usable coordinates, or has none
    Unavailable,
    /// Location access has not been granted
    PermissionDenied,
}

impl From<Fix> for LocationDisplay {
    fn from(fix: Fix) -> Self {
        if fix.is_available() {
            Self::Position {
                latitude: fix.latitude,
                longitude: fix.longitude,
            }
        } else {
            Self::Unavailable
        }
    }
}

impl fmt::Display for LocationDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("Waiting for location..."),
            Self::Position {
                latitude,
                longitude,
            } => write!(f, "Lat: {latitude}, Lon: {longitude}"),
            Self::Unavailable => f.write_str("Unable to get location"),
            Self::PermissionDenied => f.write_str("Location permission not granted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_fix() {
        assert!(Fix::new(48.8566, 2.3522).is_available());
        assert!(Fix::new(-90.0, 180.0).is_available());
    }

    #[test]
    fn test_unavailable_fix() {
        assert!(!Fix::unavailable().is_available());
        assert!(!Fix::new(f64::INFINITY, 0.0).is_available());
        assert!(!Fix::new(91.0, 0.0).is_available());
        assert!(!Fix::new(0.0, -180.5).is_available());
    }

    #[test]
    fn test_display_text() {
        let display = LocationDisplay::from(Fix::new(48.8566, 2.3522));
        assert_eq!(display.to_string(), "Lat: 48.8566, Lon: 2.3522");
        assert_eq!(
            LocationDisplay::from(Fix::unavailable()),
            LocationDisplay::Unavailable
        );
        assert_eq!(LocationDisplay::default(), LocationDisplay::Waiting);
    }
}

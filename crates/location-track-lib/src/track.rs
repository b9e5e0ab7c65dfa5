//! Track points and ordered tracks
//!
//! A [`TrackPoint`] is created once from an accepted fix and never mutated. A [`Track`]
//! is an owned, ordered snapshot of points in the order they were recorded.

use crate::Fix;
use chrono::{DateTime, FixedOffset, SecondsFormat};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Earth's radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// How point timestamps are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimestampFormat {
    /// Local wall-clock time, `yyyy-MM-dd HH:mm:ss`
    #[default]
    Local,
    /// RFC 3339 local time with offset, valid as GPX `xsd:dateTime`
    Rfc3339,
}

impl TimestampFormat {
    pub fn format(&self, time: &DateTime<FixedOffset>) -> String {
        match self {
            Self::Local => time.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Rfc3339 => time.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// One recorded position
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackPoint {
    latitude: f64,
    longitude: f64,
    timestamp: String,
}

impl TrackPoint {
    /// Create a point from coordinates and an already formatted timestamp
    ///
    /// # Arguments
    /// * `latitude` - Latitude in degrees
    /// * `longitude` - Longitude in degrees
    /// * `timestamp` - Written verbatim into the `<time>` element
    pub fn new(latitude: f64, longitude: f64, timestamp: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: timestamp.into(),
        }
    }

    /// Build a point from a fix, stamping it with `time` in the given format
    pub fn from_fix(fix: Fix, time: &DateTime<FixedOffset>, format: TimestampFormat) -> Self {
        Self::new(fix.latitude, fix.longitude, format.format(time))
    }

    /// Latitude in degrees
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Recording time, formatted when the point was appended
    #[inline]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Great-circle distance to another point in meters (Haversine)
    pub fn distance_to(&self, other: &TrackPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

/// Ordered sequence of track points, oldest first
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    points: Vec<TrackPoint>,
}

impl Track {
    /// Create a track from points already in arrival order
    pub fn new(points: Vec<TrackPoint>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackPoint> {
        self.points.iter()
    }

    pub fn last(&self) -> Option<&TrackPoint> {
        self.points.last()
    }

    /// Sum of the distances between consecutive points in meters
    pub fn total_distance(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }
}

impl From<Vec<TrackPoint>> for Track {
    fn from(points: Vec<TrackPoint>) -> Self {
        Self::new(points)
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a TrackPoint;
    type IntoIter = std::slice::Iter<'a, TrackPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-01T10:15:30+02:00").unwrap()
    }

    #[test]
    fn test_local_format() {
        let stamp = TimestampFormat::Local.format(&test_time());
        assert_eq!(stamp, "2024-05-01 10:15:30");
    }

    #[test]
    fn test_rfc3339_format() {
        let stamp = TimestampFormat::Rfc3339.format(&test_time());
        assert_eq!(stamp, "2024-05-01T10:15:30+02:00");
    }

    #[test]
    fn test_point_from_fix() {
        let point = TrackPoint::from_fix(
            Fix::new(48.8566, 2.3522),
            &test_time(),
            TimestampFormat::Local,
        );
        assert_eq!(point.latitude(), 48.8566);
        assert_eq!(point.longitude(), 2.3522);
        assert_eq!(point.timestamp(), "2024-05-01 10:15:30");
    }

    #[test]
    fn test_total_distance() {
        // Paris to Lyon is roughly 392 km as the crow flies
        let track = Track::new(vec![
            TrackPoint::new(48.8566, 2.3522, "a"),
            TrackPoint::new(45.7640, 4.8357, "b"),
        ]);
        let km = track.total_distance() / 1000.0;
        assert!(km > 380.0 && km < 400.0, "unexpected distance {km}");
    }

    #[test]
    fn test_empty_track() {
        let track = Track::default();
        assert!(track.is_empty());
        assert_eq!(track.total_distance(), 0.0);
        assert!(track.last().is_none());
    }
}

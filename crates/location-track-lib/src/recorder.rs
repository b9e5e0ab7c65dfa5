//! TrackRecorder - append-only in-memory buffer of recorded points
//!
//! The buffer is written by the fix delivery task and read by exports. Readers take an
//! owned [`Track`] snapshot under the read lock, so an export never sees a point that
//! is only partly appended.

use crate::{Fix, LocationDisplay, TimestampFormat, Track, TrackPoint};
use chrono::{DateTime, FixedOffset, Local};
use parking_lot::RwLock;

/// Accumulates accepted fixes in delivery order
#[derive(Debug, Default)]
pub struct TrackRecorder {
    points: RwLock<Vec<TrackPoint>>,
    format: TimestampFormat,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TrackRecorder {
    pub fn new(format: TimestampFormat) -> Self {
        Self {
            points: RwLock::new(Vec::new()),
            format,
        }
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        self.format
    }

    /// Record a fix stamped with the current local time
    ///
    /// Returns the display state for the fix. Fixes without usable coordinates are
    /// not recorded and yield [`LocationDisplay::Unavailable`].
    pub fn append(&self, fix: Fix) -> LocationDisplay {
        self.append_at(fix, &Local::now().fixed_offset())
    }

    /// Record a fix stamped with an explicit time
    pub fn append_at(&self, fix: Fix, time: &DateTime<FixedOffset>) -> LocationDisplay {
        if !fix.is_available() {
            tracing::debug!(
                "Ignoring fix without usable coordinates: ({}, {})",
                fix.latitude,
                fix.longitude
            );
            return LocationDisplay::Unavailable;
        }

        let point = TrackPoint::from_fix(fix, time, self.format);
        let mut points = self.points.write();
        points.push(point);
        tracing::trace!("Recorded point #{}", points.len());

        LocationDisplay::from(fix)
    }

    /// Number of recorded points
    pub fn count(&self) -> usize {
        self.points.read().len()
    }

    /// Most recently recorded point
    pub fn last(&self) -> Option<TrackPoint> {
        self.points.read().last().cloned()
    }

    /// Owned copy of the current buffer
    pub fn snapshot(&self) -> Track {
        Track::new(self.points.read().clone())
    }

    /// Drop all recorded points
    pub fn clear(&self) {
        let mut points = self.points.write();
        tracing::debug!("Clearing {} recorded points", points.len());
        points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(seconds: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2024-05-01T10:00:{seconds:02}+00:00")).unwrap()
    }

    #[test]
    fn test_count_matches_appended_fixes() {
        let recorder = TrackRecorder::default();
        for i in 0..25 {
            recorder.append(Fix::new(10.0 + i as f64 * 0.001, 20.0));
        }
        assert_eq!(recorder.count(), 25);
    }

    #[test]
    fn test_order_is_delivery_order() {
        let recorder = TrackRecorder::default();
        let fixes = [(48.8566, 2.3522), (45.7640, 4.8357), (48.8566, 2.3522)];
        for (i, (lat, lon)) in fixes.iter().enumerate() {
            recorder.append_at(Fix::new(*lat, *lon), &at(i as u32));
        }

        let track = recorder.snapshot();
        let recorded: Vec<(f64, f64)> = track
            .iter()
            .map(|p| (p.latitude(), p.longitude()))
            .collect();
        // Duplicates are kept, nothing is reordered
        assert_eq!(recorded, fixes.to_vec());
        assert_eq!(track.points()[2].timestamp(), "2024-05-01 10:00:02");
    }

    #[test]
    fn test_unavailable_fix_is_not_recorded() {
        let recorder = TrackRecorder::default();
        let display = recorder.append(Fix::unavailable());
        assert_eq!(display, LocationDisplay::Unavailable);
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_append_returns_position_display() {
        let recorder = TrackRecorder::default();
        let display = recorder.append(Fix::new(1.5, -2.5));
        assert_eq!(
            display,
            LocationDisplay::Position {
                latitude: 1.5,
                longitude: -2.5
            }
        );
    }

    #[test]
    fn test_clear() {
        let recorder = TrackRecorder::default();
        recorder.append(Fix::new(1.0, 1.0));
        recorder.append(Fix::new(2.0, 2.0));
        recorder.clear();
        assert_eq!(recorder.count(), 0);
        assert!(recorder.last().is_none());
    }

    #[test]
    fn test_snapshot_is_independent_of_later_appends() {
        let recorder = TrackRecorder::default();
        recorder.append(Fix::new(1.0, 1.0));
        let snapshot = recorder.snapshot();
        recorder.append(Fix::new(2.0, 2.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(recorder.count(), 2);
    }

    #[test]
    fn test_rfc3339_recorder() {
        let recorder = TrackRecorder::new(TimestampFormat::Rfc3339);
        recorder.append_at(Fix::new(1.0, 1.0), &at(5));
        assert_eq!(recorder.last().unwrap().timestamp(), "2024-05-01T10:00:05Z");
    }

    #[test]
    fn test_concurrent_appends() {
        let recorder = Arc::new(TrackRecorder::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let recorder = recorder.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        recorder.append(Fix::new(0.0, 0.0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(recorder.count(), 400);
    }
}

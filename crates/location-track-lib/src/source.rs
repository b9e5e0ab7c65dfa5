//! Boundary with the host location service
//!
//! The platform service is not reimplemented here. Hosts implement [`LocationSource`]
//! and push fixes into the [`FixSender`] half of a [`fix_channel`]; the session
//! controller drains the matching [`FixStream`].

use crate::{Fix, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Receiving half of a fix subscription
pub type FixStream = mpsc::Receiver<Fix>;

/// Sending half of a fix subscription, held by the location source
pub type FixSender = mpsc::Sender<Fix>;

/// Number of undelivered fixes a subscription buffers before the source has to wait
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Create a bounded fix channel for a new subscription
pub fn fix_channel() -> (FixSender, FixStream) {
    mpsc::channel(DEFAULT_CHANNEL_CAPACITY)
}

/// Accuracy/power trade-off requested from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Priority {
    #[default]
    HighAccuracy,
    Balanced,
    LowPower,
}

/// Subscription parameters handed to [`LocationSource::subscribe`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocationRequest {
    /// Requested accuracy
    pub priority: Priority,
    /// Desired interval between fixes
    pub interval: Duration,
    /// Fixes must not be delivered faster than this
    pub min_update_interval: Duration,
    /// Longest the source may batch fixes before delivering them
    pub max_update_delay: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            priority: Priority::HighAccuracy,
            interval: Duration::from_millis(1000),
            min_update_interval: Duration::from_millis(1000),
            max_update_delay: Duration::from_millis(500),
        }
    }
}

impl LocationRequest {
    /// Default request with both the interval and the minimum interval set to `interval`
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            min_update_interval: interval,
            ..Self::default()
        }
    }
}

/// A platform service emitting periodic position fixes
pub trait LocationSource: Send + Sync {
    /// Start emitting fixes according to `request`
    fn subscribe(&self, request: &LocationRequest) -> Result<FixStream>;

    /// Stop emitting fixes. Safe to call without an active subscription.
    fn unsubscribe(&self);

    /// The most recent fix known to the source, if any
    fn last_known(&self) -> Option<Fix>;

    /// Whether location access has been granted
    fn has_permission(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        let request = LocationRequest::default();
        assert_eq!(request.priority, Priority::HighAccuracy);
        assert_eq!(request.interval, Duration::from_millis(1000));
        assert_eq!(request.min_update_interval, Duration::from_millis(1000));
        assert_eq!(request.max_update_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_with_interval() {
        let request = LocationRequest::with_interval(Duration::from_millis(250));
        assert_eq!(request.interval, Duration::from_millis(250));
        assert_eq!(request.min_update_interval, Duration::from_millis(250));
        assert_eq!(request.priority, Priority::HighAccuracy);
    }

    #[tokio::test]
    async fn test_fix_channel_delivers_in_order() {
        let (tx, mut rx) = fix_channel();
        tx.send(Fix::new(1.0, 1.0)).await.unwrap();
        tx.send(Fix::new(2.0, 2.0)).await.unwrap();
        drop(tx);
        assert_eq!(rx.recv().await, Some(Fix::new(1.0, 1.0)));
        assert_eq!(rx.recv().await, Some(Fix::new(2.0, 2.0)));
        assert_eq!(rx.recv().await, None);
    }
}

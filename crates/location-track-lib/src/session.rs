//! SessionController - Idle/Tracking state machine over a location source
//!
//! Starting a session subscribes to the source and spawns a delivery task on the
//! current tokio runtime that appends every received fix to the recorder. Stopping
//! unsubscribes, closes the stream and records the fixes still queued in it before
//! ending that task, so a stop never loses a delivered fix. Both transitions are
//! idempotent.

use crate::{
    ExportLocation, Exporter, Fix, FixStream, LocationDisplay, LocationRequest, LocationSource,
    Result, Track, TrackError, TrackRecorder,
};
use parking_lot::{Mutex, RwLock};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::task::Poll;
use tokio::task::JoinHandle;

/// Whether a session is currently subscribed to the location source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionState {
    #[default]
    Idle,
    Tracking,
}

/// Mediates start/stop requests and owns the fix delivery task
pub struct SessionController {
    source: Arc<dyn LocationSource>,
    recorder: Arc<TrackRecorder>,
    request: LocationRequest,
    display: Arc<RwLock<LocationDisplay>>,
    /// Active subscription; `Some` exactly while tracking
    delivery: Mutex<Option<Delivery>>,
}

/// Fix stream of the active session and the task draining it.
///
/// The stream is only locked for the duration of a single poll, and a received fix
/// is recorded before the lock is released. `stop()` takes the same lock to drain
/// the rest, so every fix leaves the channel exactly once and lands in the recorder.
struct Delivery {
    stream: Arc<Mutex<FixStream>>,
    task: JoinHandle<()>,
}

fn record(recorder: &TrackRecorder, display: &RwLock<LocationDisplay>, fix: Fix) {
    let shown = recorder.append(fix);
    *display.write() = shown;
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SessionController {
    /// Create an idle controller with an empty recorder and the default request
    ///
    /// # Arguments
    /// * `source` - Where fixes come from once tracking starts
    ///
    /// # Returns
    /// A controller in the [`SessionState::Idle`] state showing
    /// [`LocationDisplay::Waiting`]
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self {
            source,
            recorder: Arc::new(TrackRecorder::default()),
            request: LocationRequest::default(),
            display: Arc::new(RwLock::new(LocationDisplay::default())),
            delivery: Mutex::new(None),
        }
    }

    /// Record into an existing recorder instead of a fresh one
    ///
    /// Points already in `recorder` are kept and exported with the new ones.
    pub fn with_recorder(mut self, recorder: Arc<TrackRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Subscribe with `request` instead of [`LocationRequest::default`]
    pub fn with_request(mut self, request: LocationRequest) -> Self {
        self.request = request;
        self
    }

    /// Begin tracking. No-op when already tracking.
    ///
    /// Must be called from within a tokio runtime, which runs the delivery task.
    /// Fails without changing state when permission is missing or the source cannot
    /// subscribe; nothing is retried.
    pub fn start(&self) -> Result<()> {
        let mut delivery = self.delivery.lock();
        if delivery.is_some() {
            tracing::debug!("start() ignored: already tracking");
            return Ok(());
        }

        if !self.source.has_permission() {
            tracing::warn!("Cannot start tracking: location permission not granted");
            *self.display.write() = LocationDisplay::PermissionDenied;
            return Err(TrackError::PermissionDenied);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            TrackError::SourceUnavailable(format!("no async runtime to deliver fixes: {e}"))
        })?;

        let stream = self.source.subscribe(&self.request).inspect_err(|e| {
            tracing::error!("Location subscription failed: {e}");
        })?;
        let stream = Arc::new(Mutex::new(stream));

        let task = runtime.spawn({
            let stream = stream.clone();
            let recorder = self.recorder.clone();
            let display = self.display.clone();
            async move {
                std::future::poll_fn(|cx| {
                    loop {
                        let mut stream = stream.lock();
                        match stream.poll_recv(cx) {
                            Poll::Ready(Some(fix)) => record(&recorder, &display, fix),
                            Poll::Ready(None) => return Poll::Ready(()),
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                })
                .await;
                tracing::debug!("Fix stream closed");
            }
        });
        *delivery = Some(Delivery { stream, task });

        tracing::info!(
            "Tracking started ({:?}, min interval {:?})",
            self.request.priority,
            self.request.min_update_interval
        );
        Ok(())
    }

    /// Stop tracking. No-op when idle.
    ///
    /// Fixes the source delivered before this call are recorded before it returns,
    /// even if the delivery task has not run yet. Fixes sent afterwards are refused.
    pub fn stop(&self) {
        let mut delivery = self.delivery.lock();
        let Some(Delivery { stream, task }) = delivery.take() else {
            tracing::debug!("stop() ignored: not tracking");
            return;
        };

        self.source.unsubscribe();
        let queued = {
            let mut stream = stream.lock();
            stream.close();
            let mut queued = 0usize;
            while let Ok(fix) = stream.try_recv() {
                record(&self.recorder, &self.display, fix);
                queued += 1;
            }
            queued
        };
        task.abort();

        tracing::info!(
            "Tracking stopped with {} recorded points ({queued} drained on stop)",
            self.recorder.count()
        );
    }

    /// Stop tracking, then export everything recorded so far
    pub fn stop_and_export(&self, exporter: &Exporter) -> Result<ExportLocation> {
        self.stop();
        self.export(exporter)
    }

    /// Export a snapshot of the recorded track. Allowed in either state.
    pub fn export(&self, exporter: &Exporter) -> Result<ExportLocation> {
        exporter.export(&self.recorder.snapshot())
    }

    /// Record the source's last known fix, if there is one
    pub fn refresh_last_known(&self) -> Result<LocationDisplay> {
        if !self.source.has_permission() {
            *self.display.write() = LocationDisplay::PermissionDenied;
            return Err(TrackError::PermissionDenied);
        }

        let shown = match self.source.last_known() {
            Some(fix) => self.recorder.append(fix),
            None => LocationDisplay::Unavailable,
        };
        *self.display.write() = shown;

        match shown {
            LocationDisplay::Unavailable => Err(TrackError::FixUnavailable),
            _ => Ok(shown),
        }
    }

    /// Current state of the session
    pub fn state(&self) -> SessionState {
        if self.delivery.lock().is_some() {
            SessionState::Tracking
        } else {
            SessionState::Idle
        }
    }

    /// Shorthand for `state() == SessionState::Tracking`
    pub fn is_tracking(&self) -> bool {
        self.state() == SessionState::Tracking
    }

    /// Latest display state for the presentation layer
    pub fn display(&self) -> LocationDisplay {
        *self.display.read()
    }

    /// Number of points recorded so far
    pub fn point_count(&self) -> usize {
        self.recorder.count()
    }

    /// Owned copy of the recorded track
    ///
    /// # Returns
    /// Every point recorded so far, in arrival order. Later fixes do not affect it.
    pub fn snapshot(&self) -> Track {
        self.recorder.snapshot()
    }

    /// The recorder fixes are appended to
    pub fn recorder(&self) -> &Arc<TrackRecorder> {
        &self.recorder
    }

    /// Request passed to the source on every `start()`
    pub fn request(&self) -> &LocationRequest {
        &self.request
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

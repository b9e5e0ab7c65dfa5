//! Location Track Library - Tracking Sessions and GPX Export
//!
//! This library records a position feed into an in-memory track and exports it as a
//! GPX 1.1 document. The platform location service stays outside the crate: it is
//! injected through the [`LocationSource`] trait and delivers fixes over a channel.
//!
//! # Architecture
//!
//! - **[`SessionController`]**: Idle/Tracking state machine that subscribes to and
//!   unsubscribes from the location source
//! - **[`LocationSource`]**: Boundary trait over the host location service
//! - **[`TrackRecorder`]**: Append-only buffer of [`TrackPoint`]s
//! - **[`Exporter`]**: Renders a [`Track`] snapshot to GPX and writes it through an
//!   [`ExportTarget`] (by default the user's downloads directory)
//!
//! # Example
//!
//! ```rust
//! use location_track_lib::{ExportOptions, Fix, TrackRecorder, render_gpx};
//!
//! let recorder = TrackRecorder::default();
//! recorder.append(Fix::new(48.8566, 2.3522));
//! recorder.append(Fix::new(45.7640, 4.8357));
//!
//! let document = render_gpx(&recorder.snapshot(), &ExportOptions::default());
//! assert_eq!(document.matches("<trkpt ").count(), 2);
//! ```

mod document;
mod export;
mod fix;
mod recorder;
mod session;
mod source;
mod track;

// Public API exports
pub use document::{read_track, render_gpx};
pub use export::{
    DownloadsDirectory, ExportEntry, ExportLocation, ExportOptions, ExportTarget, Exporter,
    GPX_MIME_TYPE,
};
pub use fix::{Fix, LocationDisplay};
pub use recorder::TrackRecorder;
pub use session::{SessionController, SessionState};
pub use source::{FixSender, FixStream, LocationRequest, LocationSource, Priority, fix_channel};
pub use track::{TimestampFormat, Track, TrackPoint};

/// Error types for tracking and export operations
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Location permission not granted")]
    PermissionDenied,

    #[error("No last known location available")]
    FixUnavailable,

    #[error("Failed to write GPX file: {message}")]
    WriteFailed { message: String },

    #[error("Location source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed GPX document: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;

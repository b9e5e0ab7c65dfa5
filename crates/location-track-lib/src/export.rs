//! GPX export to a user-visible location
//!
//! [`Exporter`] renders a [`Track`] snapshot and hands the bytes to an
//! [`ExportTarget`]. [`DownloadsDirectory`] is the native filesystem target.
//!
//! A write that fails halfway may leave a partial `tracking.gpx` behind; it is not
//! cleaned up.

use crate::{Result, Track, TrackError, render_gpx};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// MIME type of exported documents
pub const GPX_MIME_TYPE: &str = "application/gpx+xml";

/// Document metadata and file naming for exports
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExportOptions {
    /// Value of the `creator` attribute on `<gpx>`
    pub creator: String,
    /// Content of the track `<name>`
    pub track_name: String,
    /// Name of the written file
    pub file_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            creator: "LocationApp".to_string(),
            track_name: "Tracking".to_string(),
            file_name: "tracking.gpx".to_string(),
        }
    }
}

/// Metadata describing the entry a target is asked to create
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    pub file_name: String,
    pub mime_type: &'static str,
    /// Creation time in seconds since the Unix epoch
    pub date_added: i64,
}

/// Where an export ended up
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExportLocation {
    /// A file on the local filesystem
    Path(PathBuf),
    /// An opaque platform identifier, such as a content URI
    Uri(String),
}

impl fmt::Display for ExportLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Uri(uri) => f.write_str(uri),
        }
    }
}

/// Persists exported bytes somewhere the user can reach them
pub trait ExportTarget: Send + Sync {
    fn write(&self, entry: &ExportEntry, bytes: &[u8]) -> io::Result<ExportLocation>;
}

/// Writes exports into a directory, by default the user's downloads directory
#[derive(Debug, Clone)]
pub struct DownloadsDirectory {
    dir: PathBuf,
}

impl DownloadsDirectory {
    /// Target writing into `dir`, created on first export if missing
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's downloads directory.
    /// Falls back to the home directory, then to the current directory.
    pub fn user_default() -> Self {
        let dir = dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportTarget for DownloadsDirectory {
    fn write(&self, entry: &ExportEntry, bytes: &[u8]) -> io::Result<ExportLocation> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&entry.file_name);
        let mut file = fs::File::create(&path)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(ExportLocation::Path(path))
    }
}

/// Serializes tracks to GPX and writes them through a target
pub struct Exporter {
    options: ExportOptions,
    target: Box<dyn ExportTarget>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Exporter {
    /// Create an exporter
    ///
    /// # Arguments
    /// * `target` - Where the rendered document is written
    /// * `options` - GPX metadata and the file name to write
    ///
    /// # Returns
    /// An exporter that can be reused for any number of exports
    pub fn new(target: impl ExportTarget + 'static, options: ExportOptions) -> Self {
        Self {
            options,
            target: Box::new(target),
        }
    }

    /// Exporter writing `tracking.gpx` into the user's downloads directory
    pub fn to_downloads() -> Self {
        Self::new(DownloadsDirectory::user_default(), ExportOptions::default())
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Render `track` and write it through the target
    pub fn export(&self, track: &Track) -> Result<ExportLocation> {
        let document = render_gpx(track, &self.options);
        let entry = ExportEntry {
            file_name: self.options.file_name.clone(),
            mime_type: GPX_MIME_TYPE,
            date_added: chrono::Utc::now().timestamp(),
        };

        match self.target.write(&entry, document.as_bytes()) {
            Ok(location) => {
                tracing::info!("Saved {} points to {}", track.len(), location);
                Ok(location)
            }
            Err(e) => {
                tracing::error!("Failed to save {}: {}", entry.file_name, e);
                Err(TrackError::WriteFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}

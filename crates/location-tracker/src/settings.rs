use clap::Parser;
use location_track_lib::{ExportOptions, LocationRequest, TimestampFormat};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Location Tracker - record a position feed and export it as a GPX track
///
/// Fixes are read as `lat,lon` lines. Tracking stops when the feed ends or on Ctrl-C,
/// then the track is written as tracking.gpx.
pub struct Settings {
    /// Fix feed to read (defaults to stdin)
    #[clap(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory to export into (defaults to the user's downloads directory)
    #[clap(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Minimum interval between recorded fixes, in milliseconds
    #[clap(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Value of the GPX creator attribute
    #[clap(long, default_value = "LocationApp")]
    pub creator: String,

    /// Name of the exported track
    #[clap(long, default_value = "Tracking")]
    pub track_name: String,

    /// Write RFC 3339 timestamps instead of local `yyyy-MM-dd HH:mm:ss` time
    #[clap(long, default_value = "false")]
    pub rfc3339: bool,

    /// Seconds between progress log lines (0 disables them)
    #[clap(long, default_value = "10")]
    pub status_every: u64,

    /// Print a JSON summary of the session on exit
    #[clap(long, default_value = "false")]
    pub summary_json: bool,
}

impl Settings {
    /// Parse settings from the command line, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn location_request(&self) -> LocationRequest {
        LocationRequest::with_interval(Duration::from_millis(self.interval_ms))
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            creator: self.creator.clone(),
            track_name: self.track_name.clone(),
            ..ExportOptions::default()
        }
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        if self.rfc3339 {
            TimestampFormat::Rfc3339
        } else {
            TimestampFormat::Local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_defaults() {
        let settings = Settings::parse_from(["location-tracker"]);
        assert_eq!(settings.location_request(), LocationRequest::default());
        assert_eq!(settings.export_options(), ExportOptions::default());
        assert_eq!(settings.timestamp_format(), TimestampFormat::Local);
        assert!(settings.input.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::parse_from([
            "location-tracker",
            "--input",
            "fixes.csv",
            "--output-dir",
            "/tmp/out",
            "--interval-ms",
            "250",
            "--track-name",
            "Morning run",
            "--rfc3339",
        ]);
        assert_eq!(settings.input, Some(PathBuf::from("fixes.csv")));
        assert_eq!(settings.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(
            settings.location_request().min_update_interval,
            Duration::from_millis(250)
        );
        assert_eq!(settings.export_options().track_name, "Morning run");
        assert_eq!(settings.export_options().file_name, "tracking.gpx");
        assert_eq!(settings.timestamp_format(), TimestampFormat::Rfc3339);
    }
}

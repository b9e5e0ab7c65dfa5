use crate::line_source::LineSource;
use crate::settings::Settings;
use location_track_lib::{
    DownloadsDirectory, Exporter, LocationDisplay, SessionController, TrackError, TrackRecorder,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Cannot open fix feed: {0}")]
    Input(#[from] std::io::Error),

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error("Cannot serialize summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// What the session produced, printed with `--summary-json`
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub points: usize,
    pub distance_meters: f64,
    pub last_position: LocationDisplay,
    pub export_location: String,
}

/// Track the configured feed until it ends or Ctrl-C, then export the track
pub async fn run(settings: Settings) -> Result<SessionSummary, CliError> {
    let source = Arc::new(open_source(&settings).await?);
    let recorder = Arc::new(TrackRecorder::new(settings.timestamp_format()));
    let controller = SessionController::new(source.clone())
        .with_recorder(recorder)
        .with_request(settings.location_request());

    let target = match &settings.output_dir {
        Some(dir) => DownloadsDirectory::new(dir),
        None => DownloadsDirectory::user_default(),
    };
    let exporter = Exporter::new(target, settings.export_options());

    controller.start()?;

    let mut status = (settings.status_every > 0)
        .then(|| tokio::time::interval(Duration::from_secs(settings.status_every)));
    loop {
        tokio::select! {
            _ = source.wait_exhausted() => {
                tracing::info!("Fix feed ended");
                break;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!("Cannot listen for Ctrl-C: {e}");
                }
                tracing::info!("Interrupted");
                break;
            }
            _ = tick(&mut status) => {
                tracing::info!(
                    "{} | Points recorded: {}",
                    controller.display(),
                    controller.point_count()
                );
            }
        }
    }

    let location = {
        profiling::scope!("stop_and_export");
        controller.stop_and_export(&exporter)?
    };
    let track = controller.snapshot();

    println!("GPX file saved to {location}");

    Ok(SessionSummary {
        points: track.len(),
        distance_meters: track.total_distance(),
        last_position: controller.display(),
        export_location: location.to_string(),
    })
}

async fn open_source(settings: &Settings) -> Result<LineSource, CliError> {
    Ok(match &settings.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            tracing::info!("Reading fixes from {}", path.display());
            LineSource::new(BufReader::new(file))
        }
        None => {
            tracing::info!("Reading fixes from stdin");
            LineSource::new(BufReader::new(tokio::io::stdin()))
        }
    })
}

async fn tick(status: &mut Option<tokio::time::Interval>) {
    match status {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

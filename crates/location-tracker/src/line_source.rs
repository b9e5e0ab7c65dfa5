//! Location source fed by `lat,lon` text lines
//!
//! Each non-empty line that does not start with `#` is one fix. Coordinates may be
//! separated by a comma or by whitespace; `nan` marks a fix without coordinates.
//! Lines are forwarded no faster than the request's minimum update interval.

use location_track_lib::{
    Fix, FixSender, FixStream, LocationRequest, LocationSource, Result, TrackError, fix_channel,
};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type LineReader = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Read position in the input, shared by every feed task of one source
struct FeedState {
    lines: LineReader,
    line_number: usize,
    /// Parsed but not yet handed to a subscriber
    pending: Option<Fix>,
}

pub struct LineSource {
    /// Shared with the feed task so a new subscription resumes where the last one stopped
    state: Arc<tokio::sync::Mutex<FeedState>>,
    last_known: Arc<Mutex<Option<Fix>>>,
    feed: Mutex<Option<JoinHandle<()>>>,
    exhausted: Arc<watch::Sender<bool>>,
}

impl LineSource {
    pub fn new(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        let (exhausted, _) = watch::channel(false);
        Self {
            state: Arc::new(tokio::sync::Mutex::new(FeedState {
                lines: reader.lines(),
                line_number: 0,
                pending: None,
            })),
            last_known: Arc::new(Mutex::new(None)),
            feed: Mutex::new(None),
            exhausted: Arc::new(exhausted),
        }
    }

    /// Resolves once the input has been read to the end
    pub async fn wait_exhausted(&self) {
        let mut exhausted = self.exhausted.subscribe();
        // Only fails if the sender is gone, which cannot happen while `self` is alive
        let _ = exhausted.wait_for(|done| *done).await;
    }
}

impl LocationSource for LineSource {
    fn subscribe(&self, request: &LocationRequest) -> Result<FixStream> {
        if *self.exhausted.borrow() {
            return Err(TrackError::SourceUnavailable(
                "input already read to the end".to_string(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TrackError::SourceUnavailable(format!("no async runtime: {e}")))?;

        let (tx, rx) = fix_channel();
        let task = runtime.spawn(feed(
            self.state.clone(),
            tx,
            self.last_known.clone(),
            self.exhausted.clone(),
            request.min_update_interval,
        ));

        if let Some(previous) = self.feed.lock().replace(task) {
            previous.abort();
        }
        Ok(rx)
    }

    fn unsubscribe(&self) {
        if let Some(task) = self.feed.lock().take() {
            task.abort();
        }
    }

    fn last_known(&self) -> Option<Fix> {
        *self.last_known.lock()
    }
}

/// Forward fixes until the input ends or the subscriber goes away.
///
/// A fix stays in `pending` until `send` has accepted it, so aborting the task at
/// any await point leaves it for the next subscription.
async fn feed(
    state: Arc<tokio::sync::Mutex<FeedState>>,
    tx: FixSender,
    last_known: Arc<Mutex<Option<Fix>>>,
    exhausted: Arc<watch::Sender<bool>>,
    min_interval: Duration,
) {
    let mut state = state.lock().await;
    let mut pace = tokio::time::interval(min_interval.max(Duration::from_millis(1)));
    pace.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let pending = state.pending;
        let fix = match pending {
            Some(fix) => fix,
            None => match next_fix(&mut state).await {
                Some(fix) => *state.pending.insert(fix),
                None => break,
            },
        };

        pace.tick().await;
        if tx.send(fix).await.is_err() {
            // Subscriber went away
            return;
        }
        state.pending = None;
        if fix.is_available() {
            *last_known.lock() = Some(fix);
        }
    }

    tracing::debug!("Fix feed finished after {} lines", state.line_number);
    exhausted.send_replace(true);
}

/// Read lines until one holds a fix. `None` once the input is over.
async fn next_fix(state: &mut FeedState) -> Option<Fix> {
    loop {
        let line = match state.lines.next_line().await {
            Ok(None) => return None,
            line => line,
        };
        state.line_number += 1;
        let line_number = state.line_number;

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            // The undecodable line has been consumed, the rest is still readable
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::warn!("Skipping line {line_number}: {e}");
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to read fix feed at line {line_number}: {e}");
                return None;
            }
        };

        match parse_fix(&line) {
            Some(Ok(fix)) => return Some(fix),
            Some(Err(reason)) => tracing::warn!("Skipping line {line_number}: {reason}"),
            None => {}
        }
    }
}

/// Parse one feed line. `None` for blank lines and comments.
fn parse_fix(line: &str) -> Option<std::result::Result<Fix, String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty());
    let (Some(lat), Some(lon), None) = (fields.next(), fields.next(), fields.next()) else {
        return Some(Err(format!("expected `lat,lon`, got `{line}`")));
    };

    let parse = |field: &str| {
        field
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate `{field}`: {e}"))
    };
    Some(parse(lat).and_then(|lat| parse(lon).map(|lon| Fix::new(lat, lon))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    fn source(input: &str) -> LineSource {
        source_bytes(input.as_bytes())
    }

    fn source_bytes(input: &[u8]) -> LineSource {
        LineSource::new(BufReader::new(Cursor::new(input.to_vec())))
    }

    #[test]
    fn test_parse_fix() {
        assert_eq!(parse_fix("48.8566,2.3522"), Some(Ok(Fix::new(48.8566, 2.3522))));
        assert_eq!(parse_fix(" 45.764 4.8357 "), Some(Ok(Fix::new(45.764, 4.8357))));
        assert_eq!(parse_fix("1.0, 2.0"), Some(Ok(Fix::new(1.0, 2.0))));
        assert_eq!(parse_fix(""), None);
        assert_eq!(parse_fix("# header"), None);
        assert!(parse_fix("1.0").unwrap().is_err());
        assert!(parse_fix("1.0,2.0,3.0").unwrap().is_err());
        assert!(parse_fix("north,east").unwrap().is_err());
    }

    #[test]
    fn test_parse_nan_is_unavailable_fix() {
        let fix = parse_fix("nan,nan").unwrap().unwrap();
        assert!(!fix.is_available());
    }

    #[tokio::test]
    async fn test_feed_delivers_fixes_then_closes() {
        let source = source("# lat,lon\n1.0,2.0\n\nbad line\n3.0,4.0\n");
        let request = LocationRequest::with_interval(Duration::from_millis(1));

        let mut stream = source.subscribe(&request).unwrap();
        assert_eq!(stream.recv().await, Some(Fix::new(1.0, 2.0)));
        assert_eq!(stream.recv().await, Some(Fix::new(3.0, 4.0)));
        assert_eq!(stream.recv().await, None);

        source.wait_exhausted().await;
        assert_eq!(source.last_known(), Some(Fix::new(3.0, 4.0)));
        assert!(matches!(
            source.subscribe(&request),
            Err(TrackError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_resubscribe_resumes_input() {
        let source = source("1.0,1.0\n2.0,2.0\n");
        let request = LocationRequest::with_interval(Duration::from_millis(20));

        let mut first = source.subscribe(&request).unwrap();
        assert_eq!(first.recv().await, Some(Fix::new(1.0, 1.0)));
        source.unsubscribe();

        let mut second = source.subscribe(&request).unwrap();
        assert_eq!(second.recv().await, Some(Fix::new(2.0, 2.0)));
        assert_eq!(second.recv().await, None);
    }

    #[tokio::test]
    async fn test_unsubscribe_while_pacing_keeps_next_fix() {
        let source = source("1.0,1.0\n2.0,2.0\n");
        let request = LocationRequest::with_interval(Duration::from_millis(50));

        let mut first = source.subscribe(&request).unwrap();
        assert_eq!(first.recv().await, Some(Fix::new(1.0, 1.0)));
        // The feed has read the second line and is waiting out the interval
        tokio::time::sleep(Duration::from_millis(5)).await;
        source.unsubscribe();

        let mut second = source.subscribe(&request).unwrap();
        assert_eq!(second.recv().await, Some(Fix::new(2.0, 2.0)));
    }

    #[tokio::test]
    async fn test_undecodable_line_is_skipped() {
        let source = source_bytes(b"1.0,1.0\n\xff\xfe\n2.0,2.0\n");
        let request = LocationRequest::with_interval(Duration::from_millis(1));

        let mut stream = source.subscribe(&request).unwrap();
        assert_eq!(stream.recv().await, Some(Fix::new(1.0, 1.0)));
        assert_eq!(stream.recv().await, Some(Fix::new(2.0, 2.0)));
        assert_eq!(stream.recv().await, None);
        source.wait_exhausted().await;
    }

    #[test]
    fn test_subscribe_requires_runtime() {
        let source = source("1.0,1.0\n");
        assert!(matches!(
            source.subscribe(&LocationRequest::default()),
            Err(TrackError::SourceUnavailable(_))
        ));
    }
}

//! GPX document rendering and reading
//!
//! The layout is fixed: one `<trk>` with one `<name>` and one `<trkseg>`, and each
//! point on its own line as `<trkpt lat=".." lon=".."><time>..</time></trkpt>`.
//! Coordinates and timestamps are written verbatim, since both come from fixed numeric
//! and date formats. Only the configurable creator and track name are escaped.

use crate::{ExportOptions, Result, Track, TrackError, TrackPoint};
use std::fmt::Write;

const TRKSEG_OPEN: &str = "<trkseg>";
const TRKSEG_CLOSE: &str = "</trkseg>";
const TRKPT_OPEN: &str = "<trkpt ";
const TRKPT_CLOSE: &str = "</trkpt>";

/// Render a track as a GPX 1.1 document
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn render_gpx(track: &Track, options: &ExportOptions) -> String {
    // Header, footer and roughly 80 bytes per point
    let mut out = String::with_capacity(192 + track.len() * 80);

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<gpx version=\"1.1\" creator=\"{}\">",
        escape_xml(&options.creator)
    );
    out.push_str("<trk>\n");
    let _ = writeln!(out, "<name>{}</name>", escape_xml(&options.track_name));
    out.push_str(TRKSEG_OPEN);
    out.push('\n');
    for point in track {
        let _ = writeln!(
            out,
            "<trkpt lat=\"{}\" lon=\"{}\"><time>{}</time></trkpt>",
            point.latitude(),
            point.longitude(),
            point.timestamp()
        );
    }
    out.push_str(TRKSEG_CLOSE);
    out.push('\n');
    out.push_str("</trk>\n");
    out.push_str("</gpx>");

    out
}

/// Parse a document in the layout produced by [`render_gpx`] back into a track
pub fn read_track(document: &str) -> Result<Track> {
    let start = document
        .find(TRKSEG_OPEN)
        .ok_or_else(|| malformed("missing <trkseg>"))?
        + TRKSEG_OPEN.len();
    let end = document[start..]
        .find(TRKSEG_CLOSE)
        .ok_or_else(|| malformed("missing </trkseg>"))?
        + start;

    let mut body = &document[start..end];
    let mut points = Vec::new();

    while let Some(open) = body.find(TRKPT_OPEN) {
        let close = body[open..]
            .find(TRKPT_CLOSE)
            .ok_or_else(|| malformed(format!("unterminated <trkpt> #{}", points.len() + 1)))?
            + open;
        points.push(parse_point(&body[open..close])?);
        body = &body[close + TRKPT_CLOSE.len()..];
    }

    if !body.trim().is_empty() {
        return Err(malformed(format!(
            "unexpected content in <trkseg>: {}",
            body.trim()
        )));
    }

    Ok(Track::new(points))
}

/// Parse `<trkpt lat=".." lon=".."><time>..</time>` (closing tag already stripped)
fn parse_point(element: &str) -> Result<TrackPoint> {
    let tag_end = element
        .find('>')
        .ok_or_else(|| malformed("unterminated <trkpt> tag"))?;
    let tag = &element[..tag_end];

    let latitude = parse_coordinate(tag, "lat")?;
    let longitude = parse_coordinate(tag, "lon")?;

    let content = &element[tag_end + 1..];
    let timestamp = content
        .strip_prefix("<time>")
        .and_then(|rest| rest.strip_suffix("</time>"))
        .ok_or_else(|| malformed(format!("point ({latitude}, {longitude}) has no <time>")))?;

    Ok(TrackPoint::new(latitude, longitude, timestamp))
}

fn parse_coordinate(tag: &str, name: &str) -> Result<f64> {
    let needle = format!(" {name}=\"");
    let start = tag
        .find(&needle)
        .ok_or_else(|| malformed(format!("missing {name} attribute")))?
        + needle.len();
    let value = tag[start..]
        .split('"')
        .next()
        .ok_or_else(|| malformed(format!("unterminated {name} attribute")))?;
    value
        .parse()
        .map_err(|e| malformed(format!("invalid {name} \"{value}\": {e}")))
}

fn malformed(reason: impl Into<String>) -> TrackError {
    TrackError::Malformed(reason.into())
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

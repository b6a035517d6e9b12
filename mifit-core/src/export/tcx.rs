//! Training Center XML (TCX) writer
//!
//! Mi Fit stores series as `;`-separated deltas:
//!
//! - `longitude_latitude`: `lat,lon;dlat,dlon;...` in 1e-8 degrees
//! - `time`: `t0;dt;dt;...` in seconds from the track start
//!
//! Each series is summed back into absolute values and zipped into
//! trackpoints. Trailing points of the longer series are dropped.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Details, Summary, TrackId};

use super::Exporter;

const COORDINATE_SCALE: f64 = 100_000_000.0;

/// Writes tracks as TCX activities.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcxExporter;

impl TcxExporter {
    pub fn new() -> Self {
        Self
    }

    /// Render the TCX document for one track.
    pub fn render(&self, summary: &Summary, details: &Details) -> Result<String> {
        let start = summary
            .get("trackid")
            .or_else(|| details.get("trackid"))
            .and_then(TrackId::from_value)
            .and_then(|id| id.start_time())
            .ok_or_else(|| Error::Export("track has no usable start time".to_string()))?;

        let trackpoints = decode_points(details)?
            .into_iter()
            .map(|point| Ok((point_time(start, point.offset_secs)?, point)))
            .collect::<Result<Vec<_>>>()?;

        let mut xml = String::new();
        write_document(&mut xml, summary, start, &trackpoints)
            .map_err(|e| Error::Export(format!("failed to render TCX document: {}", e)))?;
        Ok(xml)
    }
}

fn write_document(
    xml: &mut String,
    summary: &Summary,
    start: DateTime<Utc>,
    trackpoints: &[(DateTime<Utc>, Point)],
) -> fmt::Result {
    let start_text = format_time(start);

    writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        xml,
        r#"<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">"#
    )?;
    writeln!(xml, "  <Activities>")?;
    writeln!(xml, r#"    <Activity Sport="{}">"#, sport(summary))?;
    writeln!(xml, "      <Id>{}</Id>", start_text)?;
    writeln!(xml, r#"      <Lap StartTime="{}">"#, start_text)?;
    writeln!(
        xml,
        "        <TotalTimeSeconds>{}</TotalTimeSeconds>",
        number(summary, "run_time").unwrap_or(0.0)
    )?;
    writeln!(
        xml,
        "        <DistanceMeters>{}</DistanceMeters>",
        number(summary, "dis").unwrap_or(0.0)
    )?;
    writeln!(
        xml,
        "        <Calories>{}</Calories>",
        number(summary, "calorie").map_or(0, |c| c.round().clamp(0.0, 65535.0) as u16)
    )?;
    writeln!(xml, "        <Intensity>Active</Intensity>")?;
    writeln!(xml, "        <TriggerMethod>Manual</TriggerMethod>")?;

    if !trackpoints.is_empty() {
        writeln!(xml, "        <Track>")?;
        for (time, point) in trackpoints {
            writeln!(xml, "          <Trackpoint>")?;
            writeln!(xml, "            <Time>{}</Time>", format_time(*time))?;
            writeln!(xml, "            <Position>")?;
            writeln!(
                xml,
                "              <LatitudeDegrees>{:.8}</LatitudeDegrees>",
                point.latitude
            )?;
            writeln!(
                xml,
                "              <LongitudeDegrees>{:.8}</LongitudeDegrees>",
                point.longitude
            )?;
            writeln!(xml, "            </Position>")?;
            writeln!(xml, "          </Trackpoint>")?;
        }
        writeln!(xml, "        </Track>")?;
    }

    writeln!(xml, "      </Lap>")?;
    writeln!(xml, "    </Activity>")?;
    writeln!(xml, "  </Activities>")?;
    writeln!(xml, "</TrainingCenterDatabase>")
}

impl Exporter for TcxExporter {
    fn extension(&self) -> &'static str {
        "tcx"
    }

    fn export(&self, summary: &Summary, details: &Details, output_path: &Path) -> Result<()> {
        let xml = self.render(summary, details)?;
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, xml).map_err(|e| {
            Error::Export(format!("failed to write {}: {}", output_path.display(), e))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    offset_secs: i64,
    latitude: f64,
    longitude: f64,
}

fn decode_points(details: &Details) -> Result<Vec<Point>> {
    let positions = match details.get("longitude_latitude").and_then(Value::as_str) {
        Some(series) => decode_positions(series)?,
        None => return Ok(Vec::new()),
    };
    let offsets = match details.get("time").and_then(Value::as_str) {
        Some(series) => decode_offsets(series)?,
        None => return Ok(Vec::new()),
    };

    Ok(offsets
        .into_iter()
        .zip(positions)
        .map(|(offset_secs, (latitude, longitude))| Point {
            offset_secs,
            latitude,
            longitude,
        })
        .collect())
}

fn decode_offsets(series: &str) -> Result<Vec<i64>> {
    let mut total = 0i64;
    entries(series)
        .map(|entry| {
            total = accumulate(total, parse_delta(entry, "time")?, "time")?;
            Ok(total)
        })
        .collect()
}

fn decode_positions(series: &str) -> Result<Vec<(f64, f64)>> {
    const SERIES: &str = "longitude_latitude";
    let (mut lat, mut lon) = (0i64, 0i64);
    entries(series)
        .map(|entry| {
            let (dlat, dlon) = entry.split_once(',').ok_or_else(|| {
                Error::Export(format!("malformed longitude_latitude entry {:?}", entry))
            })?;
            lat = accumulate(lat, parse_delta(dlat, SERIES)?, SERIES)?;
            lon = accumulate(lon, parse_delta(dlon, SERIES)?, SERIES)?;
            Ok((lat as f64 / COORDINATE_SCALE, lon as f64 / COORDINATE_SCALE))
        })
        .collect()
}

fn entries(series: &str) -> impl Iterator<Item = &str> {
    series.split(';').map(str::trim).filter(|s| !s.is_empty())
}

fn accumulate(total: i64, delta: i64, series: &str) -> Result<i64> {
    total
        .checked_add(delta)
        .ok_or_else(|| Error::Export(format!("{} series overflows", series)))
}

fn point_time(start: DateTime<Utc>, offset_secs: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(offset_secs)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(|| Error::Export(format!("time offset {}s is out of range", offset_secs)))
}

fn parse_delta(s: &str, series: &str) -> Result<i64> {
    s.trim()
        .parse()
        .map_err(|e| Error::Export(format!("malformed {} value {:?}: {}", series, s, e)))
}

/// TCX sport for a Mi Fit activity type.
fn sport(summary: &Summary) -> &'static str {
    match number(summary, "type").map(|t| t as i64) {
        Some(1) | Some(8) => "Running",
        Some(9) | Some(10) => "Biking",
        _ => "Other",
    }
}

/// Numeric field that may be sent as a number or a string.
fn number(map: &Summary, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

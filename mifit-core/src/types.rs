//! Core domain types for mifit-export
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Track** | One recorded activity (run, walk, ride) on the Mi Fit servers |
//! | **Track id** | The track's start time in Unix-epoch seconds, used as its key |
//! | **Source** | The device/app channel a track was recorded through (`run.mifit.huami.com`) |
//! | **Listing** | The history endpoint payload: `{"summary": [...]}` plus paging fields |
//! | **Summary** | One listing entry, the short description of a track |
//! | **Details** | The full record of a track (GPS, timing, heart rate series) |
//! | **App token** | The session token returned by the Huami login endpoint |

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A listing entry as returned by the history endpoint.
pub type Summary = Map<String, Value>;

/// A full track record as returned by the detail endpoint.
pub type Details = Map<String, Value>;

// ============================================
// Track id
// ============================================

/// Numeric track identifier.
///
/// The API sends ids as decimal strings. They are ordered by value, so
/// `9 < 10` holds even though `"10" < "9"` as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(u64);

impl TrackId {
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Seconds since the Unix epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Read an id from a JSON value, accepting both `"123"` and `123`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64().map(Self),
            _ => None,
        }
    }

    /// Name of the per-track detail file in a cache directory.
    pub fn file_name(&self) -> String {
        format!("track_{}.json", self.0)
    }

    /// Inverse of [`TrackId::file_name`].
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.strip_prefix("track_")?
            .strip_suffix(".json")?
            .parse()
            .ok()
    }

    /// Start time of the track.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.0).ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| Error::InvalidTrack(format!("bad track id {:?}: {}", s, e)))
    }
}

// ============================================
// Listing
// ============================================

/// History endpoint payload, also the content of `activities.json`.
///
/// Fields other than `summary` (paging markers and the like) are kept
/// as-is so they survive a cache round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub summary: Vec<Summary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Listing {
    pub fn new(summary: Vec<Summary>) -> Self {
        Self {
            summary,
            extra: Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }
}

// ============================================
// App token
// ============================================

/// Session token for the Mi Fit API.
#[derive(Clone, PartialEq, Eq)]
pub struct AppToken(String);

impl AppToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AppToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppToken(***)")
    }
}

// ============================================
// Track range
// ============================================

/// Half-open selection window `[begin, end)` over track ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackRange {
    pub begin: Option<TrackId>,
    pub end: Option<TrackId>,
}

impl TrackRange {
    /// No bounds: every track.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(begin: Option<TrackId>, end: Option<TrackId>) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.begin.map_or(true, |b| id >= b) && self.end.map_or(true, |e| id < e)
    }

    /// True when no id can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        matches!((self.begin, self.end), (Some(b), Some(e)) if b >= e)
    }

    pub(crate) fn bounds(&self) -> (Bound<TrackId>, Bound<TrackId>) {
        let lower = self.begin.map_or(Bound::Unbounded, Bound::Included);
        let upper = self.end.map_or(Bound::Unbounded, Bound::Excluded);
        (lower, upper)
    }

    /// Parse `BEGIN..END` where each side is optional and is either a
    /// `YYYY-MM-DD` date (local midnight) or Unix seconds.
    ///
    /// A single value without `..` selects that whole day.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        match input.split_once("..") {
            Some((begin, end)) => Ok(Self {
                begin: parse_bound(begin)?,
                end: parse_bound(end)?,
            }),
            None => {
                let date = parse_date(input)?;
                let next = date
                    .succ_opt()
                    .ok_or_else(|| Error::Config(format!("date out of range: {}", input)))?;
                Ok(Self {
                    begin: Some(local_midnight(date)?),
                    end: Some(local_midnight(next)?),
                })
            }
        }
    }
}

fn parse_bound(s: &str) -> Result<Option<TrackId>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().map(Some);
    }
    local_midnight(parse_date(s)?).map(Some)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::Config(format!("invalid date {:?} (expected YYYY-MM-DD): {}", s, e)))
}

fn local_midnight(date: NaiveDate) -> Result<TrackId> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Config(format!("invalid date: {}", date)))?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::Config(format!("no local midnight on {}", date)))?;
    u64::try_from(local.timestamp())
        .map(TrackId)
        .map_err(|_| Error::Config(format!("date before 1970: {}", date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_track_id_numeric_order() {
        let mut ids: Vec<TrackId> = ["10", "9", "100"].iter().map(|s| s.parse().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec![TrackId::new(9), TrackId::new(10), TrackId::new(100)]);
    }

    #[test]
    fn test_track_id_from_value() {
        assert_eq!(TrackId::from_value(&json!("1561234567")), Some(TrackId::new(1561234567)));
        assert_eq!(TrackId::from_value(&json!(42)), Some(TrackId::new(42)));
        assert_eq!(TrackId::from_value(&json!("abc")), None);
        assert_eq!(TrackId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_track_id_file_name() {
        let id = TrackId::new(1561234567);
        assert_eq!(id.file_name(), "track_1561234567.json");
        assert_eq!(TrackId::from_file_name(&id.file_name()), Some(id));
        assert_eq!(TrackId::from_file_name("activities.json"), None);
        assert_eq!(TrackId::from_file_name("track_12.tcx"), None);
    }

    #[test]
    fn test_listing_keeps_extra_fields() {
        let listing: Listing = serde_json::from_value(json!({
            "summary": [{"trackid": "1", "source": "run.mifit.huami.com"}],
            "next": -1
        }))
        .unwrap();
        assert_eq!(listing.summary.len(), 1);
        assert_eq!(listing.extra.get("next"), Some(&json!(-1)));

        let back = serde_json::to_value(&listing).unwrap();
        assert_eq!(back["next"], json!(-1));
    }

    #[test]
    fn test_app_token_debug_is_redacted() {
        let token = AppToken::new("secret");
        assert_eq!(format!("{:?}", token), "AppToken(***)");
        assert_eq!(token.as_str(), "secret");
    }

    #[test]
    fn test_range_contains() {
        let range = TrackRange::new(Some(TrackId::new(15)), Some(TrackId::new(35)));
        assert!(!range.contains(TrackId::new(10)));
        assert!(range.contains(TrackId::new(15)));
        assert!(range.contains(TrackId::new(30)));
        assert!(!range.contains(TrackId::new(35)));
        assert!(TrackRange::all().contains(TrackId::new(0)));
    }

    #[test]
    fn test_range_is_empty() {
        assert!(TrackRange::new(Some(TrackId::new(5)), Some(TrackId::new(5))).is_empty());
        assert!(TrackRange::new(Some(TrackId::new(6)), Some(TrackId::new(5))).is_empty());
        assert!(!TrackRange::new(Some(TrackId::new(5)), None).is_empty());
    }

    #[test]
    fn test_range_parse_seconds() {
        let range = TrackRange::parse("100..200").unwrap();
        assert_eq!(range.begin, Some(TrackId::new(100)));
        assert_eq!(range.end, Some(TrackId::new(200)));

        let open = TrackRange::parse("..200").unwrap();
        assert_eq!(open.begin, None);
        assert_eq!(open.end, Some(TrackId::new(200)));
    }

    #[test]
    fn test_range_parse_dates() {
        let range = TrackRange::parse("2024-01-01..2024-02-01").unwrap();
        let begin = range.begin.unwrap().as_secs();
        let end = range.end.unwrap().as_secs();
        // January has 31 days; allow one DST hour either way
        let span = end - begin;
        assert!((31 * 86_400 - 3_600..=31 * 86_400 + 3_600).contains(&span));
    }

    #[test]
    fn test_range_parse_single_day() {
        let range = TrackRange::parse("2024-03-10").unwrap();
        let span = range.end.unwrap().as_secs() - range.begin.unwrap().as_secs();
        assert!((82_800..=90_000).contains(&span));
    }

    #[test]
    fn test_range_parse_invalid() {
        assert!(TrackRange::parse("yesterday..").is_err());
        assert!(TrackRange::parse("2024-13-01").is_err());
    }
}

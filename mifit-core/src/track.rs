//! Track entity and its lazy detail state

use crate::error::{Error, Result};
use crate::types::{Details, Summary, TrackId};

/// Where a track's details stand.
///
/// `Fetching` has no variant: a fetch is a single blocking call, so the
/// track is only observable before or after it.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    /// Never loaded from cache or fetched
    Pending,
    /// Last fetch attempt failed before any details were known
    Failed { reason: String },
    /// Details are known; `fetched` is true if they came from the API in this run
    Loaded { details: Details, fetched: bool },
}

/// Listing annotation for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    /// Details missing
    Uncomplete,
    /// Details fetched during this run
    Updated,
    /// Details already complete from the cache
    Cached,
}

impl TrackStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TrackStatus::Uncomplete => "(uncomplete)",
            TrackStatus::Updated => "(updated)",
            TrackStatus::Cached => "",
        }
    }
}

/// One remote activity.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,
    source: String,
    summary: Summary,
    state: DetailState,
}

impl Track {
    /// Build a track from a listing entry.
    ///
    /// The entry must carry a `trackid` and a `source`.
    pub fn from_summary(summary: Summary) -> Result<Self> {
        let id = summary
            .get("trackid")
            .and_then(TrackId::from_value)
            .ok_or_else(|| Error::InvalidTrack("summary entry without a numeric trackid".into()))?;
        let source = summary
            .get("source")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidTrack(format!("track {} has no source", id)))?
            .to_string();

        Ok(Self {
            id,
            source,
            summary,
            state: DetailState::Pending,
        })
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Details, if known.
    pub fn details(&self) -> Option<&Details> {
        match &self.state {
            DetailState::Loaded { details, .. } => Some(details),
            _ => None,
        }
    }

    /// True if details were fetched from the API during this run.
    pub fn fetched(&self) -> bool {
        matches!(self.state, DetailState::Loaded { fetched: true, .. })
    }

    /// Both summary and details are known and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.summary.is_empty() && self.details().is_some_and(|d| !d.is_empty())
    }

    pub fn status(&self) -> TrackStatus {
        if !self.is_complete() {
            TrackStatus::Uncomplete
        } else if self.fetched() {
            TrackStatus::Updated
        } else {
            TrackStatus::Cached
        }
    }

    /// Attach details read from the cache.
    pub fn set_cached_details(&mut self, details: Details) {
        self.state = DetailState::Loaded {
            details,
            fetched: false,
        };
    }

    /// Fetch details unless the track is already complete.
    ///
    /// `force` fetches regardless. Returns whether a fetch happened. On
    /// error the previous details, if any, are kept.
    pub fn ensure_details<F>(&mut self, fetch: F, force: bool) -> Result<bool>
    where
        F: FnOnce(TrackId, &str) -> Result<Details>,
    {
        if self.is_complete() && !force {
            return Ok(false);
        }

        match fetch(self.id, &self.source) {
            Ok(details) => {
                tracing::debug!(track = %self.id, fields = details.len(), "Fetched track details");
                self.state = DetailState::Loaded {
                    details,
                    fetched: true,
                };
                Ok(true)
            }
            Err(e) => {
                if self.details().is_none() {
                    self.state = DetailState::Failed {
                        reason: e.to_string(),
                    };
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn summary(id: &str) -> Summary {
        json!({"trackid": id, "source": "run.mifit.huami.com", "dis": "5012"})
            .as_object()
            .unwrap()
            .clone()
    }

    fn details(marker: &str) -> Details {
        json!({"trackid": 1, "longitude_latitude": marker})
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_from_summary() {
        let track = Track::from_summary(summary("1561234567")).unwrap();
        assert_eq!(track.id(), TrackId::new(1561234567));
        assert_eq!(track.source(), "run.mifit.huami.com");
        assert_eq!(track.state(), &DetailState::Pending);
        assert!(!track.is_complete());
    }

    #[test]
    fn test_from_summary_requires_id_and_source() {
        let no_id = json!({"source": "x"}).as_object().unwrap().clone();
        assert!(matches!(Track::from_summary(no_id), Err(Error::InvalidTrack(_))));

        let no_source = json!({"trackid": "1"}).as_object().unwrap().clone();
        assert!(matches!(Track::from_summary(no_source), Err(Error::InvalidTrack(_))));
    }

    #[test]
    fn test_is_complete_needs_non_empty_details() {
        let mut track = Track::from_summary(summary("1")).unwrap();
        track.set_cached_details(Details::new());
        assert!(!track.is_complete());

        track.set_cached_details(details("a"));
        assert!(track.is_complete());
        assert_eq!(track.status(), TrackStatus::Cached);
    }

    #[test]
    fn test_ensure_details_is_idempotent() {
        let mut track = Track::from_summary(summary("1")).unwrap();
        let calls = Cell::new(0);
        let fetch = |_: TrackId, _: &str| {
            calls.set(calls.get() + 1);
            Ok(details("a"))
        };

        assert!(track.ensure_details(fetch, false).unwrap());
        assert!(!track.ensure_details(fetch, false).unwrap());
        assert_eq!(calls.get(), 1);
        assert_eq!(track.details(), Some(&details("a")));
        assert_eq!(track.status(), TrackStatus::Updated);
    }

    #[test]
    fn test_ensure_details_passes_id_and_source() {
        let mut track = Track::from_summary(summary("77")).unwrap();
        track
            .ensure_details(
                |id, source| {
                    assert_eq!(id, TrackId::new(77));
                    assert_eq!(source, "run.mifit.huami.com");
                    Ok(details("a"))
                },
                false,
            )
            .unwrap();
    }

    #[test]
    fn test_ensure_details_skips_cached_track() {
        let mut track = Track::from_summary(summary("1")).unwrap();
        track.set_cached_details(details("cached"));

        let fetched = track
            .ensure_details(|_, _| panic!("complete track must not be fetched"), false)
            .unwrap();
        assert!(!fetched);
        assert!(!track.fetched());
    }

    #[test]
    fn test_forced_update_overwrites() {
        let mut track = Track::from_summary(summary("1")).unwrap();
        track.set_cached_details(details("old"));

        assert!(track.ensure_details(|_, _| Ok(details("new")), true).unwrap());
        assert_eq!(track.details(), Some(&details("new")));
        assert!(track.fetched());
    }

    #[test]
    fn test_failed_fetch_leaves_details_unset() {
        let mut track = Track::from_summary(summary("1")).unwrap();
        let err = track
            .ensure_details(|_, _| Err(Error::RemoteFetch("boom".into())), false)
            .unwrap_err();

        assert!(matches!(err, Error::RemoteFetch(_)));
        assert!(track.details().is_none());
        assert!(!track.fetched());
        assert!(matches!(track.state(), DetailState::Failed { .. }));
        assert_eq!(track.status(), TrackStatus::Uncomplete);
    }

    #[test]
    fn test_failed_forced_fetch_keeps_previous_details() {
        let mut track = Track::from_summary(summary("1")).unwrap();
        track.set_cached_details(details("old"));

        let result = track.ensure_details(|_, _| Err(Error::RemoteFetch("boom".into())), true);
        assert!(result.is_err());
        assert_eq!(track.details(), Some(&details("old")));
        assert!(!track.fetched());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(TrackStatus::Uncomplete.label(), "(uncomplete)");
        assert_eq!(TrackStatus::Updated.label(), "(updated)");
        assert_eq!(TrackStatus::Cached.label(), "");
    }
}

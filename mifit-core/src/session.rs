//! Sync session: token, track mapping, and the merge of cache and remote data
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  load_cache   ┌───────────┐  refresh_listing  ┌──────────┐
//! │  CacheDir   │ ────────────► │  Session  │ ◄──────────────── │ MifitApi │
//! │ (JSON files)│ ◄──────────── │  tracks   │ ◄──────────────── │          │
//! └─────────────┘  dump_cache   └───────────┘   update_tracks   └──────────┘
//!                                     │
//!                                     ▼ export_tracks
//!                               ┌───────────┐
//!                               │ Exporter  │
//!                               └───────────┘
//! ```
//!
//! Cached tracks are never replaced by listing entries: a listing only adds
//! ids that are not known yet. Details change only through
//! [`Session::update_tracks`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::auth::AuthorizationProvider;
use crate::cache::CacheDir;
use crate::client::MifitApi;
use crate::error::{Error, Result};
use crate::export::{self, Exporter};
use crate::track::Track;
use crate::types::{AppToken, Listing, TrackId, TrackRange};

/// Outcome of merging tracks into the session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Tracks that were not known before
    pub added: usize,
    /// Tracks already in the mapping, left untouched
    pub known: usize,
    /// Summary entries that could not be turned into tracks
    pub skipped: usize,
}

/// Outcome of [`Session::update_tracks`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Tracks in the selected range
    pub selected: usize,
    /// Tracks whose details were fetched
    pub fetched: usize,
    /// Tracks already complete, not fetched
    pub unchanged: usize,
}

/// Outcome of [`Session::export_tracks`].
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Files written
    pub exported: Vec<PathBuf>,
    /// Selected tracks without details
    pub incomplete: Vec<TrackId>,
}

/// In-memory state of one sync run.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<AppToken>,
    /// Listing fields other than `summary` from the latest listing
    listing_extra: Map<String, Value>,
    tracks: BTreeMap<TrackId, Track>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Merge the snapshot stored in `dir`.
    ///
    /// Tracks already in the session win over cached ones.
    pub fn load_cache(&mut self, dir: &Path) -> Result<MergeResult> {
        let snapshot = CacheDir::new(dir).load()?;

        if self.listing_extra.is_empty() {
            self.listing_extra = snapshot.listing.extra;
        }
        let mut result = self.merge(snapshot.tracks.into_values());
        result.skipped = snapshot
            .listing
            .summary
            .len()
            .saturating_sub(result.added + result.known);

        tracing::info!(
            dir = %dir.display(),
            added = result.added,
            known = result.known,
            "Merged cache into session"
        );
        Ok(result)
    }

    /// Exchange an authorization code for an app token.
    pub fn login<A>(&mut self, api: &A, code: &str) -> Result<()>
    where
        A: MifitApi + ?Sized,
    {
        let token = api.exchange_code(code)?;
        self.token = Some(token);
        tracing::info!("Logged in to Mi Fit");
        Ok(())
    }

    /// Obtain an authorization code from `provider`, then log in with it.
    pub fn authenticate<P, A>(
        &mut self,
        provider: &P,
        api: &A,
        client_id: &str,
        reuse_session: bool,
    ) -> Result<()>
    where
        P: AuthorizationProvider + ?Sized,
        A: MifitApi + ?Sized,
    {
        let code = provider.obtain_code(client_id, reuse_session)?;
        self.login(api, &code)
    }

    /// Fetch the remote listing and add tracks not known yet.
    pub fn refresh_listing<A>(&mut self, api: &A) -> Result<MergeResult>
    where
        A: MifitApi + ?Sized,
    {
        let token = self.token.as_ref().ok_or_else(not_logged_in)?;
        let listing = api.fetch_listing(token)?;
        let Listing { summary, extra } = listing;

        self.listing_extra = extra;

        let mut skipped = 0;
        let tracks: Vec<Track> = summary
            .into_iter()
            .filter_map(|entry| match Track::from_summary(entry) {
                Ok(track) => Some(track),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping listing entry");
                    skipped += 1;
                    None
                }
            })
            .collect();

        let mut result = self.merge(tracks);
        result.skipped = skipped;

        tracing::info!(
            added = result.added,
            known = result.known,
            skipped = result.skipped,
            "Refreshed listing"
        );
        Ok(result)
    }

    /// Fetch details for the selected tracks that need them.
    ///
    /// Stops at the first failure; tracks updated before it keep their new
    /// details.
    pub fn update_tracks<A>(&mut self, api: &A, force: bool, range: TrackRange) -> Result<UpdateReport>
    where
        A: MifitApi + ?Sized,
    {
        self.update_tracks_with_progress(api, force, range, |_, _, _| {})
    }

    /// Like [`Session::update_tracks`], calling `progress(done, total, id)`
    /// after each track.
    pub fn update_tracks_with_progress<A, F>(
        &mut self,
        api: &A,
        force: bool,
        range: TrackRange,
        mut progress: F,
    ) -> Result<UpdateReport>
    where
        A: MifitApi + ?Sized,
        F: FnMut(usize, usize, TrackId),
    {
        let token = self.token.as_ref().ok_or_else(not_logged_in)?;
        let ids: Vec<TrackId> = self.get_tracks(range).iter().map(|t| t.id()).collect();

        let mut report = UpdateReport {
            selected: ids.len(),
            ..Default::default()
        };

        for (index, id) in ids.iter().enumerate() {
            let Some(track) = self.tracks.get_mut(id) else {
                continue;
            };

            let fetched = track
                .ensure_details(|id, source| api.fetch_detail(token, id, source), force)
                .map_err(|e| {
                    tracing::warn!(track = %id, error = %e, "Track update failed");
                    e
                })?;

            if fetched {
                report.fetched += 1;
            } else {
                report.unchanged += 1;
            }
            progress(index + 1, report.selected, *id);
        }

        tracing::info!(
            selected = report.selected,
            fetched = report.fetched,
            unchanged = report.unchanged,
            force,
            "Updated tracks"
        );
        Ok(report)
    }

    /// Tracks in `range`, ascending by id.
    pub fn get_tracks(&self, range: TrackRange) -> Vec<&Track> {
        if range.is_empty() {
            return Vec::new();
        }
        self.tracks
            .range(range.bounds())
            .map(|(_, track)| track)
            .collect()
    }

    /// The listing to persist: every known summary in id order.
    ///
    /// Built from the mapping rather than the last fetched listing so that
    /// tracks only present in an older cache survive.
    pub fn listing(&self) -> Listing {
        Listing {
            summary: self.tracks.values().map(|t| t.summary().clone()).collect(),
            extra: self.listing_extra.clone(),
        }
    }

    /// Write the session to `dir`. Returns the number of detail files written.
    pub fn dump_cache(&self, dir: &Path) -> Result<usize> {
        CacheDir::new(dir).dump(&self.listing(), self.tracks.values())
    }

    /// Export every complete track in `range` to `out_dir`.
    pub fn export_tracks<E>(&self, exporter: &E, out_dir: &Path, range: TrackRange) -> Result<ExportReport>
    where
        E: Exporter + ?Sized,
    {
        let mut report = ExportReport::default();

        for track in self.get_tracks(range) {
            let details = match track.details() {
                Some(details) if track.is_complete() => details,
                _ => {
                    tracing::debug!(track = %track.id(), "Skipping incomplete track");
                    report.incomplete.push(track.id());
                    continue;
                }
            };

            let path = export::output_path(out_dir, track.id(), exporter.extension());
            exporter.export(track.summary(), details, &path)?;
            tracing::debug!(track = %track.id(), path = %path.display(), "Exported track");
            report.exported.push(path);
        }

        tracing::info!(
            exported = report.exported.len(),
            incomplete = report.incomplete.len(),
            "Exported tracks"
        );
        Ok(report)
    }

    fn merge<I>(&mut self, tracks: I) -> MergeResult
    where
        I: IntoIterator<Item = Track>,
    {
        let mut result = MergeResult::default();
        for track in tracks {
            if self.tracks.contains_key(&track.id()) {
                result.known += 1;
            } else {
                self.tracks.insert(track.id(), track);
                result.added += 1;
            }
        }
        result
    }
}

fn not_logged_in() -> Error {
    Error::RemoteFetch("no app token, log in first".to_string())
}

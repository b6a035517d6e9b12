//! On-disk cache of listing and track details
//!
//! One directory holds one snapshot:
//!
//! ```text
//! cache/
//! ├── activities.json          # listing: {"summary": [...], ...}
//! ├── track_1561234567.json    # details of track 1561234567
//! └── track_1561300000.json
//! ```
//!
//! Snapshots are read and written wholesale. Tracks without details get no
//! file. A crash during [`CacheDir::dump`] can leave some files from the
//! previous snapshot next to new ones.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::track::Track;
use crate::types::{Details, Listing, TrackId};

/// Name of the listing file inside a cache directory
pub const LISTING_FILE: &str = "activities.json";

/// Tracks and listing read back from a cache directory.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    pub listing: Listing,
    pub tracks: BTreeMap<TrackId, Track>,
}

impl CacheSnapshot {
    /// Number of tracks with details.
    pub fn complete_count(&self) -> usize {
        self.tracks.values().filter(|t| t.is_complete()).count()
    }
}

/// A cache directory.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn listing_path(&self) -> PathBuf {
        self.root.join(LISTING_FILE)
    }

    pub fn track_path(&self, id: TrackId) -> PathBuf {
        self.root.join(id.file_name())
    }

    /// Read the snapshot.
    ///
    /// A directory without a listing file is an empty cache.
    pub fn load(&self) -> Result<CacheSnapshot> {
        let listing_path = self.listing_path();
        if !listing_path.is_file() {
            tracing::info!(dir = %self.root.display(), "No listing in cache directory");
            return Ok(CacheSnapshot::default());
        }

        let listing: Listing = read_json(&listing_path)?;

        let mut tracks = BTreeMap::new();
        for summary in &listing.summary {
            match Track::from_summary(summary.clone()) {
                Ok(track) => {
                    tracks.insert(track.id(), track);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping cached summary entry"),
            }
        }

        for (id, path) in self.detail_files()? {
            match tracks.get_mut(&id) {
                Some(track) => {
                    let details: Details = read_json(&path)?;
                    track.set_cached_details(details);
                }
                None => {
                    tracing::debug!(path = %path.display(), "Ignoring detail file not in listing");
                }
            }
        }

        let snapshot = CacheSnapshot { listing, tracks };
        tracing::info!(
            dir = %self.root.display(),
            tracks = snapshot.tracks.len(),
            complete = snapshot.complete_count(),
            "Loaded cache"
        );
        Ok(snapshot)
    }

    /// Write the listing, then one file per track with details.
    pub fn dump<'a, I>(&self, listing: &Listing, tracks: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Track>,
    {
        fs::create_dir_all(&self.root).map_err(|e| Error::cache_io(&self.root, e))?;

        write_json(&self.listing_path(), listing)?;

        let mut written = 0;
        for track in tracks {
            if let Some(details) = track.details().filter(|d| !d.is_empty()) {
                write_json(&self.track_path(track.id()), details)?;
                written += 1;
            }
        }

        tracing::info!(
            dir = %self.root.display(),
            summaries = listing.summary.len(),
            details = written,
            "Dumped cache"
        );
        Ok(written)
    }

    /// Detail files present in the directory, keyed by track id.
    fn detail_files(&self) -> Result<Vec<(TrackId, PathBuf)>> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = Path::new(&root).join("track_*.json");
        let paths = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| Error::Config(format!("invalid cache path {}: {}", self.root.display(), e)))?;

        let mut files = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::cache_io(path, e.into_error())
            })?;
            let id = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(TrackId::from_file_name);
            if let Some(id) = id {
                files.push((id, path));
            }
        }
        Ok(files)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| Error::cache_io(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::CacheFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string(value)?;
    fs::write(path, content).map_err(|e| Error::cache_io(path, e))
}

//! Track export
//!
//! An [`Exporter`] turns one complete track (summary + details) into a file.
//! [`TcxExporter`] is the built-in Training Center XML writer.

mod tcx;

pub use tcx::TcxExporter;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{Details, Summary, TrackId};

/// Writes one track to an output file.
pub trait Exporter {
    /// File extension of the produced files, without the dot.
    fn extension(&self) -> &'static str;

    fn export(&self, summary: &Summary, details: &Details, output_path: &Path) -> Result<()>;
}

/// `<dir>/track_<id>.<ext>`
pub fn output_path(dir: &Path, id: TrackId, extension: &str) -> PathBuf {
    dir.join(format!("track_{}.{}", id, extension))
}

//! # mifit-core
//!
//! Core library for mifit-export - a Mi Fit track downloader and exporter.
//!
//! This library provides:
//! - The [`Track`] entity with lazily fetched details
//! - A JSON file cache of listing and track details ([`cache`])
//! - The [`Session`] that merges cache and remote data and selects tracks by date
//! - Mi Fit API client, `token-cli` authorization and TCX export
//! - Configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use mifit_core::auth::TokenCli;
//! use mifit_core::client::BlockingMifitClient;
//! use mifit_core::{Config, Session, TrackRange};
//!
//! let config = Config::load().expect("failed to load config");
//! let api = BlockingMifitClient::new(config.api.clone()).expect("failed to build client");
//!
//! let mut session = Session::new();
//! session.load_cache(Path::new("cache")).expect("failed to load cache");
//! session
//!     .authenticate(&TokenCli::new(&config.auth), &api, &config.auth.client_id, false)
//!     .expect("failed to log in");
//! session.refresh_listing(&api).expect("failed to fetch listing");
//! session.update_tracks(&api, false, TrackRange::all()).expect("failed to update tracks");
//! session.dump_cache(Path::new("cache")).expect("failed to write cache");
//! ```

// Re-export commonly used items at the crate root
pub use cache::{CacheDir, CacheSnapshot};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{ExportReport, MergeResult, Session, UpdateReport};
pub use track::{DetailState, Track, TrackStatus};
pub use types::*;

// Public modules
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod session;
pub mod track;
pub mod types;

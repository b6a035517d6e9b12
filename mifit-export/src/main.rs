//! mifit-export - download Mi Fit tracks and export them to TCX
//!
//! Steps run in this order, each enabled by its flag:
//! 1. `--cache-in`: load a previously dumped cache
//! 2. `--update`: log in, fetch the listing, fetch missing track details
//! 3. `--cache-out`: write the cache
//! 4. `--list`: print tracks with their status
//! 5. `--tcx`: export complete tracks
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/mifit-export/mifit-export.log (~/.local/state/mifit-export/mifit-export.log)
//! - Config: $XDG_CONFIG_HOME/mifit-export/config.toml (~/.config/mifit-export/config.toml)

mod track_row;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use mifit_core::auth::TokenCli;
use mifit_core::client::BlockingMifitClient;
use mifit_core::export::TcxExporter;
use mifit_core::{Config, Session, TrackRange};

use crate::track_row::format_track_row;

#[derive(Parser)]
#[command(name = "mifit-export")]
#[command(about = "Download Mi Fit tracks into a local cache and export them to TCX")]
#[command(version)]
struct Args {
    /// Input cache directory
    #[arg(long = "cache-in", visible_alias = "ci", value_name = "DIR")]
    cache_in: Option<PathBuf>,

    /// Output cache directory
    #[arg(long = "cache-out", visible_alias = "co", value_name = "DIR")]
    cache_out: Option<PathBuf>,

    /// Load latest activities from Mi Fit servers
    #[arg(short, long)]
    update: bool,

    /// A token-cli session is already running
    #[arg(short = 's', long)]
    has_session: bool,

    /// Authorization code to log in with instead of running token-cli
    #[arg(short, long, value_name = "CODE")]
    code: Option<String>,

    /// List the known tracks
    #[arg(short, long)]
    list: bool,

    /// Fetch track details even if already cached
    #[arg(short, long)]
    force: bool,

    /// Restrict to a date range: BEGIN..END (YYYY-MM-DD or Unix seconds, END excluded)
    #[arg(short, long, value_name = "RANGE", value_parser = parse_range)]
    range: Option<TrackRange>,

    /// Export tracks to TCX
    #[arg(short = 'x', long)]
    tcx: bool,

    /// Output directory for TCX tracks
    #[arg(short, long = "output-tcx-dir", value_name = "DIR", default_value = ".")]
    output_tcx_dir: PathBuf,

    /// Config file (default: $XDG_CONFIG_HOME/mifit-export/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_range(s: &str) -> std::result::Result<TrackRange, String> {
    TrackRange::parse(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = match args.verbose {
        0 => mifit_core::logging::init(&config.logging),
        1 => mifit_core::logging::init_with_level(&config.logging, "debug"),
        _ => mifit_core::logging::init_with_level(&config.logging, "trace"),
    }
    .context("failed to initialize logging")?;

    tracing::info!("mifit-export starting");

    let range = args.range.unwrap_or_default();

    // Without explicit directories, the configured cache is both input and output
    let cache_in = args.cache_in.clone().or_else(|| config.cache.dir.clone());
    let cache_out = args.cache_out.clone().or_else(|| config.cache.dir.clone());

    let mut session = Session::new();

    if let Some(dir) = &cache_in {
        let merged = session
            .load_cache(dir)
            .with_context(|| format!("failed to load cache from {}", dir.display()))?;
        println!("Loaded {} track(s) from {}", merged.added, dir.display());
    }

    let update_result = if args.update {
        run_update(&mut session, &config, &args, range)
    } else {
        Ok(())
    };

    // Whatever was fetched before a failed update is still worth keeping
    if let Some(dir) = &cache_out {
        let written = session
            .dump_cache(dir)
            .with_context(|| format!("failed to write cache to {}", dir.display()))?;
        println!(
            "Saved {} track(s), {} with details, to {}",
            session.len(),
            written,
            dir.display()
        );
    }

    update_result?;

    if args.list {
        if session.is_empty() {
            println!("No tracks known. Use --cache-in or --update to load some.");
        }
        for (index, track) in session.get_tracks(range).iter().enumerate() {
            println!("{}", format_track_row(index, track));
        }
    }

    if args.tcx {
        let report = session
            .export_tracks(&TcxExporter::new(), &args.output_tcx_dir, range)
            .context("TCX export failed")?;
        for path in &report.exported {
            println!("Exported {}", path.display());
        }
        for id in &report.incomplete {
            println!("Skipped track_{} (uncomplete)", id);
        }
    }

    if !(args.update || args.list || args.tcx || cache_out.is_some()) {
        println!("Nothing to do. See --help for the available actions.");
    }

    tracing::info!("mifit-export complete");
    Ok(())
}

/// Log in, refresh the listing, and fetch missing details with a progress bar
fn run_update(session: &mut Session, config: &Config, args: &Args, range: TrackRange) -> Result<()> {
    let api = BlockingMifitClient::new(config.api.clone()).context("failed to create API client")?;

    match &args.code {
        Some(code) => session.login(&api, code),
        None => session.authenticate(
            &TokenCli::new(&config.auth),
            &api,
            &config.auth.client_id,
            args.has_session,
        ),
    }
    .context("failed to log in to Mi Fit")?;

    let merged = session
        .refresh_listing(&api)
        .context("failed to fetch activity listing")?;
    println!(
        "Listing: {} new track(s), {} already known",
        merged.added, merged.known
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let result = session.update_tracks_with_progress(&api, args.force, range, |done, total, id| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
        pb.set_message(format!("track_{}", id));
    });

    pb.finish_and_clear();

    let report = result.context("failed to update tracks")?;
    println!(
        "Updated {} of {} selected track(s), {} already complete",
        report.fetched, report.selected, report.unchanged
    );
    Ok(())
}

//! post-ocr - Social post image OCR for events aggregation
//!
//! Pulls post images from Instagram (via BoilerLink organization listings),
//! runs text detection over them and renders annotated overlays so the
//! extracted event text can be checked by eye.

mod config;
mod http;
mod sources;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::AppConfig;
use crate::sources::{instagram, BoilerLinkClient, InstagramClient};
use crate::vision::{
    decode, Annotator, Detection, ImageFetcher, Processed, ResultPresenter, StaticDetector,
    TesseractDetector, TextDetector,
};

/// Longest accepted `--hours` window (one year)
const MAX_WINDOW_HOURS: i64 = 8760;

/// post-ocr - OCR and annotation for social post images
#[derive(Parser, Debug)]
#[command(name = "post-ocr")]
#[command(about = "Extract event text from social media post images")]
struct Args {
    /// Configuration file (defaults to config.toml in the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run OCR on an image and save an annotated copy
    Ocr {
        /// Image URL
        #[arg(required_unless_present = "file")]
        url: Option<String>,

        /// Read a local image instead of downloading one
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// Skip detections below this confidence (0.0 - 1.0)
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Where to save the annotated image (temporary .png when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print detections as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Do not open the annotated image in a viewer
        #[arg(long)]
        no_viewer: bool,

        /// Replay detections from a JSON file instead of running tesseract
        #[arg(long)]
        detections: Option<PathBuf>,
    },

    /// List an Instagram account's recent posts as JSON
    RecentPosts {
        /// Instagram username
        username: String,

        /// Look-back window in hours
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_HOURS))]
        hours: Option<i64>,
    },

    /// Resolve Instagram links for BoilerLink organizations as JSON
    OrgInstagram {
        /// Number of organizations to fetch
        #[arg(long, default_value = "100")]
        top: u32,
    },

    /// Write a default configuration file (to --config or the user config dir)
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Command::InitConfig { force } = args.command {
        return run_init_config(args.config.as_deref(), force);
    }

    let config = load_or_default_config(args.config.as_deref())?;

    match args.command {
        Command::Ocr {
            url,
            file,
            min_confidence,
            output,
            json,
            no_viewer,
            detections,
        } => run_ocr(
            &config,
            OcrRequest {
                url,
                file,
                min_confidence,
                output,
                json,
                no_viewer,
                detections,
            },
        ),
        Command::RecentPosts { username, hours } => run_recent_posts(&config, &username, hours),
        Command::OrgInstagram { top } => run_org_instagram(&config, top),
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Write the default configuration to `explicit` or the user config dir
fn run_init_config(explicit: Option<&Path>, force: bool) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => storage::get_config_dir()?.join("config.toml"),
    };
    write_default_config(&path, force)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists (pass --force to overwrite)", path);
    }
    config::save_config(&AppConfig::default(), path)
        .with_context(|| format!("Failed to write config file {:?}", path))?;
    info!("Saved default configuration to {:?}", path);
    Ok(())
}

/// Load configuration from `explicit`, else the user config dir, else defaults
fn load_or_default_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            let config = config::load_config(&config_path)?;
            info!("Loaded configuration from {:?}", config_path);
            return Ok(config);
        }
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}

/// Arguments of the `ocr` subcommand
struct OcrRequest {
    url: Option<String>,
    file: Option<PathBuf>,
    min_confidence: Option<f64>,
    output: Option<PathBuf>,
    json: bool,
    no_viewer: bool,
    detections: Option<PathBuf>,
}

fn run_ocr(config: &AppConfig, request: OcrRequest) -> Result<()> {
    let detector: Box<dyn TextDetector> = match &request.detections {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read detections {:?}", path))?;
            let saved: Vec<Detection> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse detections {:?}", path))?;
            info!("Replaying {} detections from {:?}", saved.len(), path);
            Box::new(StaticDetector::from_detections(&saved))
        }
        None => Box::new(TesseractDetector::new(&config.detector)),
    };

    let mut output = config.output.clone();
    output.open_viewer &= !request.no_viewer;

    let presenter = ResultPresenter::new(
        ImageFetcher::new(&config.fetch)?,
        &*detector,
        Annotator::new(config.annotation.clone()),
        output,
    );

    let min_confidence = request
        .min_confidence
        .unwrap_or(config.annotation.min_confidence);
    let output_path = request.output.as_deref();

    let processed: Processed = match (&request.url, &request.file) {
        (_, Some(file)) => {
            let bytes = std::fs::read(file)
                .with_context(|| format!("Failed to read image {:?}", file))?;
            presenter.process_image(&decode(&bytes)?, min_confidence, output_path)?
        }
        (Some(url), None) => presenter.process(url, min_confidence, output_path)?,
        (None, None) => anyhow::bail!("Either an image URL or --file is required"),
    };

    if request.json {
        println!("{}", serde_json::to_string_pretty(&processed.detections)?);
        info!("Annotated image saved to {}", processed.path.display());
    } else {
        println!("Annotated image saved to {}", processed.path.display());
    }

    Ok(())
}

fn run_recent_posts(config: &AppConfig, username: &str, hours: Option<i64>) -> Result<()> {
    let client = InstagramClient::new(&config.sources)?;
    let profile = client
        .profile(username)
        .with_context(|| format!("Failed to fetch Instagram user {}", username))?;

    let window_hours = hours.unwrap_or(config.sources.recent_window_hours);
    let window_secs = window_hours
        .checked_mul(3600)
        .with_context(|| format!("Window of {} hours is too large", window_hours))?;
    let now = chrono::Utc::now().timestamp();
    let posts = instagram::recent_posts(&profile, now, window_secs);

    info!(
        "{} of {} posts from {} are within {}h",
        posts.len(),
        profile.images.len(),
        username,
        window_hours
    );
    if let Some(url) = instagram::most_recent_post_url(&profile) {
        info!("Most recent post: {}", url);
    }

    println!("{}", serde_json::to_string_pretty(&posts)?);
    Ok(())
}

fn run_org_instagram(config: &AppConfig, top: u32) -> Result<()> {
    let client = BoilerLinkClient::new(&config.sources)?;
    let orgs = client.fetch_organizations(top)?;
    let mapped = client.instagram_for_orgs(&orgs)?;

    println!("{}", serde_json::to_string_pretty(&mapped)?);
    Ok(())
}

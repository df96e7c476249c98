//! NASA POWER radiation report pipeline.
//!
//! One-shot run: fetch each configured radiation variable for a region
//! and date range, reduce to regional temporal means, render map and CSV
//! artifacts, and print a success/failure summary. Exit status is 0 only
//! when every variable completed.

mod config;
mod orchestrator;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use power_client::{CachedSource, DataSource, DiskCache, PowerArchiveClient, PowerClientConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::PipelineConfig;

/// In-memory cube cache capacity; fetched cubes are modest, one per
/// (variable, range, region) key.
const MEMORY_CACHE_CAPACITY: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(about = "NASA POWER regional radiation maps")]
struct Args {
    /// YAML config file; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated parameter ids (e.g. ALLSKY_SFC_LW_DWN)
    #[arg(long, value_delimiter = ',')]
    variables: Vec<String>,

    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Region of interest: min_lon,min_lat,max_lon,max_lat
    #[arg(long)]
    bbox: Option<String>,

    /// Directory for rendered artifacts
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Default colormap (viridis, magma, plasma, grayscale)
    #[arg(long)]
    colormap: Option<String>,

    /// Also render the first two variables side by side
    #[arg(long)]
    combined: bool,

    /// Disk cache directory for fetched data
    #[arg(long, env = "POWER_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Disk cache freshness bound in seconds
    #[arg(long)]
    cache_ttl_secs: Option<u64>,

    /// Maximum variables processed concurrently
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => {
            let start = args.start.context("--start is required without --config")?;
            let end = args.end.context("--end is required without --config")?;
            let bounding_box = args
                .bbox
                .clone()
                .context("--bbox is required without --config")?;
            if args.variables.is_empty() {
                anyhow::bail!("--variables is required without --config");
            }

            PipelineConfig {
                variables: args.variables.clone(),
                start,
                end,
                bounding_box,
                output_directory: PathBuf::from("data/output"),
                colormap: "viridis".to_string(),
                colormap_overrides: Default::default(),
                scale_min: 0.0,
                scale_max: 500.0,
                pixel_scale: 8,
                max_concurrent: 4,
                combined: false,
                cache_dir: None,
                cache_ttl_secs: None,
            }
        }
    };

    // Flags override file values
    if !args.variables.is_empty() {
        config.variables = args.variables.clone();
    }
    if let Some(start) = args.start {
        config.start = start;
    }
    if let Some(end) = args.end {
        config.end = end;
    }
    if let Some(bbox) = &args.bbox {
        config.bounding_box = bbox.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_directory = dir.clone();
    }
    if let Some(colormap) = &args.colormap {
        config.colormap = colormap.clone();
    }
    if args.combined {
        config.combined = true;
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(ttl) = args.cache_ttl_secs {
        config.cache_ttl_secs = Some(ttl);
    }
    if let Some(workers) = args.max_concurrent {
        config.max_concurrent = workers;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = build_config(&args)?;
    info!(
        variables = config.variables.len(),
        output = %config.output_directory.display(),
        "Starting radiation pipeline"
    );

    let client = PowerArchiveClient::new(PowerClientConfig::default())?;
    let disk = match &config.cache_dir {
        Some(dir) => Some(DiskCache::new(
            dir,
            config.cache_ttl_secs.map(Duration::from_secs),
        )?),
        None => None,
    };
    let source: Arc<dyn DataSource> =
        Arc::new(CachedSource::new(client, MEMORY_CACHE_CAPACITY, disk));

    let report = orchestrator::run(&config, source).await?;
    print!("{}", report.summary());

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

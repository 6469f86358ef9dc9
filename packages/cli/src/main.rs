#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Command-line runner for the neighborhood safety trend engine.
//!
//! Reads a neighborhood `GeoJSON` `FeatureCollection` and an incident
//! collection from disk, computes trends for one or all time windows, and
//! prints the resulting mapping as JSON on stdout. Logging goes to stderr
//! and is controlled by `RUST_LOG`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use safety_trends_analytics::{ReferenceTime, TrendEngine, TrendError, TrendsConfig};
use safety_trends_analytics_models::{CategorySelection, TimeWindow, TrendRecord};
use serde_json::Value;

/// Settings used when `--config` is not given.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Parser)]
#[command(name = "safety_trends", about = "Neighborhood crime trend aggregation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute trends for a single time window
    Compute {
        /// Time window: `6months`, `1year`, or `2years`
        #[arg(long)]
        window: TimeWindow,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Compute every time window in sequence and print the merged records
    AllWindows {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Path to the neighborhood `GeoJSON` `FeatureCollection`
    #[arg(long)]
    neighborhoods: PathBuf,
    /// Path to the incident JSON collection
    #[arg(long)]
    incidents: PathBuf,
    /// Category token to keep (repeatable). "Violent Crime" selects every
    /// non-property offense. All incidents are kept when omitted.
    #[arg(long = "category")]
    categories: Vec<String>,
    /// TOML settings file (`[engine]`, `[neighborhoods]`, `[incidents]`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Grid cell edge in degrees, overriding the config file
    #[arg(long)]
    grid_size: Option<f64>,
    /// Last calendar year of the `1year` and `2years` windows
    #[arg(long)]
    analysis_year: Option<i32>,
    /// RFC 3339 instant the `6months` window ends at (defaults to now)
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

/// Decoded inputs plus everything needed to run the engine over them.
struct Run {
    config: TrendsConfig,
    neighborhoods: Value,
    incidents: Value,
    selection: CategorySelection,
    reference: ReferenceTime,
}

impl Run {
    fn prepare(input: &InputArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_config(input)?;
        let reference = input.now.map_or_else(
            || ReferenceTime::current(config.engine.analysis_year),
            |now| ReferenceTime::new(now, config.engine.analysis_year),
        );

        Ok(Self {
            neighborhoods: read_json(&input.neighborhoods)?,
            incidents: read_json(&input.incidents)?,
            selection: input.categories.iter().cloned().collect(),
            reference,
            config,
        })
    }

    fn compute(
        &self,
        engine: &mut TrendEngine,
        window: TimeWindow,
    ) -> Result<BTreeMap<String, TrendRecord>, TrendError> {
        engine.compute_trends_from_json(
            &self.neighborhoods,
            &self.incidents,
            &self.config.neighborhoods,
            &self.config.incidents,
            window,
            &self.selection,
            self.reference,
        )
    }
}

fn load_config(input: &InputArgs) -> Result<TrendsConfig, Box<dyn std::error::Error>> {
    let mut config = match &input.config {
        Some(path) => TrendsConfig::load(path)?,
        None => TrendsConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    if let Some(grid_size) = input.grid_size {
        config.engine.grid_size = grid_size;
    }
    if let Some(analysis_year) = input.analysis_year {
        config.engine.analysis_year = analysis_year;
    }
    config.engine.validate()?;
    Ok(config)
}

fn read_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&contents)?;
    log::debug!("Read {}", path.display());
    Ok(value)
}

fn print_json(trends: &BTreeMap<String, TrendRecord>, compact: bool) -> serde_json::Result<()> {
    let json = if compact {
        serde_json::to_string(trends)?
    } else {
        serde_json::to_string_pretty(trends)?
    };
    println!("{json}");
    Ok(())
}

fn log_diagnostics(engine: &TrendEngine) {
    match serde_json::to_string(engine.diagnostics()) {
        Ok(json) => log::info!("Diagnostics: {json}"),
        Err(e) => log::warn!("Failed to serialize diagnostics: {e}"),
    }
}

/// Prints an empty mapping and passes the error on, so a malformed
/// dataset never produces partial output.
fn empty_on_error<T>(result: Result<T, TrendError>) -> Result<T, Box<dyn std::error::Error>> {
    result.map_err(|e| {
        log::error!("{e}");
        println!("{{}}");
        e.into()
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Compute { window, input } => {
            let run = Run::prepare(&input)?;
            let mut engine = TrendEngine::new(run.config.engine)?;

            let trends = empty_on_error(run.compute(&mut engine, window))?;
            log_diagnostics(&engine);
            print_json(&trends, input.compact)?;
        }
        Commands::AllWindows { input } => {
            let run = Run::prepare(&input)?;
            let mut engine = TrendEngine::new(run.config.engine)?;

            let mut trends = BTreeMap::new();
            for window in TimeWindow::all() {
                log::info!("Computing {window} trends...");
                trends = empty_on_error(run.compute(&mut engine, *window))?;
                log_diagnostics(&engine);
            }
            print_json(&trends, input.compact)?;
        }
    }

    Ok(())
}

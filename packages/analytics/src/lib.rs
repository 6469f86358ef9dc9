#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Neighborhood safety trend engine.
//!
//! Classifies incidents into "recent" and "previous" periods for a
//! [`TimeWindow`](safety_trends_analytics_models::TimeWindow), bins each
//! period into its own grid index, and counts the incidents inside every
//! neighborhood boundary. Results are merged per neighborhood across
//! windows and memoized in a [`ResultCache`] owned by the [`TrendEngine`].
//!
//! Everything here is synchronous, in-memory, and deterministic for a
//! given input ordering and reference time.

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;

pub use aggregate::{change_percent, trends_for_window};
pub use cache::ResultCache;
pub use classify::{ReferenceTime, classify_period, is_category_selected, parse_timestamp};
pub use config::{ConfigError, EngineConfig, TrendsConfig};
pub use engine::TrendEngine;

use safety_trends_ingest::IngestError;
use safety_trends_spatial::SpatialError;
use thiserror::Error;

/// Errors that abort a whole trend computation.
#[derive(Debug, Error)]
pub enum TrendError {
    /// A point or neighborhood collection was structurally invalid.
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] IngestError),

    /// A spatial structure could not be built.
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// The engine configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

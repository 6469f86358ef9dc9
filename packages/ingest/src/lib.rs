#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Normalization of already-decoded datasets into typed engine inputs.
//!
//! Neighborhood boundaries arrive as a `GeoJSON` `FeatureCollection` and
//! incidents as a JSON collection of flat records (or point features).
//! Both are mapped through configurable field names into
//! [`Boundary`](safety_trends_boundary_models::Boundary) and
//! [`PointRecord`](safety_trends_incident_models::PointRecord) values.
//!
//! A collection missing its record array is rejected outright; a single
//! bad record inside a valid collection is only tallied and skipped.

pub mod incidents;
pub mod neighborhoods;

pub use incidents::parse_incidents;
pub use neighborhoods::{parse_neighborhoods, slugify};

use thiserror::Error;

/// Errors that reject an entire collection.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The collection is missing its required record array.
    #[error("Malformed {dataset} collection: {message}")]
    MalformedInput {
        /// Which dataset was malformed (`"neighborhood"` or `"incident"`).
        dataset: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}

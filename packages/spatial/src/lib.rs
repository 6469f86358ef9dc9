#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial primitives for neighborhood attribution.
//!
//! Flattens boundary geometries into vertex sequences, bins incident
//! points into a fixed-size grid for coarse candidate lookup, and
//! confirms membership with an even-odd point-in-polygon test. The
//! aggregation layer composes these: grid query, then bounding-box
//! refinement, then exact containment.

pub mod extract;
pub mod grid;
pub mod polygon;

pub use extract::{MIN_RING_VERTICES, extract_vertices};
pub use grid::{DEFAULT_GRID_SIZE, GridIndex};
pub use polygon::contains;

use thiserror::Error;

/// Errors that can occur while building spatial structures.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Grid cell size must be a positive, finite number of degrees.
    #[error("Invalid grid size {0}: expected a positive, finite number of degrees")]
    InvalidGridSize(f64),
}

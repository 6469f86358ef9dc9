#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Point-located incident record types.
//!
//! Incidents arrive already decoded from their raw source format. This
//! crate only describes their shape: where it happened, when (as the raw
//! timestamp string, parsed later during period classification), and the
//! free-text offense label used for category filtering.

use serde::{Deserialize, Serialize};

/// Sentinel category token that selects every offense except the
/// [`NON_VIOLENT_LABELS`].
pub const VIOLENT_CRIME: &str = "Violent Crime";

/// Offense label fragments that the [`VIOLENT_CRIME`] sentinel never
/// matches. These are the specific property-crime types offered
/// alongside the sentinel in the category picker.
pub const NON_VIOLENT_LABELS: &[&str] = &[
    "Burglary Residential",
    "Motor Vehicle Theft",
    "Theft From Vehicle",
    "Vandalism",
];

/// A geographic coordinate in floating-point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    /// Creates a location, rejecting non-finite components.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        (latitude.is_finite() && longitude.is_finite()).then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// A single incident as handed to the trend engine.
///
/// Immutable once ingested. A record without a usable location or
/// timestamp still exists (it is counted in diagnostics) but never lands
/// in a period bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    /// Where the incident happened, if the source provided a valid
    /// coordinate pair.
    pub location: Option<Location>,
    /// Raw timestamp string as reported by the source.
    pub occurred_at: Option<String>,
    /// Free-text offense label (e.g. "Burglary Residential").
    pub category: String,
}

impl PointRecord {
    /// Convenience constructor for a fully-populated record.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, occurred_at: &str, category: &str) -> Self {
        Self {
            location: Location::new(latitude, longitude),
            occurred_at: Some(occurred_at.to_string()),
            category: category.to_string(),
        }
    }
}

/// Field mapping for extracting incident records from decoded source rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentFieldMapping {
    /// Field holding the latitude.
    pub latitude: String,
    /// Field holding the longitude.
    pub longitude: String,
    /// Field holding the occurrence timestamp.
    pub timestamp: String,
    /// Field holding the offense label.
    pub category: String,
}

impl Default for IncidentFieldMapping {
    fn default() -> Self {
        Self {
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
            timestamp: "occurred_at".to_string(),
            category: "category".to_string(),
        }
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Skip accounting shared by dataset normalization and trend aggregation.
//!
//! A defective record never aborts a batch. Instead each stage folds its
//! input into the valid subset plus a tally of typed [`SkipReason`]s, so
//! the skip policy is visible to callers and tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Why a single record was left out of an aggregate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Incident has no timestamp at all.
    MissingTimestamp,
    /// Incident timestamp could not be parsed.
    InvalidTimestamp,
    /// Incident has no usable coordinate pair.
    InvalidLocation,
    /// Boundary feature carries no geometry.
    MissingGeometry,
    /// Boundary geometry could not be decoded or bounded.
    InvalidGeometry,
    /// Collection entry is not a record at all (e.g. not a JSON object).
    MalformedRecord,
    /// Boundary identifier already seen earlier in the same batch.
    DuplicateBoundary,
}

/// Tally of skipped records by reason.
pub type SkipCounts = BTreeMap<SkipReason, u64>;

/// Increments the tally for `reason`.
pub fn record_skip(counts: &mut SkipCounts, reason: SkipReason) {
    *counts.entry(reason).or_default() += 1;
}

/// The valid records of a batch plus the tally of records left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parsed<T> {
    /// Records that passed normalization, in input order.
    pub records: Vec<T>,
    /// Records that did not, by reason.
    pub skipped: SkipCounts,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: SkipCounts::new(),
        }
    }
}

impl<T> Parsed<T> {
    /// Folds one per-record outcome into the batch.
    pub fn push(&mut self, outcome: Result<T, SkipReason>) {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(reason) => record_skip(&mut self.skipped, reason),
        }
    }

    /// Total number of skipped records across all reasons.
    #[must_use]
    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }
}

impl<T> FromIterator<Result<T, SkipReason>> for Parsed<T> {
    fn from_iter<I: IntoIterator<Item = Result<T, SkipReason>>>(iter: I) -> Self {
        let mut parsed = Self::default();
        for outcome in iter {
            parsed.push(outcome);
        }
        parsed
    }
}

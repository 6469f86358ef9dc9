#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Result types for neighborhood safety trends.
//!
//! A [`TrendRecord`] compares incident counts inside one neighborhood
//! between a "recent" and a "previous" period for a [`TimeWindow`], and
//! keeps the [`WindowTrend`] of every window computed so far so that
//! switching windows never loses earlier results.

use std::collections::BTreeMap;

use safety_trends_ingest_models::SkipCounts;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// User-selectable comparison window.
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
pub enum TimeWindow {
    /// Last six months against the six months before, rolling from now.
    #[serde(rename = "6months")]
    #[strum(serialize = "6months")]
    SixMonths,
    /// The analysis year against the year before it.
    #[serde(rename = "1year")]
    #[strum(serialize = "1year")]
    OneYear,
    /// The two years ending with the analysis year against the two before.
    #[serde(rename = "2years")]
    #[strum(serialize = "2years")]
    TwoYears,
}

impl TimeWindow {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::SixMonths, Self::OneYear, Self::TwoYears]
    }
}

/// Which side of a window an incident falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// The newer half of the window.
    Recent,
    /// The older half of the window.
    Previous,
    /// Outside the window entirely.
    Other,
}

/// The selected category tokens. Empty selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySelection(pub Vec<String>);

impl CategorySelection {
    /// Selects every category.
    #[must_use]
    pub const fn all() -> Self {
        Self(Vec::new())
    }

    /// Whether no category filter is applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the selected tokens.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CategorySelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Counts for one neighborhood over one time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowTrend {
    /// Incidents in the recent period.
    pub recent_count: u64,
    /// Incidents in the previous period.
    pub previous_count: u64,
    /// Rounded percent change, capped at +100, 0 when `previous_count` is 0.
    pub change_percent: i64,
    /// Recent-period incidents by exact category label.
    pub categories: BTreeMap<String, u64>,
}

/// Trend for one neighborhood.
///
/// The top-level counts describe [`Self::window`]; [`Self::windows`]
/// holds every window computed for this neighborhood so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    /// Neighborhood identifier.
    pub id: String,
    /// Neighborhood display name.
    pub name: String,
    /// Window the top-level counts describe.
    pub window: TimeWindow,
    /// Incidents in the recent period.
    pub recent_count: u64,
    /// Incidents in the previous period.
    pub previous_count: u64,
    /// Rounded percent change, capped at +100, 0 when `previous_count` is 0.
    pub change_percent: i64,
    /// Recent-period incidents by exact category label.
    pub categories: BTreeMap<String, u64>,
    /// Per-window results accumulated across requests.
    pub windows: BTreeMap<TimeWindow, WindowTrend>,
}

impl TrendRecord {
    /// Builds a record whose top-level counts and only sub-record are
    /// `trend` for `window`.
    #[must_use]
    pub fn new(id: &str, name: &str, window: TimeWindow, trend: WindowTrend) -> Self {
        let mut windows = BTreeMap::new();
        windows.insert(window, trend.clone());
        Self {
            id: id.to_string(),
            name: name.to_string(),
            window,
            recent_count: trend.recent_count,
            previous_count: trend.previous_count,
            change_percent: trend.change_percent,
            categories: trend.categories,
            windows,
        }
    }

    /// Zero-count record for a neighborhood with no usable footprint.
    #[must_use]
    pub fn empty(id: &str, name: &str, window: TimeWindow) -> Self {
        Self::new(id, name, window, WindowTrend::default())
    }

    /// Sub-record for `window`, if it has been computed.
    #[must_use]
    pub fn window_trend(&self, window: TimeWindow) -> Option<&WindowTrend> {
        self.windows.get(&window)
    }
}

/// Per-call accounting of what the aggregator saw and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDiagnostics {
    /// Incidents handed to the call.
    pub total_points: u64,
    /// Incidents dropped by the category selection.
    pub filtered_points: u64,
    /// Incidents classified into the recent period.
    pub recent_points: u64,
    /// Incidents classified into the previous period.
    pub previous_points: u64,
    /// Incidents outside both periods.
    pub other_points: u64,
    /// Incidents skipped before bucketing, by reason.
    pub skipped_points: SkipCounts,
    /// Boundaries that produced a trend record (degenerate ones included).
    pub boundaries_processed: u64,
    /// Boundaries with fewer than three vertices.
    pub degenerate_boundaries: u64,
    /// Boundaries that produced no record, by reason.
    pub skipped_boundaries: SkipCounts,
}

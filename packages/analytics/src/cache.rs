//! Session-scoped memoization of bounding boxes and trend results.
//!
//! Nothing here expires on its own. When the upstream boundary or point
//! dataset changes, the owner calls [`ResultCache::invalidate`] or
//! [`ResultCache::clear`].

use std::collections::BTreeMap;

use safety_trends_analytics_models::TrendRecord;
use safety_trends_boundary_models::{BoundingBox, Vertex};

/// Bounding boxes by boundary identifier plus the last computed trends.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    bounds: BTreeMap<String, BoundingBox>,
    last_trends: Option<BTreeMap<String, TrendRecord>>,
}

impl ResultCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached bounding box for `id`, if one has been computed.
    #[must_use]
    pub fn bounds_for(&self, id: &str) -> Option<BoundingBox> {
        self.bounds.get(id).copied()
    }

    /// Returns the cached bounding box for `id`, computing it from
    /// `vertices` when absent.
    ///
    /// A box is a pure function of the boundary geometry, so recomputing
    /// one that is already present would store the same value. Returns
    /// `None` (and caches nothing) when `vertices` cannot be bounded.
    pub fn bounds_or_compute(&mut self, id: &str, vertices: &[Vertex]) -> Option<BoundingBox> {
        if let Some(bbox) = self.bounds.get(id) {
            return Some(*bbox);
        }
        let bbox = BoundingBox::from_vertices(vertices)?;
        self.bounds.insert(id.to_string(), bbox);
        Some(bbox)
    }

    /// Number of cached bounding boxes.
    #[must_use]
    pub fn bounds_len(&self) -> usize {
        self.bounds.len()
    }

    /// The trend mapping produced by the most recent computation.
    #[must_use]
    pub const fn last_computed_trends(&self) -> Option<&BTreeMap<String, TrendRecord>> {
        self.last_trends.as_ref()
    }

    /// Replaces the last computed trend mapping.
    pub fn store_trends(&mut self, trends: BTreeMap<String, TrendRecord>) {
        self.last_trends = Some(trends);
    }

    /// Forgets everything cached for one boundary.
    pub fn invalidate(&mut self, id: &str) {
        self.bounds.remove(id);
        if let Some(trends) = &mut self.last_trends {
            trends.remove(id);
        }
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.bounds.clear();
        self.last_trends = None;
    }
}

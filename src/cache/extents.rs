//! Memoized extents keyed by contract fingerprint.

use crate::cache::interval_tree::IntervalTree;
use crate::data::tree::DataTree;
use crate::reduce::{ReduceOp, Reducer};
use crate::types::Extents;
use std::collections::HashMap;
use std::sync::Arc;

/// What kind of extents an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtentsKind {
    /// Spatial bounding box of the data.
    Spatial,
    /// Min/max of a variable's values, stored as `min = min[0]`,
    /// `max = max[0]` of a degenerate extents.
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: ExtentsKind,
    variable: String,
    fingerprint: u64,
}

/// Lazy, memoized extents and interval trees.
#[derive(Default)]
pub struct ExtentsCache {
    entries: HashMap<CacheKey, Extents>,
    trees: HashMap<u64, Arc<IntervalTree>>,
    hits: u64,
    misses: u64,
}

impl ExtentsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or compute the extents for `(kind, variable, fingerprint)`.
    pub fn get_or_compute<F>(
        &mut self,
        kind: ExtentsKind,
        variable: &str,
        fingerprint: u64,
        compute: F,
    ) -> Extents
    where
        F: FnOnce() -> Extents,
    {
        let key = CacheKey {
            kind,
            variable: variable.to_string(),
            fingerprint,
        };
        if let Some(e) = self.entries.get(&key) {
            self.hits += 1;
            tracing::debug!(variable, fingerprint, "extents cache hit");
            return *e;
        }
        self.misses += 1;
        let e = compute();
        self.entries.insert(key, e);
        e
    }

    /// Fetch or build the interval tree for a fingerprint.
    pub fn interval_tree<F>(&mut self, fingerprint: u64, build: F) -> Arc<IntervalTree>
    where
        F: FnOnce() -> IntervalTree,
    {
        if let Some(t) = self.trees.get(&fingerprint) {
            self.hits += 1;
            return Arc::clone(t);
        }
        self.misses += 1;
        let t = Arc::new(build());
        self.trees.insert(fingerprint, Arc::clone(&t));
        t
    }

    /// Drop every entry associated with a fingerprint (the contract changed).
    pub fn invalidate(&mut self, fingerprint: u64) {
        self.entries.retain(|k, _| k.fingerprint != fingerprint);
        self.trees.remove(&fingerprint);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.trees.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.trees.is_empty()
    }
}

/// Union of every fragment's bounds in a tree.
pub fn spatial_extents_of_tree(tree: &DataTree) -> Extents {
    let mut out = Extents::EMPTY;
    for (_, frag) in tree.leaves() {
        out = out.union(frag.bounds());
    }
    out
}

/// Global min/max of a variable across a tree, combined through the
/// order-independent reducers. `None` when no fragment carries the variable.
pub fn data_extents_of_tree(tree: &DataTree, variable: &str) -> Option<(f64, f64)> {
    let mut min_r = Reducer::new(ReduceOp::Min, 1);
    let mut max_r = Reducer::new(ReduceOp::Max, 1);
    for (_, frag) in tree.leaves() {
        if let Some(array) = frag.array(variable) {
            if let Some((lo, hi)) = array.range() {
                min_r.accumulate(0, lo);
                max_r.accumulate(0, hi);
            }
        }
    }
    match (min_r.finalize()[0], max_r.finalize()[0]) {
        (Some(lo), Some(hi)) => Some((lo, hi)),
        _ => None,
    }
}

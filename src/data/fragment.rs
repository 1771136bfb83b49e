//! The opaque per-domain mesh fragment.
//!
//! The engine never looks inside a mesh representation beyond what filters
//! need: point/cell counts, named centered arrays, spatial bounds, and (for
//! structured fragments) logical cell dimensions plus an optional per-cell
//! ghost designation.

use crate::types::{Centering, Extents};
use std::collections::BTreeMap;

/// One named data array attached to a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    pub centering: Centering,
    pub values: Vec<f64>,
}

impl ArrayData {
    pub fn cell(values: Vec<f64>) -> Self {
        Self {
            centering: Centering::Cell,
            values,
        }
    }

    pub fn point(values: Vec<f64>) -> Self {
        Self {
            centering: Centering::Point,
            values,
        }
    }

    /// Min/max of the values, skipping NaNs. `None` when empty or all-NaN.
    pub fn range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for &v in &self.values {
            if v.is_nan() {
                continue;
            }
            range = Some(match range {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        range
    }
}

/// Mesh+array data for one domain at one pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFragment {
    n_points: usize,
    n_cells: usize,
    bounds: Extents,
    /// Logical cell counts per axis for structured fragments.
    structured_dims: Option<[usize; 3]>,
    arrays: BTreeMap<String, ArrayData>,
    /// Per-cell ghost designation (true = ghost), when ghost zones exist.
    ghost_zones: Option<Vec<bool>>,
}

impl GridFragment {
    pub fn new(n_points: usize, n_cells: usize, bounds: Extents) -> Self {
        Self {
            n_points,
            n_cells,
            bounds,
            structured_dims: None,
            arrays: BTreeMap::new(),
            ghost_zones: None,
        }
    }

    /// A logically rectilinear fragment with `dims` cells per axis.
    pub fn structured(dims: [usize; 3], bounds: Extents) -> Self {
        let n_cells = dims[0] * dims[1] * dims[2];
        let n_points = (dims[0] + 1) * (dims[1] + 1) * (dims[2] + 1);
        Self {
            n_points,
            n_cells,
            bounds,
            structured_dims: Some(dims),
            arrays: BTreeMap::new(),
            ghost_zones: None,
        }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn bounds(&self) -> &Extents {
        &self.bounds
    }

    pub fn structured_dims(&self) -> Option<[usize; 3]> {
        self.structured_dims
    }

    pub fn ghost_zones(&self) -> Option<&[bool]> {
        self.ghost_zones.as_deref()
    }

    /// Attach a per-cell ghost designation.
    ///
    /// Panics on length mismatch — fragment construction is a programmer
    /// contract.
    pub fn set_ghost_zones(&mut self, ghost: Vec<bool>) {
        assert_eq!(
            ghost.len(),
            self.n_cells,
            "ghost designation length {} != cell count {}",
            ghost.len(),
            self.n_cells
        );
        self.ghost_zones = Some(ghost);
    }

    /// Attach or replace a named array. Panics when the length does not
    /// match the centering's element count.
    pub fn set_array(&mut self, name: impl Into<String>, array: ArrayData) {
        let expected = match array.centering {
            Centering::Cell => self.n_cells,
            Centering::Point => self.n_points,
        };
        let name = name.into();
        assert_eq!(
            array.values.len(),
            expected,
            "array {:?} has {} values, fragment expects {}",
            name,
            array.values.len(),
            expected
        );
        self.arrays.insert(name, array);
    }

    pub fn array(&self, name: &str) -> Option<&ArrayData> {
        self.arrays.get(name)
    }

    pub fn has_array(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(|k| k.as_str())
    }

    pub fn arrays(&self) -> impl Iterator<Item = (&str, &ArrayData)> {
        self.arrays.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Count of non-ghost cells.
    pub fn real_cell_count(&self) -> usize {
        match &self.ghost_zones {
            None => self.n_cells,
            Some(g) => g.iter().filter(|&&ghost| !ghost).count(),
        }
    }

    /// Geometric center of a structured cell, derived from the bounds.
    /// `None` for unstructured fragments or out-of-range indices.
    pub fn cell_center(&self, cell: usize) -> Option<[f64; 3]> {
        let dims = self.structured_dims?;
        if cell >= self.n_cells {
            return None;
        }
        let i = cell % dims[0];
        let j = (cell / dims[0]) % dims[1];
        let k = cell / (dims[0] * dims[1]);
        let idx = [i, j, k];
        let mut center = [0.0; 3];
        for a in 0..3 {
            let step = self.bounds.width(a) / dims[a] as f64;
            center[a] = self.bounds.min[a] + (idx[a] as f64 + 0.5) * step;
        }
        Some(center)
    }

    /// Approximate heap footprint in bytes, used by memory-release logging.
    pub fn memory_footprint(&self) -> usize {
        let arrays: usize = self
            .arrays
            .values()
            .map(|a| a.values.len() * std::mem::size_of::<f64>())
            .sum();
        let ghost = self.ghost_zones.as_ref().map_or(0, |g| g.len());
        arrays + ghost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds() -> Extents {
        Extents::new([0.0; 3], [1.0; 3])
    }

    #[test]
    fn test_structured_counts() {
        let f = GridFragment::structured([4, 3, 2], unit_bounds());
        assert_eq!(f.n_cells(), 24);
        assert_eq!(f.n_points(), 5 * 4 * 3);
    }

    #[test]
    fn test_set_array() {
        let mut f = GridFragment::structured([2, 2, 1], unit_bounds());
        f.set_array("pressure", ArrayData::cell(vec![1.0, 2.0, 3.0, 4.0]));
        assert!(f.has_array("pressure"));
        assert_eq!(f.array("pressure").unwrap().range(), Some((1.0, 4.0)));
    }

    #[test]
    #[should_panic]
    fn test_set_array_wrong_length_panics() {
        let mut f = GridFragment::structured([2, 2, 1], unit_bounds());
        f.set_array("bad", ArrayData::cell(vec![1.0]));
    }

    #[test]
    fn test_cell_center() {
        let f = GridFragment::structured([2, 2, 2], unit_bounds());
        // First cell center of a 2x2x2 unit box is (0.25, 0.25, 0.25).
        assert_eq!(f.cell_center(0), Some([0.25, 0.25, 0.25]));
        // Last cell.
        assert_eq!(f.cell_center(7), Some([0.75, 0.75, 0.75]));
        assert_eq!(f.cell_center(8), None);
    }

    #[test]
    fn test_ghost_cells() {
        let mut f = GridFragment::structured([2, 1, 1], unit_bounds());
        f.set_ghost_zones(vec![false, true]);
        assert_eq!(f.real_cell_count(), 1);
    }

    #[test]
    fn test_array_range_skips_nan() {
        let a = ArrayData::cell(vec![f64::NAN, 2.0, -1.0]);
        assert_eq!(a.range(), Some((-1.0, 2.0)));
        let all_nan = ArrayData::cell(vec![f64::NAN]);
        assert_eq!(all_nan.range(), None);
    }
}

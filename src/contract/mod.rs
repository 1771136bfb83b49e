//! Contracts — immutable descriptions of what a pipeline must produce.
//!
//! A `DataRequest` says *what data* is wanted: variable, mesh, secondary
//! variables, spatial/material/SIL restriction, ghost-zone policy. A
//! `Contract` wraps one request together with the index of the logical
//! pipeline issuing it and a handful of execution flags, and is the value
//! threaded upstream by `update`. The request is held behind an `Arc`:
//! re-indexing for a second logical pipeline or adding a restriction copies
//! on write, so concurrent queries over one physical graph never observe
//! each other's edits.

pub mod request;

pub use request::{DataRequest, GhostRequest, MaterialSelection, SpatialRestriction};

use crate::error::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Immutable request + pipeline index + execution flags.
#[derive(Debug, Clone)]
pub struct Contract {
    request: Arc<DataRequest>,
    pipeline_index: usize,
    need_statistics: bool,
    replicate_single_domain: bool,
    calculate_material_boundaries: bool,
}

impl Contract {
    pub fn new(request: DataRequest) -> Self {
        Self {
            request: Arc::new(request),
            pipeline_index: 0,
            need_statistics: false,
            replicate_single_domain: false,
            calculate_material_boundaries: false,
        }
    }

    /// Duplicate for another logical pipeline. Copy-on-write: the request is
    /// shared until someone modifies it.
    pub fn with_pipeline_index(&self, pipeline_index: usize) -> Self {
        let mut c = self.clone();
        c.pipeline_index = pipeline_index;
        c
    }

    pub fn with_need_statistics(mut self, need: bool) -> Self {
        self.need_statistics = need;
        self
    }

    pub fn with_replicate_single_domain(mut self, replicate: bool) -> Self {
        self.replicate_single_domain = replicate;
        self
    }

    pub fn with_calculate_material_boundaries(mut self, calculate: bool) -> Self {
        self.calculate_material_boundaries = calculate;
        self
    }

    #[inline]
    pub fn request(&self) -> &DataRequest {
        &self.request
    }

    #[inline]
    pub fn pipeline_index(&self) -> usize {
        self.pipeline_index
    }

    pub fn need_statistics(&self) -> bool {
        self.need_statistics
    }

    pub fn replicate_single_domain(&self) -> bool {
        self.replicate_single_domain
    }

    pub fn calculate_material_boundaries(&self) -> bool {
        self.calculate_material_boundaries
    }

    /// Produce a contract whose request has been transformed by `f`.
    ///
    /// This is the copy-on-write edit point used by `modify_contract`
    /// implementations: the original contract (and every other holder of the
    /// request) is untouched.
    pub fn map_request<F>(&self, f: F) -> Contract
    where
        F: FnOnce(DataRequest) -> DataRequest,
    {
        let mut c = self.clone();
        c.request = Arc::new(f((*self.request).clone()));
        c
    }

    /// Merge with another contract sharing this execution. Flags OR; the
    /// pipeline index of `self` is kept (the initiating pipeline's identity).
    pub fn merge(&self, other: &Contract) -> Result<Contract> {
        let request = self.request.merge(other.request())?;
        Ok(Contract {
            request: Arc::new(request),
            pipeline_index: self.pipeline_index,
            need_statistics: self.need_statistics || other.need_statistics,
            replicate_single_domain: self.replicate_single_domain
                || other.replicate_single_domain,
            calculate_material_boundaries: self.calculate_material_boundaries
                || other.calculate_material_boundaries,
        })
    }

    /// Adopt the OR of this contract's ghost flags and `other`'s. Used when
    /// a node executes for several contracts sharing one physical fragment.
    pub fn union_ghost(&self, other: &Contract) -> Contract {
        let ghost = self.request.ghost().union(other.request().ghost());
        if *self.request.ghost() == ghost {
            self.clone()
        } else {
            self.map_request(|r| r.with_ghost(ghost))
        }
    }

    /// Structural equality used by the caching protocol: same request, same
    /// pipeline index, same flags.
    pub fn identical(&self, other: &Contract) -> bool {
        self.pipeline_index == other.pipeline_index
            && self.need_statistics == other.need_statistics
            && self.replicate_single_domain == other.replicate_single_domain
            && self.calculate_material_boundaries == other.calculate_material_boundaries
            && (Arc::ptr_eq(&self.request, &other.request) || *self.request == *other.request)
    }

    /// Stable structural fingerprint, used as a cache key.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.request.hash_into(&mut hasher);
        self.pipeline_index.hash(&mut hasher);
        self.need_statistics.hash(&mut hasher);
        self.replicate_single_domain.hash(&mut hasher);
        self.calculate_material_boundaries.hash(&mut hasher);
        hasher.finish()
    }
}

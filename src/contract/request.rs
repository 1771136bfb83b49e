//! The data request: variable, restrictions, ghost policy.
//!
//! Requests follow a merge algebra used when several logical pipelines share
//! one physical execution: restrictions intersect (most restrictive wins),
//! requested variables union, ghost flags OR. Merging is commutative,
//! associative, and idempotent, so the result never depends on the order in
//! which sharers arrive.

use crate::error::{EngineError, Result};
use crate::sil::SilRestriction;
use crate::types::Extents;
use std::collections::BTreeSet;

/// Spatial restriction on a request.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialRestriction {
    /// No spatial restriction.
    None,
    /// Only data intersecting these bounds.
    Bounds(Extents),
    /// Only these concrete domains (sorted ascending).
    Domains(Vec<usize>),
}

impl SpatialRestriction {
    /// Most restrictive combination of two spatial restrictions.
    ///
    /// A concrete domain list is always more restrictive than bounds, so a
    /// mixed combination keeps the domain list.
    pub fn intersect(&self, other: &SpatialRestriction) -> SpatialRestriction {
        use SpatialRestriction::*;
        match (self, other) {
            (None, x) | (x, None) => x.clone(),
            (Bounds(a), Bounds(b)) => Bounds(a.intersection(b)),
            (Domains(a), Domains(b)) => {
                let out: Vec<usize> = a.iter().filter(|d| b.contains(d)).copied().collect();
                Domains(out)
            }
            (Domains(d), Bounds(_)) | (Bounds(_), Domains(d)) => Domains(d.clone()),
        }
    }
}

/// Ghost-data request flags. Combined across sharers by OR: any requester
/// wanting ghost zones forces them for everyone sharing the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GhostRequest {
    pub zone_ghosts: bool,
    pub node_ghosts: bool,
}

impl GhostRequest {
    pub fn union(&self, other: &GhostRequest) -> GhostRequest {
        GhostRequest {
            zone_ghosts: self.zone_ghosts || other.zone_ghosts,
            node_ghosts: self.node_ghosts || other.node_ghosts,
        }
    }

    pub fn any(&self) -> bool {
        self.zone_ghosts || self.node_ghosts
    }
}

/// Material (or species) selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MaterialSelection {
    /// Every material.
    All,
    /// Only the named materials.
    Named(BTreeSet<String>),
}

impl MaterialSelection {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MaterialSelection::Named(names.into_iter().map(Into::into).collect())
    }

    pub fn intersect(&self, other: &MaterialSelection) -> MaterialSelection {
        use MaterialSelection::*;
        match (self, other) {
            (All, x) | (x, All) => x.clone(),
            (Named(a), Named(b)) => Named(a.intersection(b).cloned().collect()),
        }
    }

    pub fn selects(&self, name: &str) -> bool {
        match self {
            MaterialSelection::All => true,
            MaterialSelection::Named(set) => set.contains(name),
        }
    }
}

/// Immutable-per-version description of what data a pipeline stage needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    mesh: String,
    variable: String,
    timestep: usize,
    secondary: BTreeSet<String>,
    spatial: SpatialRestriction,
    restriction: SilRestriction,
    ghost: GhostRequest,
    materials: MaterialSelection,
    species: MaterialSelection,
    need_validity_check: bool,
}

impl DataRequest {
    pub fn new(
        mesh: impl Into<String>,
        variable: impl Into<String>,
        restriction: SilRestriction,
    ) -> Self {
        Self {
            mesh: mesh.into(),
            variable: variable.into(),
            timestep: 0,
            secondary: BTreeSet::new(),
            spatial: SpatialRestriction::None,
            restriction,
            ghost: GhostRequest::default(),
            materials: MaterialSelection::All,
            species: MaterialSelection::All,
            need_validity_check: false,
        }
    }

    // ── Builder-style modifiers (value semantics) ──

    pub fn with_timestep(mut self, timestep: usize) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_secondary_variable(mut self, name: impl Into<String>) -> Self {
        self.secondary.insert(name.into());
        self.normalize();
        self
    }

    pub fn with_spatial(mut self, spatial: SpatialRestriction) -> Self {
        self.spatial = spatial;
        self
    }

    pub fn with_restriction(mut self, restriction: SilRestriction) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn with_ghost(mut self, ghost: GhostRequest) -> Self {
        self.ghost = ghost;
        self
    }

    pub fn with_materials(mut self, materials: MaterialSelection) -> Self {
        self.materials = materials;
        self
    }

    pub fn with_species(mut self, species: MaterialSelection) -> Self {
        self.species = species;
        self
    }

    pub fn with_validity_check(mut self, need: bool) -> Self {
        self.need_validity_check = need;
        self
    }

    // ── Accessors ──

    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    pub fn secondary_variables(&self) -> &BTreeSet<String> {
        &self.secondary
    }

    /// Primary plus secondary variables, primary first.
    pub fn all_variables(&self) -> Vec<&str> {
        let mut out = vec![self.variable.as_str()];
        out.extend(self.secondary.iter().map(|s| s.as_str()));
        out
    }

    pub fn spatial(&self) -> &SpatialRestriction {
        &self.spatial
    }

    pub fn restriction(&self) -> &SilRestriction {
        &self.restriction
    }

    pub fn ghost(&self) -> &GhostRequest {
        &self.ghost
    }

    pub fn materials(&self) -> &MaterialSelection {
        &self.materials
    }

    pub fn species(&self) -> &MaterialSelection {
        &self.species
    }

    pub fn need_validity_check(&self) -> bool {
        self.need_validity_check
    }

    /// The primary variable never doubles as a secondary one.
    fn normalize(&mut self) {
        self.secondary.remove(&self.variable);
    }

    /// Merge two requests into the most restrictive common one.
    ///
    /// Fails with `IncompatibleRequest` when the requests reference different
    /// meshes, timesteps, or restriction lattices. The other request's
    /// primary variable folds into the secondary set, so merged executions
    /// read every variable any sharer asked for.
    pub fn merge(&self, other: &DataRequest) -> Result<DataRequest> {
        if self.mesh != other.mesh {
            return Err(EngineError::IncompatibleRequest(format!(
                "meshes differ: {:?} vs {:?}",
                self.mesh, other.mesh
            )));
        }
        if self.timestep != other.timestep {
            return Err(EngineError::IncompatibleRequest(format!(
                "timesteps differ: {} vs {}",
                self.timestep, other.timestep
            )));
        }
        let restriction = self
            .restriction
            .intersect(&other.restriction)
            .ok_or_else(|| {
                EngineError::IncompatibleRequest("restriction lattices differ".to_string())
            })?;

        let mut secondary: BTreeSet<String> =
            self.secondary.union(&other.secondary).cloned().collect();
        if other.variable != self.variable {
            secondary.insert(other.variable.clone());
        }

        let mut merged = DataRequest {
            mesh: self.mesh.clone(),
            variable: self.variable.clone(),
            timestep: self.timestep,
            secondary,
            spatial: self.spatial.intersect(&other.spatial),
            restriction,
            ghost: self.ghost.union(&other.ghost),
            materials: self.materials.intersect(&other.materials),
            species: self.species.intersect(&other.species),
            need_validity_check: self.need_validity_check || other.need_validity_check,
        };
        merged.normalize();
        Ok(merged)
    }

    /// Feed the request's structural identity into a hasher. Floats hash by
    /// bit pattern, which is exactly the equality the update protocol wants.
    pub(crate) fn hash_into<H: std::hash::Hasher>(&self, state: &mut H) {
        use std::hash::Hash;
        self.mesh.hash(state);
        self.variable.hash(state);
        self.timestep.hash(state);
        self.secondary.hash(state);
        match &self.spatial {
            SpatialRestriction::None => 0u8.hash(state),
            SpatialRestriction::Bounds(e) => {
                1u8.hash(state);
                for a in 0..3 {
                    e.min[a].to_bits().hash(state);
                    e.max[a].to_bits().hash(state);
                }
            }
            SpatialRestriction::Domains(d) => {
                2u8.hash(state);
                d.hash(state);
            }
        }
        self.restriction.hash(state);
        self.ghost.hash(state);
        self.materials.hash(state);
        self.species.hash(state);
        self.need_validity_check.hash(state);
    }

    /// Whether the two requests would drive identical executions, ignoring
    /// which one happens to name the primary variable.
    pub fn equivalent(&self, other: &DataRequest) -> bool {
        let mut a: BTreeSet<&str> = self.secondary.iter().map(|s| s.as_str()).collect();
        a.insert(&self.variable);
        let mut b: BTreeSet<&str> = other.secondary.iter().map(|s| s.as_str()).collect();
        b.insert(&other.variable);
        self.mesh == other.mesh
            && self.timestep == other.timestep
            && a == b
            && self.spatial == other.spatial
            && self.restriction.identical(&other.restriction)
            && self.ghost == other.ghost
            && self.materials == other.materials
            && self.species == other.species
            && self.need_validity_check == other.need_validity_check
    }
}

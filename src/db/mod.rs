//! The database boundary.
//!
//! Databases are black boxes behind the `FragmentSource` trait: the engine
//! asks for a mesh fragment, a variable array, or auxiliary data per
//! (domain, timestep) and never learns about file formats. `MemoryDatabase`
//! is the synthetic in-process implementation used by tests and the demo;
//! `sil_from_metadata` is the one-shot adapter that turns database metadata
//! into the subset lattice.

pub mod memory;
pub mod sil_gen;

pub use memory::{MemoryDatabase, MemoryDatabaseBuilder};
pub use sil_gen::{restrict_to_materials, sil_from_metadata};

use crate::data::fragment::{ArrayData, GridFragment};
use crate::error::Result;
use crate::types::{Centering, Extents};

/// One variable a database can serve.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub centering: Centering,
}

/// A named group of domains (e.g. a part in an assembly hierarchy).
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyInfo {
    pub name: String,
    pub domains: Vec<usize>,
}

/// Everything the engine needs to know about a database up front.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatabaseMetadata {
    pub mesh_name: String,
    pub domain_count: usize,
    pub variables: Vec<VariableInfo>,
    /// Material names, indexed by material id.
    pub materials: Vec<String>,
    /// Per-domain list of material ids present in that domain.
    pub domain_materials: Vec<Vec<usize>>,
    /// Per-domain spatial bounds, for interval-tree culling.
    pub domain_bounds: Vec<Extents>,
    pub assemblies: Vec<AssemblyInfo>,
}

/// What kind of auxiliary data is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxiliaryKind {
    /// Per-cell material id.
    MaterialMap,
    /// Per-cell ghost designation.
    GhostZones,
}

/// Opaque auxiliary payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum AuxiliaryData {
    MaterialMap(Vec<usize>),
    GhostZones(Vec<bool>),
}

/// Black-box provider of per-domain mesh fragments.
///
/// Implementations are shared read-only across pipeline nodes, hence
/// `Send + Sync`.
#[cfg_attr(test, mockall::automock)]
pub trait FragmentSource: Send + Sync {
    /// Describe the dataset. Fails with `NoData` when nothing can be opened.
    fn populate_metadata(&self) -> Result<DatabaseMetadata>;

    /// Read the mesh fragment for one domain.
    fn mesh(&self, domain: usize, timestep: usize, mesh: &str) -> Result<GridFragment>;

    /// Read one variable's array for one domain.
    fn var(&self, domain: usize, timestep: usize, variable: &str) -> Result<ArrayData>;

    /// Read auxiliary data, or `None` when the database has none of `kind`.
    fn auxiliary(
        &self,
        kind: AuxiliaryKind,
        domain: usize,
        timestep: usize,
    ) -> Result<Option<AuxiliaryData>>;
}

//! Synthetic in-memory database.
//!
//! Serves structured fragments straight from `Vec`s — no files, no formats.
//! Used by the test suite and the demo binary. Read counters are observable
//! so tests can assert the update protocol's caching invariant (a cache hit
//! must not touch the database).

use crate::data::fragment::{ArrayData, GridFragment};
use crate::db::{
    AssemblyInfo, AuxiliaryData, AuxiliaryKind, DatabaseMetadata, FragmentSource, VariableInfo,
};
use crate::error::{EngineError, Result};
use crate::types::{Centering, Extents};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

struct DomainData {
    dims: [usize; 3],
    bounds: Extents,
    arrays: BTreeMap<String, ArrayData>,
    /// Per-cell material id, when the domain has a material decomposition.
    material_map: Option<Vec<usize>>,
    /// Per-cell ghost designation, when the domain carries ghost cells.
    ghost_zones: Option<Vec<bool>>,
}

/// In-memory `FragmentSource`.
pub struct MemoryDatabase {
    mesh_name: String,
    materials: Vec<String>,
    assemblies: Vec<AssemblyInfo>,
    domains: Vec<DomainData>,
    mesh_reads: AtomicUsize,
    var_reads: AtomicUsize,
}

impl MemoryDatabase {
    pub fn builder(mesh_name: impl Into<String>) -> MemoryDatabaseBuilder {
        MemoryDatabaseBuilder {
            mesh_name: mesh_name.into(),
            materials: Vec::new(),
            assemblies: Vec::new(),
            domains: Vec::new(),
        }
    }

    /// Load a dataset description from JSON (see `DatasetFile` for the
    /// schema). Array centering is inferred from length: cell count first,
    /// then point count.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DatasetFile =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        let mut builder = Self::builder(file.mesh);
        builder = builder.materials(file.materials);
        for dom in file.domains {
            let idx = {
                builder = builder.domain(dom.dims, dom.bounds);
                builder.domains.len() - 1
            };
            for (name, values) in dom.arrays {
                builder = builder.cell_array(idx, name, values);
            }
            if let Some(map) = dom.material_map {
                builder = builder.material_map(idx, map);
            }
        }
        Ok(builder.build())
    }

    /// How many mesh fragments have been read so far.
    pub fn mesh_read_count(&self) -> usize {
        self.mesh_reads.load(Ordering::Relaxed)
    }

    /// How many variable arrays have been read so far.
    pub fn var_read_count(&self) -> usize {
        self.var_reads.load(Ordering::Relaxed)
    }

    fn domain(&self, domain: usize) -> Result<&DomainData> {
        self.domains.get(domain).ok_or_else(|| {
            EngineError::Database(format!(
                "domain {} out of range (database has {})",
                domain,
                self.domains.len()
            ))
        })
    }
}

impl FragmentSource for MemoryDatabase {
    fn populate_metadata(&self) -> Result<DatabaseMetadata> {
        if self.domains.is_empty() {
            return Err(EngineError::NoData(format!(
                "database {:?} has no domains",
                self.mesh_name
            )));
        }

        let mut variables: Vec<VariableInfo> = Vec::new();
        for dom in &self.domains {
            for (name, array) in &dom.arrays {
                if !variables.iter().any(|v| &v.name == name) {
                    variables.push(VariableInfo {
                        name: name.clone(),
                        centering: array.centering,
                    });
                }
            }
        }

        let domain_materials = self
            .domains
            .iter()
            .map(|d| {
                let mut present: Vec<usize> = d
                    .material_map
                    .as_ref()
                    .map(|m| m.clone())
                    .unwrap_or_default();
                present.sort_unstable();
                present.dedup();
                present
            })
            .collect();

        Ok(DatabaseMetadata {
            mesh_name: self.mesh_name.clone(),
            domain_count: self.domains.len(),
            variables,
            materials: self.materials.clone(),
            domain_materials,
            domain_bounds: self.domains.iter().map(|d| d.bounds).collect(),
            assemblies: self.assemblies.clone(),
        })
    }

    fn mesh(&self, domain: usize, _timestep: usize, mesh: &str) -> Result<GridFragment> {
        if mesh != self.mesh_name {
            return Err(EngineError::Database(format!(
                "unknown mesh {:?} (database serves {:?})",
                mesh, self.mesh_name
            )));
        }
        let dom = self.domain(domain)?;
        self.mesh_reads.fetch_add(1, Ordering::Relaxed);

        let mut frag = GridFragment::structured(dom.dims, dom.bounds);
        if let Some(ghost) = &dom.ghost_zones {
            frag.set_ghost_zones(ghost.clone());
        }
        Ok(frag)
    }

    fn var(&self, domain: usize, _timestep: usize, variable: &str) -> Result<ArrayData> {
        let dom = self.domain(domain)?;
        self.var_reads.fetch_add(1, Ordering::Relaxed);
        dom.arrays.get(variable).cloned().ok_or_else(|| {
            EngineError::Database(format!(
                "variable {:?} not present in domain {}",
                variable, domain
            ))
        })
    }

    fn auxiliary(
        &self,
        kind: AuxiliaryKind,
        domain: usize,
        _timestep: usize,
    ) -> Result<Option<AuxiliaryData>> {
        let dom = self.domain(domain)?;
        Ok(match kind {
            AuxiliaryKind::MaterialMap => dom
                .material_map
                .as_ref()
                .map(|m| AuxiliaryData::MaterialMap(m.clone())),
            AuxiliaryKind::GhostZones => dom
                .ghost_zones
                .as_ref()
                .map(|g| AuxiliaryData::GhostZones(g.clone())),
        })
    }
}

/// Step-by-step construction of a `MemoryDatabase`.
pub struct MemoryDatabaseBuilder {
    mesh_name: String,
    materials: Vec<String>,
    assemblies: Vec<AssemblyInfo>,
    domains: Vec<DomainData>,
}

impl MemoryDatabaseBuilder {
    /// Register the material name table.
    pub fn materials<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.materials = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn assembly(mut self, name: impl Into<String>, domains: Vec<usize>) -> Self {
        self.assemblies.push(AssemblyInfo {
            name: name.into(),
            domains,
        });
        self
    }

    /// Add a structured domain. Domains are indexed in insertion order.
    pub fn domain(mut self, dims: [usize; 3], bounds: Extents) -> Self {
        self.domains.push(DomainData {
            dims,
            bounds,
            arrays: BTreeMap::new(),
            material_map: None,
            ghost_zones: None,
        });
        self
    }

    /// Attach a cell-centered array to a domain.
    ///
    /// Panics on unknown domain or wrong length — dataset construction is a
    /// programmer contract.
    pub fn cell_array(
        mut self,
        domain: usize,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        let dom = &mut self.domains[domain];
        let n_cells = dom.dims[0] * dom.dims[1] * dom.dims[2];
        let n_points = (dom.dims[0] + 1) * (dom.dims[1] + 1) * (dom.dims[2] + 1);
        let array = if values.len() == n_cells {
            ArrayData::cell(values)
        } else if values.len() == n_points {
            ArrayData {
                centering: Centering::Point,
                values,
            }
        } else {
            panic!(
                "array length {} matches neither cell count {} nor point count {}",
                values.len(),
                n_cells,
                n_points
            );
        };
        dom.arrays.insert(name.into(), array);
        self
    }

    /// Attach a per-cell material map to a domain.
    pub fn material_map(mut self, domain: usize, map: Vec<usize>) -> Self {
        let dom = &mut self.domains[domain];
        let n_cells = dom.dims[0] * dom.dims[1] * dom.dims[2];
        assert_eq!(map.len(), n_cells, "material map length != cell count");
        dom.material_map = Some(map);
        self
    }

    /// Attach a per-cell ghost designation to a domain.
    pub fn ghost_zones(mut self, domain: usize, ghost: Vec<bool>) -> Self {
        let dom = &mut self.domains[domain];
        let n_cells = dom.dims[0] * dom.dims[1] * dom.dims[2];
        assert_eq!(ghost.len(), n_cells, "ghost designation length != cell count");
        dom.ghost_zones = Some(ghost);
        self
    }

    pub fn build(self) -> MemoryDatabase {
        MemoryDatabase {
            mesh_name: self.mesh_name,
            materials: self.materials,
            assemblies: self.assemblies,
            domains: self.domains,
            mesh_reads: AtomicUsize::new(0),
            var_reads: AtomicUsize::new(0),
        }
    }
}

// ── JSON dataset schema ──

#[derive(Deserialize)]
struct DatasetFile {
    mesh: String,
    #[serde(default)]
    materials: Vec<String>,
    domains: Vec<DatasetDomain>,
}

#[derive(Deserialize)]
struct DatasetDomain {
    dims: [usize; 3],
    bounds: Extents,
    #[serde(default)]
    arrays: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    material_map: Option<Vec<usize>>,
}

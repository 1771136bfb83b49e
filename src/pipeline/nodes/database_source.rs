//! The terminating source backed by a fragment database.
//!
//! Execution turns the contract into a concrete domain list (SIL restriction
//! first, then spatial culling through the cached interval tree), reads each
//! domain's mesh and requested arrays, applies the material selection, and
//! publishes the resulting tree. Domains are read in ascending order with an
//! abort check between reads.

use crate::cache::{ExtentsCache, IntervalTree};
use crate::contract::{Contract, MaterialSelection, SpatialRestriction};
use crate::data::fragment::{ArrayData, GridFragment};
use crate::data::tree::DataTree;
use crate::db::{AuxiliaryData, AuxiliaryKind, DatabaseMetadata, FragmentSource};
use crate::error::Result;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::node::PipelineNode;
use std::sync::Arc;

/// Terminating source node.
pub struct DatabaseSource {
    db: Arc<dyn FragmentSource>,
    metadata: DatabaseMetadata,
    cache: ExtentsCache,
}

impl DatabaseSource {
    /// Open a database. Fails with `NoData` when the database has nothing.
    pub fn open(db: Arc<dyn FragmentSource>) -> Result<Self> {
        let metadata = db.populate_metadata()?;
        tracing::info!(
            mesh = %metadata.mesh_name,
            domains = metadata.domain_count,
            "database opened"
        );
        Ok(Self {
            db,
            metadata,
            cache: ExtentsCache::new(),
        })
    }

    pub fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    /// Observable cache statistics (hits, misses).
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.cache.hits(), self.cache.misses())
    }

    /// Domains the contract asks for: the SIL restriction's list, culled by
    /// the spatial restriction.
    fn domain_list(&mut self, contract: &Contract) -> Vec<usize> {
        let request = contract.request();
        let mut domains = request.restriction().domain_list();

        match request.spatial() {
            SpatialRestriction::None => {}
            SpatialRestriction::Domains(allowed) => {
                domains.retain(|d| allowed.contains(d));
            }
            SpatialRestriction::Bounds(query) => {
                // The interval tree depends only on database metadata, so it
                // is cached under a single fixed key.
                let bounds = self.metadata.domain_bounds.clone();
                let tree = self.cache.interval_tree(0, move || {
                    IntervalTree::build(bounds.into_iter().enumerate().collect())
                });
                let near = tree.domains_intersecting(query);
                domains.retain(|d| near.contains(d));
            }
        }

        domains
    }

    /// Read one domain: mesh, requested arrays, material mask, ghost zones.
    /// Returns `None` when the material selection leaves no cells.
    fn read_domain(&self, domain: usize, contract: &Contract) -> Result<Option<GridFragment>> {
        let request = contract.request();
        let mut frag = self
            .db
            .mesh(domain, request.timestep(), request.mesh())?;

        for var in request.all_variables() {
            let array = self.db.var(domain, request.timestep(), var)?;
            frag.set_array(var, array);
        }

        if request.ghost().zone_ghosts {
            if let Some(AuxiliaryData::GhostZones(ghost)) =
                self.db
                    .auxiliary(AuxiliaryKind::GhostZones, domain, request.timestep())?
            {
                frag.set_ghost_zones(ghost);
            }
        }

        if let Some(AuxiliaryData::MaterialMap(map)) =
            self.db
                .auxiliary(AuxiliaryKind::MaterialMap, domain, request.timestep())?
        {
            frag.set_array(
                "material",
                ArrayData::cell(map.iter().map(|&m| m as f64).collect()),
            );

            if let MaterialSelection::Named(_) = request.materials() {
                let mask: Vec<f64> = map
                    .iter()
                    .map(|&m| {
                        let name = self
                            .metadata
                            .materials
                            .get(m)
                            .map(String::as_str)
                            .unwrap_or("");
                        if request.materials().selects(name) {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect();
                if mask.iter().all(|&v| v == 0.0) {
                    return Ok(None);
                }
                frag.set_array("material_mask", ArrayData::cell(mask));
            }
        }

        Ok(Some(frag))
    }
}

impl PipelineNode for DatabaseSource {
    fn name(&self) -> &str {
        "DatabaseSource"
    }

    fn arity(&self) -> usize {
        0
    }

    fn execute(
        &mut self,
        _inputs: Vec<DataTree>,
        contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        let domains = self.domain_list(contract);
        tracing::debug!(?domains, "source reading domains");

        let mut leaves = Vec::with_capacity(domains.len());
        for domain in domains {
            ctx.check_abort()?;
            if let Some(frag) = self.read_domain(domain, contract)? {
                leaves.push(DataTree::leaf(domain, frag));
            }
        }

        Ok(DataTree::Node(leaves).pruned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DataRequest;
    use crate::db::{sil_from_metadata, MemoryDatabase};
    use crate::sil::SilRestriction;
    use crate::types::Extents;

    fn db() -> Arc<MemoryDatabase> {
        Arc::new(
            MemoryDatabase::builder("mesh")
                .materials(["a", "b"])
                .domain([2, 1, 1], Extents::new([0.0; 3], [1.0; 3]))
                .cell_array(0, "pressure", vec![1.0, 2.0])
                .material_map(0, vec![0, 1])
                .domain([2, 1, 1], Extents::new([2.0, 0.0, 0.0], [3.0, 1.0, 1.0]))
                .cell_array(1, "pressure", vec![3.0, 4.0])
                .material_map(1, vec![1, 1])
                .build(),
        )
    }

    fn contract_for(source: &DatabaseSource) -> Contract {
        let sil = Arc::new(sil_from_metadata(source.metadata()));
        Contract::new(DataRequest::new(
            "mesh",
            "pressure",
            SilRestriction::new(sil),
        ))
    }

    #[test]
    fn test_reads_all_domains() {
        let mut source = DatabaseSource::open(db()).unwrap();
        let contract = contract_for(&source);
        let tree = source
            .execute(Vec::new(), &contract, &ExecutionContext::new())
            .unwrap();
        assert_eq!(tree.domain_ids(), vec![0, 1]);
        let frag = tree.fragment_for_domain(0).unwrap();
        assert!(frag.has_array("pressure"));
        assert!(frag.has_array("material"));
    }

    #[test]
    fn test_spatial_bounds_cull() {
        let mut source = DatabaseSource::open(db()).unwrap();
        let contract = contract_for(&source).map_request(|r| {
            r.with_spatial(SpatialRestriction::Bounds(Extents::new(
                [2.1, 0.0, 0.0],
                [2.9, 1.0, 1.0],
            )))
        });
        let tree = source
            .execute(Vec::new(), &contract, &ExecutionContext::new())
            .unwrap();
        assert_eq!(tree.domain_ids(), vec![1]);
    }

    #[test]
    fn test_material_selection_masks_and_skips() {
        let mut source = DatabaseSource::open(db()).unwrap();
        // Material "a" exists only in domain 0.
        let contract = contract_for(&source)
            .map_request(|r| r.with_materials(MaterialSelection::named(["a"])));
        let tree = source
            .execute(Vec::new(), &contract, &ExecutionContext::new())
            .unwrap();
        assert_eq!(tree.domain_ids(), vec![0]);
        let frag = tree.fragment_for_domain(0).unwrap();
        assert_eq!(
            frag.array("material_mask").unwrap().values,
            vec![1.0, 0.0]
        );
    }

    #[test]
    fn test_empty_database_fails_open() {
        let empty = Arc::new(MemoryDatabase::builder("none").build());
        assert!(DatabaseSource::open(empty).is_err());
    }
}

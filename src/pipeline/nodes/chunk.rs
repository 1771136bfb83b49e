//! Ghost-aware repartitioning filter.
//!
//! Runs the sweep-plane chunker over each structured fragment: ghost cells
//! are left out of the designation, so the output chunks cover exactly the
//! real cells. Each input leaf expands into one subtree of chunk leaves that
//! keep the original domain id for provenance. Unstructured fragments pass
//! through untouched.

use crate::contract::{Contract, GhostRequest};
use crate::data::fragment::{ArrayData, GridFragment};
use crate::data::tree::DataTree;
use crate::error::Result;
use crate::pipeline::chunker::{decompose_with_limit, Chunk, ZoneDesignation};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::node::PipelineNode;
use crate::pipeline::streamer;
use crate::types::{Centering, Extents};

/// Structured-mesh repartitioner.
pub struct ChunkFilter {
    /// Upper bound on zones per chunk; `None` means unbounded.
    max_zones: Option<usize>,
}

impl ChunkFilter {
    pub fn new(max_zones: Option<usize>) -> Self {
        Self { max_zones }
    }

    /// Use the configured target chunk size (0 meaning unbounded).
    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        let target = config.chunking.target_zones_per_chunk;
        Self {
            max_zones: (target > 0).then_some(target),
        }
    }
}

impl PipelineNode for ChunkFilter {
    fn name(&self) -> &str {
        "ChunkFilter"
    }

    fn arity(&self) -> usize {
        1
    }

    fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        // Ghost designations are what let the chunker drop duplicated
        // boundary layers, so ask upstream for them.
        let ghost = contract.request().ghost().union(&GhostRequest {
            zone_ghosts: true,
            node_ghosts: false,
        });
        Ok(contract.map_request(|r| r.with_ghost(ghost)))
    }

    fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        _contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        let mut inputs = inputs;
        let input = inputs.pop().expect("chunk filter requires one input");
        let max_zones = self.max_zones;

        streamer::map_tree_expanding(input, ctx, &mut |frag, domain| {
            let Some(dims) = frag.structured_dims() else {
                tracing::debug!(domain, "unstructured fragment passes through chunker");
                return Ok(DataTree::leaf(domain, frag.clone()));
            };

            let designation = match frag.ghost_zones() {
                Some(ghost) => {
                    ZoneDesignation::new(dims, ghost.iter().map(|&g| !g).collect())
                }
                None => ZoneDesignation::uniform(dims),
            };

            let chunks = decompose_with_limit(&designation, max_zones);
            if chunks.len() == 1 && chunks[0].volume() == frag.n_cells() {
                // Already one ghost-free block; keep the fragment as is.
                return Ok(DataTree::leaf(domain, frag.clone()));
            }

            let children = chunks
                .into_iter()
                .map(|chunk| DataTree::leaf(domain, slice_fragment(frag, dims, &chunk)))
                .collect();
            Ok(DataTree::node(children))
        })
    }
}

/// Extract one chunk of a structured fragment, slicing every array.
fn slice_fragment(frag: &GridFragment, dims: [usize; 3], chunk: &Chunk) -> GridFragment {
    let cdims = chunk.dims();
    let mut bounds = Extents::EMPTY;
    for a in 0..3 {
        let step = frag.bounds().width(a) / dims[a] as f64;
        bounds.min[a] = frag.bounds().min[a] + chunk.lo[a] as f64 * step;
        bounds.max[a] = bounds.min[a] + cdims[a] as f64 * step;
    }

    let mut out = GridFragment::structured(cdims, bounds);
    for (name, array) in frag.arrays() {
        let sliced = match array.centering {
            Centering::Cell => ArrayData::cell(slice_values(
                &array.values,
                [dims[0], dims[1], dims[2]],
                chunk.lo,
                cdims,
            )),
            Centering::Point => ArrayData::point(slice_values(
                &array.values,
                [dims[0] + 1, dims[1] + 1, dims[2] + 1],
                chunk.lo,
                [cdims[0] + 1, cdims[1] + 1, cdims[2] + 1],
            )),
        };
        out.set_array(name, sliced);
    }
    out
}

/// Copy a `sub_dims` box starting at `lo` out of a row-major `src_dims` grid.
fn slice_values(
    values: &[f64],
    src_dims: [usize; 3],
    lo: [usize; 3],
    sub_dims: [usize; 3],
) -> Vec<f64> {
    let mut out = Vec::with_capacity(sub_dims[0] * sub_dims[1] * sub_dims[2]);
    for z in 0..sub_dims[2] {
        for y in 0..sub_dims[1] {
            let row_start =
                lo[0] + src_dims[0] * ((lo[1] + y) + src_dims[1] * (lo[2] + z));
            out.extend_from_slice(&values[row_start..row_start + sub_dims[0]]);
        }
    }
    out
}

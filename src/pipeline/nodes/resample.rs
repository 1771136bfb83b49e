//! Resampling filter.
//!
//! Collapses the whole domain tree onto one uniform sample grid. Cells from
//! different domains can land on the same sample; the arbitrator decides
//! which value survives, independently of the order domains are visited
//! (no first-write-wins).

use crate::contract::Contract;
use crate::data::fragment::{ArrayData, GridFragment};
use crate::data::tree::DataTree;
use crate::error::Result;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::node::PipelineNode;
use crate::pipeline::streamer;
use crate::sampling::SamplePointArbitrator;
use crate::types::Extents;

/// Whole-tree resampler.
pub struct ResampleFilter {
    dims: [usize; 3],
    /// Target bounds; `None` uses the input tree's spatial extents.
    bounds: Option<Extents>,
    arbitrator: SamplePointArbitrator,
    /// Variable to resample; `None` uses the contract's primary variable.
    variable: Option<String>,
}

impl ResampleFilter {
    pub fn new(dims: [usize; 3], arbitrator: SamplePointArbitrator) -> Self {
        assert!(
            dims.iter().all(|&d| d > 0),
            "resample grid must have at least one cell per axis"
        );
        Self {
            dims,
            bounds: None,
            arbitrator,
            variable: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Extents) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }
}

impl PipelineNode for ResampleFilter {
    fn name(&self) -> &str {
        "ResampleFilter"
    }

    fn arity(&self) -> usize {
        1
    }

    fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        match &self.variable {
            Some(var)
                if contract.request().variable() != var
                    && !contract.request().secondary_variables().contains(var) =>
            {
                let var = var.clone();
                Ok(contract.map_request(|r| r.with_secondary_variable(var)))
            }
            _ => Ok(contract.clone()),
        }
    }

    fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        let mut inputs = inputs;
        let input = inputs.pop().expect("resample filter requires one input");

        let variable = self
            .variable
            .clone()
            .unwrap_or_else(|| contract.request().variable().to_string());
        let dims = self.dims;
        let bounds = self.bounds;
        let arbitrator = self.arbitrator.clone();

        streamer::collapse_tree(input, ctx, move |leaves| {
            let bounds = bounds.unwrap_or_else(|| {
                let mut e = Extents::EMPTY;
                for (_, frag) in leaves {
                    e = e.union(frag.bounds());
                }
                e
            });
            if bounds.is_empty() {
                return Ok(None);
            }

            let n = dims[0] * dims[1] * dims[2];
            let mut samples = vec![f64::NAN; n];
            let mut filled = vec![false; n];

            for (domain, frag) in leaves {
                let Some(array) = frag.array(&variable) else {
                    tracing::warn!(domain, variable = %variable, "fragment lacks resample variable");
                    continue;
                };
                let ghost = frag.ghost_zones();
                for cell in 0..frag.n_cells() {
                    if ghost.is_some_and(|g| g[cell]) {
                        continue;
                    }
                    let Some(center) = frag.cell_center(cell) else {
                        continue;
                    };
                    let Some(idx) = sample_index(&bounds, dims, center) else {
                        continue;
                    };
                    let value = array.values[cell];
                    if !filled[idx] {
                        samples[idx] = value;
                        filled[idx] = true;
                    } else if arbitrator.should_overwrite(samples[idx], value) {
                        samples[idx] = value;
                    }
                }
            }

            if !filled.iter().any(|&f| f) {
                return Ok(None);
            }

            let mut out = GridFragment::structured(dims, bounds);
            out.set_array(variable.clone(), ArrayData::cell(samples));
            Ok(Some(out))
        })
        .map(|tree| {
            if tree.is_empty() {
                tracing::debug!("resample produced no samples");
            }
            tree
        })
    }
}

/// Linear cell index of the sample containing `point`, or `None` outside.
fn sample_index(bounds: &Extents, dims: [usize; 3], point: [f64; 3]) -> Option<usize> {
    let mut idx = [0usize; 3];
    for a in 0..3 {
        let width = bounds.width(a);
        if width <= 0.0 {
            if point[a] != bounds.min[a] {
                return None;
            }
            idx[a] = 0;
            continue;
        }
        let t = (point[a] - bounds.min[a]) / width;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        idx[a] = ((t * dims[a] as f64) as usize).min(dims[a] - 1);
    }
    Some(idx[0] + dims[0] * (idx[1] + dims[1] * idx[2]))
}

//! SIL restriction filter.
//!
//! Contributes its restriction during contract propagation and passes data
//! through untouched: the actual subsetting happens at the source, which
//! reads only the domains the intersected restriction implies.

use crate::contract::Contract;
use crate::data::tree::DataTree;
use crate::error::{EngineError, Result};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::node::PipelineNode;
use crate::sil::SilRestriction;

/// Pass-through filter carrying a SIL restriction.
pub struct RestrictionFilter {
    restriction: SilRestriction,
}

impl RestrictionFilter {
    pub fn new(restriction: SilRestriction) -> Self {
        Self { restriction }
    }

    pub fn restriction(&self) -> &SilRestriction {
        &self.restriction
    }

    /// Replace the restriction. The graph marks the node stale through its
    /// `with_node_mut` edit point.
    pub fn set_restriction(&mut self, restriction: SilRestriction) {
        self.restriction = restriction;
    }
}

impl PipelineNode for RestrictionFilter {
    fn name(&self) -> &str {
        "RestrictionFilter"
    }

    fn arity(&self) -> usize {
        1
    }

    fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        let combined = contract
            .request()
            .restriction()
            .intersect(&self.restriction)
            .ok_or_else(|| {
                EngineError::IncompatibleRequest(
                    "restriction filter uses a different lattice than the contract".to_string(),
                )
            })?;
        Ok(contract.map_request(|r| r.with_restriction(combined)))
    }

    fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        _contract: &Contract,
        _ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        let mut inputs = inputs;
        Ok(inputs.pop().expect("restriction filter requires one input"))
    }
}

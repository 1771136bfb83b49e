//! Two-input arithmetic filter.
//!
//! Zips its inputs domain-by-domain: both upstream trees must cover the same
//! domain decomposition or the zip fails with `StructureMismatch`.

use crate::contract::Contract;
use crate::data::fragment::{ArrayData, GridFragment};
use crate::data::tree::DataTree;
use crate::error::{EngineError, Result};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::node::PipelineNode;
use crate::pipeline::streamer;

/// The element-wise combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    Add,
    Sub,
    Mul,
    /// Division by zero follows IEEE semantics (inf / NaN).
    Div,
}

impl CombineOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            CombineOp::Add => a + b,
            CombineOp::Sub => a - b,
            CombineOp::Mul => a * b,
            CombineOp::Div => a / b,
        }
    }
}

/// `output_var = op(variable from input 0, variable from input 1)`.
pub struct CombineFilter {
    op: CombineOp,
    variable: String,
    output_var: String,
}

impl CombineFilter {
    pub fn new(op: CombineOp, variable: impl Into<String>, output_var: impl Into<String>) -> Self {
        Self {
            op,
            variable: variable.into(),
            output_var: output_var.into(),
        }
    }
}

impl PipelineNode for CombineFilter {
    fn name(&self) -> &str {
        "CombineFilter"
    }

    fn arity(&self) -> usize {
        2
    }

    fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        if contract.request().variable() == self.variable
            || contract.request().secondary_variables().contains(&self.variable)
        {
            return Ok(contract.clone());
        }
        let var = self.variable.clone();
        Ok(contract.map_request(|r| r.with_secondary_variable(var)))
    }

    fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        _contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        let op = self.op;
        let variable = self.variable.clone();
        let output_var = self.output_var.clone();

        streamer::zip_trees(inputs, ctx, &mut |frags, domain| {
            let a = frags[0].array(&variable).ok_or_else(|| {
                EngineError::UnknownVariable {
                    variable: variable.clone(),
                    domain,
                }
            })?;
            let b = frags[1].array(&variable).ok_or_else(|| {
                EngineError::UnknownVariable {
                    variable: variable.clone(),
                    domain,
                }
            })?;
            if a.values.len() != b.values.len() || a.centering != b.centering {
                return Err(EngineError::StructureMismatch {
                    expected: format!("{} {:?} values", a.values.len(), a.centering),
                    found: format!("{} {:?} values", b.values.len(), b.centering),
                });
            }

            let out = ArrayData {
                centering: a.centering,
                values: a
                    .values
                    .iter()
                    .zip(b.values.iter())
                    .map(|(&x, &y)| op.apply(x, y))
                    .collect(),
            };
            let mut result: GridFragment = frags[0].clone();
            result.set_array(output_var.clone(), out);
            Ok(Some(result))
        })
    }
}

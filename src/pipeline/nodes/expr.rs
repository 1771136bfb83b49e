//! Per-cell math filter.
//!
//! All the leaf array operations share one shape — array in, array out — so
//! they are a tagged variant on a single node type rather than a node type
//! per operator. The operand is requested through the contract as a
//! secondary variable, so the source reads it even when it is not the
//! pipeline's primary variable.

use crate::contract::Contract;
use crate::data::fragment::{ArrayData, GridFragment};
use crate::data::tree::DataTree;
use crate::error::{EngineError, Result};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::node::PipelineNode;
use crate::pipeline::streamer;

/// The per-value operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExprOp {
    Scale(f64),
    Offset(f64),
    Abs,
    /// Square root; negative inputs become NaN, as with `f64::sqrt`.
    Sqrt,
    Clamp { min: f64, max: f64 },
}

impl ExprOp {
    fn apply(self, v: f64) -> f64 {
        match self {
            ExprOp::Scale(s) => v * s,
            ExprOp::Offset(o) => v + o,
            ExprOp::Abs => v.abs(),
            ExprOp::Sqrt => v.sqrt(),
            ExprOp::Clamp { min, max } => v.clamp(min, max),
        }
    }
}

/// Unary array-math node: `output_var = op(input_var)` per element.
pub struct ExprFilter {
    op: ExprOp,
    input_var: String,
    output_var: String,
}

impl ExprFilter {
    pub fn new(op: ExprOp, input_var: impl Into<String>, output_var: impl Into<String>) -> Self {
        Self {
            op,
            input_var: input_var.into(),
            output_var: output_var.into(),
        }
    }

    pub fn op(&self) -> ExprOp {
        self.op
    }

    pub fn set_op(&mut self, op: ExprOp) {
        self.op = op;
    }
}

impl PipelineNode for ExprFilter {
    fn name(&self) -> &str {
        "ExprFilter"
    }

    fn arity(&self) -> usize {
        1
    }

    fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        if contract.request().variable() == self.input_var
            || contract.request().secondary_variables().contains(&self.input_var)
        {
            return Ok(contract.clone());
        }
        let var = self.input_var.clone();
        Ok(contract.map_request(|r| r.with_secondary_variable(var)))
    }

    fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        _contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        let mut inputs = inputs;
        let input = inputs.pop().expect("expr filter requires one input");

        let op = self.op;
        let input_var = self.input_var.clone();
        let output_var = self.output_var.clone();

        streamer::map_tree(input, ctx, &mut |frag, domain| {
            let array = frag.array(&input_var).ok_or_else(|| {
                EngineError::UnknownVariable {
                    variable: input_var.clone(),
                    domain,
                }
            })?;
            let out = ArrayData {
                centering: array.centering,
                values: array.values.iter().map(|&v| op.apply(v)).collect(),
            };
            let mut result: GridFragment = frag.clone();
            result.set_array(output_var.clone(), out);
            Ok(Some(result))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DataRequest;
    use crate::sil::{CollectionRole, Sil, SilRestriction};
    use crate::types::Extents;
    use std::sync::Arc;

    fn contract() -> Contract {
        let mut sil = Sil::new("whole");
        let domains = sil.add_collection(sil.top(), "domains", CollectionRole::Domain);
        sil.add_set(domains, "domain0", Some(0));
        Contract::new(DataRequest::new(
            "mesh",
            "pressure",
            SilRestriction::new(Arc::new(sil)),
        ))
    }

    fn input_tree() -> DataTree {
        let mut f = GridFragment::structured([2, 1, 1], Extents::new([0.0; 3], [1.0; 3]));
        f.set_array("pressure", ArrayData::cell(vec![1.0, -4.0]));
        DataTree::leaf(0, f)
    }

    #[test]
    fn test_scale() {
        let mut filter = ExprFilter::new(ExprOp::Scale(2.0), "pressure", "pressure2x");
        let out = filter
            .execute(vec![input_tree()], &contract(), &ExecutionContext::new())
            .unwrap();
        let frag = out.fragment_for_domain(0).unwrap();
        assert_eq!(frag.array("pressure2x").unwrap().values, vec![2.0, -8.0]);
        // The input array survives alongside the derived one.
        assert_eq!(frag.array("pressure").unwrap().values, vec![1.0, -4.0]);
    }

    #[test]
    fn test_abs_and_clamp() {
        assert_eq!(ExprOp::Abs.apply(-3.0), 3.0);
        assert_eq!(ExprOp::Clamp { min: 0.0, max: 1.0 }.apply(5.0), 1.0);
        assert!(ExprOp::Sqrt.apply(-1.0).is_nan());
    }

    #[test]
    fn test_missing_variable() {
        let mut filter = ExprFilter::new(ExprOp::Abs, "missing", "out");
        let res = filter.execute(vec![input_tree()], &contract(), &ExecutionContext::new());
        assert!(matches!(res, Err(EngineError::UnknownVariable { .. })));
    }

    #[test]
    fn test_modify_contract_requests_operand() {
        let filter = ExprFilter::new(ExprOp::Abs, "density", "abs_density");
        let modified = filter.modify_contract(&contract()).unwrap();
        assert!(modified
            .request()
            .secondary_variables()
            .contains("density"));

        // Operand already the primary variable: nothing to add.
        let filter = ExprFilter::new(ExprOp::Abs, "pressure", "abs_pressure");
        let modified = filter.modify_contract(&contract()).unwrap();
        assert!(modified.request().secondary_variables().is_empty());
    }
}

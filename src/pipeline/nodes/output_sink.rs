//! Terminating sink.
//!
//! Passes its input through as its own output (so `output()` on the sink's
//! slot yields the final tree) and reports the empty-result condition over
//! the status channel. Empty output is user-visible but non-fatal: the
//! pipeline stays valid.

use crate::contract::Contract;
use crate::data::tree::DataTree;
use crate::error::Result;
use crate::pipeline::context::{EngineMessage, ExecutionContext};
use crate::pipeline::node::PipelineNode;

/// Pass-through sink node.
pub struct OutputSink {
    label: String,
}

impl OutputSink {
    pub fn new() -> Self {
        Self {
            label: "OutputSink".to_string(),
        }
    }

    /// A sink with a distinguishing label (several sinks may share a graph).
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineNode for OutputSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn arity(&self) -> usize {
        1
    }

    fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        _contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        let mut inputs = inputs;
        let tree = inputs.pop().expect("sink requires one input");
        if tree.is_empty() {
            ctx.report(EngineMessage::YieldedNoData {
                node: self.label.clone(),
            });
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DataRequest;
    use crate::sil::{CollectionRole, Sil, SilRestriction};
    use crossbeam_channel::unbounded;
    use std::sync::Arc;

    fn contract() -> Contract {
        let mut sil = Sil::new("whole");
        let domains = sil.add_collection(sil.top(), "domains", CollectionRole::Domain);
        sil.add_set(domains, "domain0", Some(0));
        Contract::new(DataRequest::new("mesh", "v", SilRestriction::new(Arc::new(sil))))
    }

    #[test]
    fn test_empty_result_reported() {
        let (tx, rx) = unbounded();
        let ctx = ExecutionContext::new().with_progress(tx);
        let mut sink = OutputSink::labeled("plot");
        let out = sink.execute(vec![DataTree::Empty], &contract(), &ctx).unwrap();
        assert!(out.is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineMessage::YieldedNoData {
                node: "plot".to_string()
            }
        );
    }
}

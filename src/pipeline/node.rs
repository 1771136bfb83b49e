//! Node abstraction for the pipeline graph.
//!
//! Two-layer design:
//! - **`PipelineNode` trait** — for extensibility (custom filters supplied by
//!   embedders).
//! - **`BuiltinNode` enum** — for the built-in nodes, dispatched by match.
//!
//! `AnyNode` wraps either variant so the graph handles both uniformly. A
//! node's dual source/sink nature is expressed by composition: `arity` says
//! how many upstream inputs it consumes, `execute` produces its one output
//! tree, and `modify_contract` is its chance to add requirements before the
//! contract travels further upstream.

use crate::contract::Contract;
use crate::data::tree::DataTree;
use crate::error::Result;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::nodes::{
    ChunkFilter, CombineFilter, DatabaseSource, ExprFilter, OutputSink, ResampleFilter,
    RestrictionFilter,
};

/// Execution states of a pipeline node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Never executed.
    Unexecuted,
    /// Output matches the last contract; safe to reuse.
    Valid,
    /// Something upstream or in the node's own parameters changed.
    Stale,
}

/// Trait for pluggable/user-defined nodes.
pub trait PipelineNode: Send {
    /// Human-readable name of this node.
    fn name(&self) -> &str;

    /// Number of upstream inputs this node consumes. 0 for sources.
    fn arity(&self) -> usize;

    /// Transform the contract before it is passed to upstream inputs.
    ///
    /// The default adds nothing. Implementations must not weaken the
    /// contract — only add restrictions, variables, or ghost requirements.
    fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        Ok(contract.clone())
    }

    /// Produce this node's output tree from its input trees.
    ///
    /// `inputs.len()` equals `arity()`; the graph enforces this before
    /// calling.
    fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree>;
}

/// Enum dispatch for built-in nodes.
pub enum BuiltinNode {
    Source(DatabaseSource),
    Restriction(RestrictionFilter),
    Expr(ExprFilter),
    Combine(CombineFilter),
    Chunk(ChunkFilter),
    Resample(ResampleFilter),
    Sink(OutputSink),
}

impl BuiltinNode {
    pub fn name(&self) -> &str {
        match self {
            BuiltinNode::Source(n) => n.name(),
            BuiltinNode::Restriction(n) => n.name(),
            BuiltinNode::Expr(n) => n.name(),
            BuiltinNode::Combine(n) => n.name(),
            BuiltinNode::Chunk(n) => n.name(),
            BuiltinNode::Resample(n) => n.name(),
            BuiltinNode::Sink(n) => n.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            BuiltinNode::Source(n) => n.arity(),
            BuiltinNode::Restriction(n) => n.arity(),
            BuiltinNode::Expr(n) => n.arity(),
            BuiltinNode::Combine(n) => n.arity(),
            BuiltinNode::Chunk(n) => n.arity(),
            BuiltinNode::Resample(n) => n.arity(),
            BuiltinNode::Sink(n) => n.arity(),
        }
    }

    pub fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        match self {
            BuiltinNode::Source(n) => n.modify_contract(contract),
            BuiltinNode::Restriction(n) => n.modify_contract(contract),
            BuiltinNode::Expr(n) => n.modify_contract(contract),
            BuiltinNode::Combine(n) => n.modify_contract(contract),
            BuiltinNode::Chunk(n) => n.modify_contract(contract),
            BuiltinNode::Resample(n) => n.modify_contract(contract),
            BuiltinNode::Sink(n) => n.modify_contract(contract),
        }
    }

    pub fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        match self {
            BuiltinNode::Source(n) => n.execute(inputs, contract, ctx),
            BuiltinNode::Restriction(n) => n.execute(inputs, contract, ctx),
            BuiltinNode::Expr(n) => n.execute(inputs, contract, ctx),
            BuiltinNode::Combine(n) => n.execute(inputs, contract, ctx),
            BuiltinNode::Chunk(n) => n.execute(inputs, contract, ctx),
            BuiltinNode::Resample(n) => n.execute(inputs, contract, ctx),
            BuiltinNode::Sink(n) => n.execute(inputs, contract, ctx),
        }
    }
}

/// Wrapper holding either a built-in node (enum dispatch) or a plugin
/// (trait object).
pub enum AnyNode {
    Builtin(BuiltinNode),
    Plugin(Box<dyn PipelineNode>),
}

impl AnyNode {
    pub fn name(&self) -> &str {
        match self {
            AnyNode::Builtin(n) => n.name(),
            AnyNode::Plugin(n) => n.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            AnyNode::Builtin(n) => n.arity(),
            AnyNode::Plugin(n) => n.arity(),
        }
    }

    pub fn modify_contract(&self, contract: &Contract) -> Result<Contract> {
        match self {
            AnyNode::Builtin(n) => n.modify_contract(contract),
            AnyNode::Plugin(n) => n.modify_contract(contract),
        }
    }

    pub fn execute(
        &mut self,
        inputs: Vec<DataTree>,
        contract: &Contract,
        ctx: &ExecutionContext,
    ) -> Result<DataTree> {
        match self {
            AnyNode::Builtin(n) => n.execute(inputs, contract, ctx),
            AnyNode::Plugin(n) => n.execute(inputs, contract, ctx),
        }
    }
}

//! The pipeline graph and its lazy update protocol.
//!
//! Nodes live in an arena (`Vec<NodeSlot>`), edges are explicit, and ids are
//! array indices. Execution is pull-based: `update(sink, contract)` recurses
//! upstream depth-first, each node transforming the contract via
//! `modify_contract` before passing it on, then re-executes only when
//!
//! - it has never executed,
//! - an upstream input's output version changed,
//! - its own parameters changed since the last execution, or
//! - the effective contract differs structurally from the last one.
//!
//! Otherwise the call is a pure cache hit: at most one execution per
//! (node, distinct contract) until something invalidates it. Errors and
//! aborts propagate to the initiating sink without touching any node's
//! last-known-good output.

use crate::cache::{
    data_extents_of_tree, spatial_extents_of_tree, ExtentsCache, ExtentsKind,
};
use crate::contract::Contract;
use crate::types::Extents;
use crate::data::object::{DataInfo, DataObject};
use crate::data::tree::DataTree;
use crate::error::Result;
use crate::pipeline::context::{EngineMessage, ExecutionContext};
use crate::pipeline::id::{EdgeId, NodeId};
use crate::pipeline::node::{AnyNode, NodeState};

/// An edge connecting the output of one node to an input of another.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub to_node: NodeId,
}

/// A slot holding a node, its published output, and its caching state.
pub struct NodeSlot {
    node: AnyNode,
    output: DataObject,
    state: NodeState,
    last_contract: Option<Contract>,
    /// Bumped by `with_node_mut`; compared against `executed_generation` to
    /// detect parameter changes.
    params_generation: u64,
    executed_generation: u64,
    /// Output versions of the inputs at the last execution, in edge order.
    input_versions: Vec<u64>,
    execute_count: u64,
}

impl NodeSlot {
    fn new(node: AnyNode) -> Self {
        Self {
            node,
            output: DataObject::empty(),
            state: NodeState::Unexecuted,
            last_contract: None,
            params_generation: 0,
            executed_generation: 0,
            input_versions: Vec::new(),
            execute_count: 0,
        }
    }
}

/// The dataflow graph: arena of node slots plus explicit edges.
pub struct PipelineGraph {
    nodes: Vec<NodeSlot>,
    edges: Vec<Edge>,
    /// Extents memoized per (kind, variable, contract fingerprint). A
    /// contract-parameter change produces a fresh fingerprint, so stale
    /// entries simply stop being hit.
    extents: ExtentsCache,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            extents: ExtentsCache::new(),
        }
    }

    // ── Graph building ──

    /// Add a node. Returns its id.
    pub fn add_node(&mut self, node: AnyNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeSlot::new(node));
        id
    }

    /// Connect the output of `from` to an input of `to`.
    ///
    /// Panics on out-of-range ids, self-loops, cycles, or over-wiring a
    /// node beyond its arity — all graph-construction bugs.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> EdgeId {
        assert!(
            from.index() < self.nodes.len() && to.index() < self.nodes.len(),
            "add_edge: {:?} -> {:?} out of range",
            from,
            to
        );
        assert_ne!(from, to, "add_edge: cannot connect a node to itself");
        assert!(
            !self.would_create_cycle(from, to),
            "add_edge: {:?} -> {:?} would create a cycle",
            from,
            to
        );
        let existing = self.inputs_of(to).len();
        let arity = self.nodes[to.index()].node.arity();
        assert!(
            existing < arity,
            "add_edge: {} accepts {} inputs, already has {}",
            self.nodes[to.index()].node.name(),
            arity,
            existing
        );

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            from_node: from,
            to_node: to,
        });
        id
    }

    /// Upstream inputs of a node, in edge insertion order.
    pub fn inputs_of(&self, node: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.to_node == node)
            .map(|e| e.from_node)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ── Accessors ──

    pub fn node(&self, id: NodeId) -> &AnyNode {
        &self.nodes[id.index()].node
    }

    /// The node's published output.
    pub fn output(&self, id: NodeId) -> &DataObject {
        &self.nodes[id.index()].output
    }

    pub fn state(&self, id: NodeId) -> NodeState {
        self.nodes[id.index()].state
    }

    /// How many times the node has executed.
    pub fn execute_count(&self, id: NodeId) -> u64 {
        self.nodes[id.index()].execute_count
    }

    /// Spatial extents of a node's output, memoized by the contract it last
    /// executed under. `None` before the first execution.
    pub fn spatial_extents(&mut self, id: NodeId) -> Option<Extents> {
        let slot = &self.nodes[id.index()];
        let contract = slot.last_contract.as_ref()?;
        let fingerprint = Self::extents_key(contract, &slot.output);
        let variable = contract.request().mesh().to_string();
        let tree = slot.output.tree();
        let extents = self
            .extents
            .get_or_compute(ExtentsKind::Spatial, &variable, fingerprint, || {
                spatial_extents_of_tree(&tree)
            });
        (!extents.is_empty()).then_some(extents)
    }

    /// Min/max of a variable over a node's output, memoized by the contract
    /// it last executed under.
    pub fn data_extents(&mut self, id: NodeId, variable: &str) -> Option<(f64, f64)> {
        let slot = &self.nodes[id.index()];
        let contract = slot.last_contract.as_ref()?;
        let fingerprint = Self::extents_key(contract, &slot.output);
        let tree = slot.output.tree();
        let var = variable.to_string();
        let extents = self
            .extents
            .get_or_compute(ExtentsKind::Data, variable, fingerprint, || {
                match data_extents_of_tree(&tree, &var) {
                    Some((lo, hi)) => Extents::new([lo, 0.0, 0.0], [hi, 0.0, 0.0]),
                    None => Extents::EMPTY,
                }
            });
        if extents.min[0] > extents.max[0] {
            None
        } else {
            Some((extents.min[0], extents.max[0]))
        }
    }

    /// Extents-cache statistics (hits, misses), observable for tests.
    pub fn extents_cache_stats(&self) -> (u64, u64) {
        (self.extents.hits(), self.extents.misses())
    }

    /// Cache key: contract fingerprint mixed with the output version, so a
    /// re-execution under the same contract never replays stale extents.
    fn extents_key(contract: &Contract, output: &DataObject) -> u64 {
        contract
            .fingerprint()
            .wrapping_add(output.version().wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Edit a node's parameters. The slot is marked stale so the next
    /// `update` re-executes it.
    pub fn with_node_mut<F, R>(&mut self, id: NodeId, f: F) -> R
    where
        F: FnOnce(&mut AnyNode) -> R,
    {
        let slot = &mut self.nodes[id.index()];
        slot.params_generation += 1;
        if slot.state == NodeState::Valid {
            slot.state = NodeState::Stale;
        }
        f(&mut slot.node)
    }

    // ── The update protocol ──

    /// Drive a lazy (re-)execution from `sink`. Returns whether the sink's
    /// output changed.
    pub fn update(
        &mut self,
        sink: NodeId,
        contract: Contract,
        ctx: &ExecutionContext,
    ) -> Result<bool> {
        assert!(
            sink.index() < self.nodes.len(),
            "update: {:?} out of range",
            sink
        );
        ctx.report(EngineMessage::UpdateStarted {
            pipeline_index: contract.pipeline_index(),
        });

        let result = self.update_node(sink.index(), contract, ctx);
        match &result {
            Ok(changed) => ctx.report(EngineMessage::UpdateFinished { changed: *changed }),
            Err(crate::error::EngineError::Aborted) => ctx.report(EngineMessage::Aborted),
            Err(_) => {}
        }
        result
    }

    fn update_node(
        &mut self,
        idx: usize,
        contract: Contract,
        ctx: &ExecutionContext,
    ) -> Result<bool> {
        // This node's additions travel upstream with the contract.
        let modified = self.nodes[idx].node.modify_contract(&contract)?;

        let input_ids: Vec<usize> = self
            .edges
            .iter()
            .filter(|e| e.to_node.index() == idx)
            .map(|e| e.from_node.index())
            .collect();
        let arity = self.nodes[idx].node.arity();
        assert_eq!(
            input_ids.len(),
            arity,
            "node {} expects {} inputs, has {} wired",
            self.nodes[idx].node.name(),
            arity,
            input_ids.len()
        );

        // Depth-first: upstream settles before this node decides anything.
        for &input in &input_ids {
            self.update_node(input, modified.clone(), ctx)?;
        }
        let input_versions: Vec<u64> = input_ids
            .iter()
            .map(|&i| self.nodes[i].output.version())
            .collect();

        // Ghost flags are shared-OR across contracts hitting one physical
        // node: the underlying fragments are shared, so any requester
        // wanting ghosts forces them for all sharers.
        let slot = &self.nodes[idx];
        let effective = match &slot.last_contract {
            Some(last) if last.request().mesh() == modified.request().mesh() => {
                modified.union_ghost(last)
            }
            _ => modified,
        };

        let upstream_changed = slot.input_versions != input_versions;
        let params_changed = slot.params_generation != slot.executed_generation;
        let contract_changed = slot
            .last_contract
            .as_ref()
            .map_or(true, |last| !last.identical(&effective));

        let needs_execute = match slot.state {
            NodeState::Unexecuted | NodeState::Stale => true,
            NodeState::Valid => upstream_changed || params_changed || contract_changed,
        };

        if !needs_execute {
            tracing::debug!(node = slot.node.name(), "update skipped (cache hit)");
            return Ok(false);
        }

        if self.nodes[idx].state == NodeState::Valid {
            self.nodes[idx].state = NodeState::Stale;
        }

        // Gather shared input trees, then execute.
        let inputs: Vec<DataTree> = input_ids
            .iter()
            .map(|&i| (*self.nodes[i].output.tree()).clone())
            .collect();

        let slot = &mut self.nodes[idx];
        let tree = slot.node.execute(inputs, &effective, ctx)?;
        let fragments = tree.leaf_count();
        let info = DataInfo {
            mesh: Some(effective.request().mesh().to_string()),
            variable: Some(effective.request().variable().to_string()),
            spatial_extents: (!tree.is_empty()).then(|| spatial_extents_of_tree(&tree)),
        };

        slot.output.publish(tree, info);
        slot.state = NodeState::Valid;
        slot.last_contract = Some(effective);
        slot.executed_generation = slot.params_generation;
        slot.input_versions = input_versions;
        slot.execute_count += 1;

        tracing::info!(
            node = slot.node.name(),
            fragments,
            version = slot.output.version(),
            "node executed"
        );
        ctx.report(EngineMessage::NodeExecuted {
            node: slot.node.name().to_string(),
            fragments,
        });
        Ok(true)
    }

    /// True when adding `from -> to` would close a cycle.
    fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        // If `from` is reachable from `to`, the new edge closes a loop.
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![to];
        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            let idx = current.index();
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            for edge in &self.edges {
                if edge.from_node == current {
                    stack.push(edge.to_node);
                }
            }
        }
        false
    }
}

impl Default for PipelineGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DataRequest;
    use crate::data::fragment::GridFragment;
    use crate::pipeline::node::PipelineNode;
    use crate::sil::{CollectionRole, Sil, SilRestriction};
    use crate::types::Extents;
    use std::sync::Arc;

    /// Minimal plugin source that counts executions.
    struct CountingSource {
        executions: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl PipelineNode for CountingSource {
        fn name(&self) -> &str {
            "CountingSource"
        }

        fn arity(&self) -> usize {
            0
        }

        fn execute(
            &mut self,
            _inputs: Vec<DataTree>,
            _contract: &Contract,
            _ctx: &ExecutionContext,
        ) -> Result<DataTree> {
            self.executions
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let frag = GridFragment::structured([1, 1, 1], Extents::new([0.0; 3], [1.0; 3]));
            Ok(DataTree::leaf(0, frag))
        }
    }

    struct Passthrough;

    impl PipelineNode for Passthrough {
        fn name(&self) -> &str {
            "Passthrough"
        }

        fn arity(&self) -> usize {
            1
        }

        fn execute(
            &mut self,
            mut inputs: Vec<DataTree>,
            _contract: &Contract,
            _ctx: &ExecutionContext,
        ) -> Result<DataTree> {
            Ok(inputs.pop().unwrap())
        }
    }

    fn contract() -> Contract {
        let mut sil = Sil::new("whole");
        let domains = sil.add_collection(sil.top(), "domains", CollectionRole::Domain);
        sil.add_set(domains, "domain0", Some(0));
        Contract::new(DataRequest::new("mesh", "v", SilRestriction::new(Arc::new(sil))))
    }

    fn counting_graph() -> (PipelineGraph, NodeId, NodeId, Arc<std::sync::atomic::AtomicUsize>) {
        let executions = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut graph = PipelineGraph::new();
        let source = graph.add_node(AnyNode::Plugin(Box::new(CountingSource {
            executions: Arc::clone(&executions),
        })));
        let sink = graph.add_node(AnyNode::Plugin(Box::new(Passthrough)));
        graph.add_edge(source, sink);
        (graph, source, sink, executions)
    }

    #[test]
    fn test_first_update_executes() {
        let (mut graph, source, sink, executions) = counting_graph();
        let ctx = ExecutionContext::new();
        let changed = graph.update(sink, contract(), &ctx).unwrap();
        assert!(changed);
        assert_eq!(executions.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(graph.state(source), NodeState::Valid);
        assert_eq!(graph.output(sink).version(), 1);
    }

    #[test]
    fn test_identical_contract_is_cache_hit() {
        let (mut graph, _source, sink, executions) = counting_graph();
        let ctx = ExecutionContext::new();
        let c = contract();
        assert!(graph.update(sink, c.clone(), &ctx).unwrap());
        assert!(!graph.update(sink, c.clone(), &ctx).unwrap());
        assert!(!graph.update(sink, c, &ctx).unwrap());
        assert_eq!(executions.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(graph.output(sink).version(), 1);
    }

    #[test]
    fn test_changed_contract_reexecutes() {
        let (mut graph, _source, sink, executions) = counting_graph();
        let ctx = ExecutionContext::new();
        let c = contract();
        graph.update(sink, c.clone(), &ctx).unwrap();
        let c2 = c.map_request(|r| r.with_secondary_variable("extra"));
        assert!(graph.update(sink, c2, &ctx).unwrap());
        assert_eq!(executions.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn test_param_change_reexecutes() {
        let (mut graph, _source, sink, executions) = counting_graph();
        let ctx = ExecutionContext::new();
        let c = contract();
        graph.update(sink, c.clone(), &ctx).unwrap();

        graph.with_node_mut(sink, |_node| {});
        assert_eq!(graph.state(sink), NodeState::Stale);

        assert!(graph.update(sink, c, &ctx).unwrap());
        // Only the sink re-executed; the source was a cache hit.
        assert_eq!(executions.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(graph.output(sink).version(), 2);
    }

    #[test]
    fn test_failed_update_preserves_output() {
        struct FailingFilter {
            fail: Arc<std::sync::atomic::AtomicBool>,
        }
        impl PipelineNode for FailingFilter {
            fn name(&self) -> &str {
                "FailingFilter"
            }
            fn arity(&self) -> usize {
                1
            }
            fn execute(
                &mut self,
                mut inputs: Vec<DataTree>,
                _contract: &Contract,
                _ctx: &ExecutionContext,
            ) -> Result<DataTree> {
                if self.fail.load(std::sync::atomic::Ordering::Relaxed) {
                    Err(crate::error::EngineError::Database("boom".to_string()))
                } else {
                    Ok(inputs.pop().unwrap())
                }
            }
        }

        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let executions = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut graph = PipelineGraph::new();
        let source = graph.add_node(AnyNode::Plugin(Box::new(CountingSource {
            executions: Arc::clone(&executions),
        })));
        let filter = graph.add_node(AnyNode::Plugin(Box::new(FailingFilter {
            fail: Arc::clone(&fail),
        })));
        graph.add_edge(source, filter);

        let ctx = ExecutionContext::new();
        let c = contract();
        graph.update(filter, c.clone(), &ctx).unwrap();
        let version_before = graph.output(filter).version();

        // Force a re-execution attempt that fails.
        fail.store(true, std::sync::atomic::Ordering::Relaxed);
        graph.with_node_mut(filter, |_| {});
        assert!(graph.update(filter, c.clone(), &ctx).is_err());

        // Last-known-good output intact, node still stale.
        assert_eq!(graph.output(filter).version(), version_before);
        assert_eq!(graph.state(filter), NodeState::Stale);

        // Recovery: clear the failure and update again.
        fail.store(false, std::sync::atomic::Ordering::Relaxed);
        assert!(graph.update(filter, c, &ctx).unwrap());
        assert_eq!(graph.state(filter), NodeState::Valid);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn test_cycle_panics() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_node(AnyNode::Plugin(Box::new(Passthrough)));
        let b = graph.add_node(AnyNode::Plugin(Box::new(Passthrough)));
        graph.add_edge(a, b);
        graph.add_edge(b, a);
    }

    #[test]
    #[should_panic(expected = "accepts")]
    fn test_overwiring_panics() {
        let (mut graph, _source, sink, _executions) = counting_graph();
        let extra = graph.add_node(AnyNode::Plugin(Box::new(Passthrough)));
        // Sink arity is 1 and it already has an input.
        graph.add_edge(extra, sink);
    }

    #[test]
    fn test_two_pipeline_indices_no_crosstalk() {
        let (mut graph, _source, sink, _executions) = counting_graph();
        let ctx = ExecutionContext::new();
        let c0 = contract();
        let c1 = c0.with_pipeline_index(1);

        graph.update(sink, c0.clone(), &ctx).unwrap();
        // A different logical pipeline re-executes (distinct contract)...
        assert!(graph.update(sink, c1.clone(), &ctx).unwrap());
        // ...and repeating it is again a cache hit.
        assert!(!graph.update(sink, c1, &ctx).unwrap());
    }
}

//! Builders for the synthetic datasets and pipelines the integration tests
//! share.

use std::sync::Arc;
use visflow::contract::{Contract, DataRequest};
use visflow::db::{sil_from_metadata, MemoryDatabase};
use visflow::pipeline::nodes::{DatabaseSource, OutputSink, RestrictionFilter};
use visflow::pipeline::{AnyNode, BuiltinNode, NodeId, PipelineGraph};
use visflow::sil::{Sil, SilRestriction};
use visflow::types::Extents;

/// Two domains side by side; four materials, two per domain:
/// domain 0 holds materials {0, 1}, domain 1 holds {2, 3}.
pub fn two_domain_four_material_db() -> Arc<MemoryDatabase> {
    Arc::new(
        MemoryDatabase::builder("mesh")
            .materials(["0", "1", "2", "3"])
            .domain([2, 2, 1], Extents::new([0.0; 3], [1.0, 1.0, 1.0]))
            .cell_array(0, "pressure", vec![1.0, 2.0, 3.0, 4.0])
            .material_map(0, vec![0, 0, 1, 1])
            .domain([2, 2, 1], Extents::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]))
            .cell_array(1, "pressure", vec![5.0, 6.0, 7.0, 8.0])
            .material_map(1, vec![2, 2, 3, 3])
            .build(),
    )
}

/// Handles to a freshly built source → restriction → sink pipeline.
pub struct TestPipeline {
    pub graph: PipelineGraph,
    pub source: NodeId,
    pub restriction: NodeId,
    pub sink: NodeId,
    pub sil: Arc<Sil>,
    pub db: Arc<MemoryDatabase>,
}

/// Build the three-node pipeline over the shared synthetic dataset, with
/// the given selection loaded into the restriction filter.
pub fn restriction_pipeline(selection: impl FnOnce(&mut SilRestriction)) -> TestPipeline {
    let db = two_domain_four_material_db();
    let source = DatabaseSource::open(db.clone()).unwrap();
    let sil = Arc::new(sil_from_metadata(source.metadata()));

    let mut restriction = SilRestriction::new(Arc::clone(&sil));
    selection(&mut restriction);

    let mut graph = PipelineGraph::new();
    let source_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Source(source)));
    let restriction_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Restriction(
        RestrictionFilter::new(restriction),
    )));
    let sink_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Sink(OutputSink::new())));
    graph.add_edge(source_id, restriction_id);
    graph.add_edge(restriction_id, sink_id);

    TestPipeline {
        graph,
        source: source_id,
        restriction: restriction_id,
        sink: sink_id,
        sil,
        db,
    }
}

/// A contract over the shared dataset's mesh with an unrestricted selection.
pub fn unrestricted_contract(sil: &Arc<Sil>) -> Contract {
    Contract::new(DataRequest::new(
        "mesh",
        "pressure",
        SilRestriction::new(Arc::clone(sil)),
    ))
}

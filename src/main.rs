//! Demo driver: builds a synthetic multi-domain, multi-material dataset and
//! pulls it through a source → restriction → expression → sink pipeline.

use anyhow::Context as _;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use visflow::config::EngineConfig;
use visflow::contract::{Contract, DataRequest, GhostRequest};
use visflow::db::{restrict_to_materials, sil_from_metadata, MemoryDatabase};
use visflow::pipeline::nodes::{DatabaseSource, ExprFilter, ExprOp, OutputSink, RestrictionFilter};
use visflow::pipeline::{AnyNode, BuiltinNode, ExecutionContext, PipelineGraph};
use visflow::sil::SilRestriction;
use visflow::types::Extents;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::load_or_default("visflow.toml");

    // Two domains side by side, four materials spread across them.
    let db = Arc::new(
        MemoryDatabase::builder("mesh")
            .materials(["0", "1", "2", "3"])
            .domain([2, 2, 1], Extents::new([0.0; 3], [1.0, 1.0, 1.0]))
            .cell_array(0, "pressure", vec![1.0, 2.0, 3.0, 4.0])
            .material_map(0, vec![0, 0, 1, 1])
            .domain([2, 2, 1], Extents::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]))
            .cell_array(1, "pressure", vec![5.0, 6.0, 7.0, 8.0])
            .material_map(1, vec![2, 2, 3, 3])
            .build(),
    );

    let source = DatabaseSource::open(db).context("opening synthetic database")?;
    let sil = Arc::new(sil_from_metadata(source.metadata()));

    // Restrict to material "2" only.
    let mut selection = SilRestriction::new(Arc::clone(&sil));
    restrict_to_materials(&mut selection, &["2"]);
    tracing::info!(domains = ?selection.domain_list(), "restricted selection");

    let mut graph = PipelineGraph::new();
    let source_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Source(source)));
    let restrict_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Restriction(
        RestrictionFilter::new(selection),
    )));
    let expr_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Expr(ExprFilter::new(
        ExprOp::Scale(2.0),
        "pressure",
        "pressure_x2",
    ))));
    let sink_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Sink(OutputSink::labeled(
        "demo sink",
    ))));
    graph.add_edge(source_id, restrict_id);
    graph.add_edge(restrict_id, expr_id);
    graph.add_edge(expr_id, sink_id);

    let mut request = DataRequest::new("mesh", "pressure", SilRestriction::new(sil));
    if config.ghost.always_request_zone_ghosts {
        request = request.with_ghost(GhostRequest {
            zone_ghosts: true,
            node_ghosts: false,
        });
    }
    let contract = Contract::new(request);
    let ctx = ExecutionContext::from_config(&config);

    let changed = graph.update(sink_id, contract.clone(), &ctx)?;
    let tree = graph.output(sink_id).tree();
    let extents = graph.data_extents(sink_id, "pressure_x2");
    tracing::info!(
        changed,
        domains = ?tree.domain_ids(),
        cells = tree.total_cells(),
        ?extents,
        "first update complete"
    );

    // Second update with the identical contract: pure cache hit.
    let changed = graph.update(sink_id, contract, &ctx)?;
    tracing::info!(
        changed,
        source_executions = graph.execute_count(source_id),
        "second update complete"
    );

    Ok(())
}

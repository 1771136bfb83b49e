//! # visflow: contract-driven dataflow for decomposed scientific meshes
//!
//! A lazy, pull-based pipeline engine for datasets split into per-domain
//! mesh fragments. Execution starts at a terminating sink and propagates an
//! immutable *contract* upstream; each node decides whether it must
//! re-execute and streams fragments through itself one domain at a time.
//!
//! ## Architecture
//!
//! - **Contracts** (`contract`): immutable value objects describing what
//!   data a pipeline must produce, with an order-independent merge algebra.
//! - **SIL** (`sil`): the subset inclusion lattice of domains, materials,
//!   and assemblies, with a cheaply-cloned on/off overlay.
//! - **Pipeline** (`pipeline`): the arena graph, the lazy update protocol,
//!   the streaming executor, and the structured-mesh chunker.
//! - **Cache** (`cache`): memoized extents and interval trees keyed by
//!   contract fingerprint.
//! - **Sampling** (`sampling`): sample-point arbitration for resampling.
//! - **Database boundary** (`db`): the `FragmentSource` trait and the
//!   in-memory synthetic database.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use visflow::contract::{Contract, DataRequest};
//! use visflow::db::{sil_from_metadata, MemoryDatabase};
//! use visflow::pipeline::nodes::{DatabaseSource, OutputSink};
//! use visflow::pipeline::{AnyNode, BuiltinNode, ExecutionContext, PipelineGraph};
//! use visflow::sil::SilRestriction;
//! use visflow::types::Extents;
//!
//! let db = Arc::new(
//!     MemoryDatabase::builder("mesh")
//!         .domain([2, 2, 1], Extents::new([0.0; 3], [1.0; 3]))
//!         .cell_array(0, "pressure", vec![1.0, 2.0, 3.0, 4.0])
//!         .build(),
//! );
//! let source = DatabaseSource::open(db).unwrap();
//! let sil = Arc::new(sil_from_metadata(source.metadata()));
//!
//! let mut graph = PipelineGraph::new();
//! let source_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Source(source)));
//! let sink_id = graph.add_node(AnyNode::Builtin(BuiltinNode::Sink(OutputSink::new())));
//! graph.add_edge(source_id, sink_id);
//!
//! let contract = Contract::new(DataRequest::new(
//!     "mesh",
//!     "pressure",
//!     SilRestriction::new(sil),
//! ));
//! let changed = graph
//!     .update(sink_id, contract, &ExecutionContext::new())
//!     .unwrap();
//! assert!(changed);
//! assert_eq!(graph.output(sink_id).tree().domain_ids(), vec![0]);
//! ```

pub mod cache;
pub mod config;
pub mod contract;
pub mod data;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod reduce;
pub mod sampling;
pub mod sil;
pub mod types;

// Re-export commonly used types.
pub use config::EngineConfig;
pub use contract::{Contract, DataRequest};
pub use data::{DataObject, DataTree, GridFragment};
pub use error::{EngineError, Result};
pub use pipeline::{ExecutionContext, PipelineGraph};
pub use sil::{Sil, SilRestriction};

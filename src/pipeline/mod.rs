//! The dataflow pipeline: graph, update protocol, streaming execution.
//!
//! ```text
//! [DatabaseSource] ──► [RestrictionFilter] ──► [ExprFilter] ──► [OutputSink]
//! ```
//!
//! # Design
//!
//! - **Pull-based** — a sink's `update(contract)` recurses upstream; nothing
//!   executes until someone asks.
//! - **Contract-driven** — each node adds its requirements (variables,
//!   restrictions, ghosts) to the contract before it travels further up.
//! - **Cached** — a node re-executes only when upstream output, its own
//!   parameters, or the contract changed; otherwise the call is a no-op.
//! - **Streamed** — fragments flow through filters one domain at a time,
//!   consumed inputs released before the next is touched.
//! - **Arena storage** — nodes in a flat `Vec` addressed by `NodeId`, edges
//!   explicit; no reference cycles between a filter's source and sink roles.

pub mod chunker;
pub mod context;
pub mod executor;
pub mod id;
pub mod node;
pub mod nodes;
pub mod streamer;

pub use chunker::{decompose, decompose_with_limit, Chunk, ZoneDesignation};
pub use context::{EngineMessage, ExecutionContext};
pub use executor::{Edge, NodeSlot, PipelineGraph};
pub use id::{EdgeId, NodeId};
pub use node::{AnyNode, BuiltinNode, NodeState, PipelineNode};

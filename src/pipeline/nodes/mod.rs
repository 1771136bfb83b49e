//! Built-in pipeline nodes.
//!
//! ```text
//! [DatabaseSource] ──► [RestrictionFilter] ──► [ExprFilter] ──► [OutputSink]
//!                                         └──► [ChunkFilter] / [ResampleFilter]
//! ```

pub mod chunk;
pub mod combine;
pub mod database_source;
pub mod expr;
pub mod output_sink;
pub mod resample;
pub mod restriction;

pub use chunk::ChunkFilter;
pub use combine::{CombineFilter, CombineOp};
pub use database_source::DatabaseSource;
pub use expr::{ExprFilter, ExprOp};
pub use output_sink::OutputSink;
pub use resample::ResampleFilter;
pub use restriction::RestrictionFilter;

//! Data model: fragments, domain trees, and published data objects.
//!
//! A `GridFragment` is the opaque per-domain mesh piece (counts, named
//! centered arrays, bounds). A `DataTree` mirrors the dataset decomposition:
//! leaves carry one fragment plus its domain id, interior nodes preserve
//! per-domain/per-material provenance through multi-output filters. A
//! `DataObject` is one node's published output: a shared tree plus a
//! monotonic version counter the update protocol compares against.

pub mod fragment;
pub mod object;
pub mod tree;

pub use fragment::{ArrayData, GridFragment};
pub use object::{DataInfo, DataObject};
pub use tree::DataTree;

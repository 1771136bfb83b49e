//! Subset Inclusion Lattice (SIL).
//!
//! A SIL describes how a dataset decomposes into named subsets: domains,
//! materials, species, assemblies. The lattice itself (`Sil`) is built once
//! from database metadata and never mutated afterwards; which subsets are
//! currently selected lives in a separate, cheaply-cloned overlay
//! (`SilRestriction`) so that contract snapshots never observe torn state.

pub mod lattice;
pub mod restriction;

pub use lattice::{CollectionId, CollectionRole, SetId, Sil, SilCollection, SilSet};
pub use restriction::SilRestriction;

//! A node's published output.
//!
//! A `DataObject` is owned by exactly one node slot and read (shared) by any
//! number of downstream consumers. Publication is the only mutation: a new
//! tree replaces the old one and the version counter bumps, which is what
//! downstream nodes compare to detect upstream change. A published tree is
//! never edited in place.

use crate::data::tree::DataTree;
use crate::types::Extents;
use std::sync::Arc;

/// Descriptive metadata accompanying a data object.
#[derive(Debug, Clone, Default)]
pub struct DataInfo {
    pub mesh: Option<String>,
    pub variable: Option<String>,
    /// Spatial bounds of the published tree, when known.
    pub spatial_extents: Option<Extents>,
}

/// One node's output: shared tree + monotonic version.
#[derive(Debug, Clone)]
pub struct DataObject {
    tree: Arc<DataTree>,
    info: DataInfo,
    version: u64,
}

impl DataObject {
    /// An unexecuted output: empty tree, version 0.
    pub fn empty() -> Self {
        Self {
            tree: Arc::new(DataTree::Empty),
            info: DataInfo::default(),
            version: 0,
        }
    }

    /// Publish a new tree, bumping the version.
    pub fn publish(&mut self, tree: DataTree, info: DataInfo) {
        self.tree = Arc::new(tree);
        self.info = info;
        self.version += 1;
    }

    /// Shared handle to the current tree.
    pub fn tree(&self) -> Arc<DataTree> {
        Arc::clone(&self.tree)
    }

    pub fn info(&self) -> &DataInfo {
        &self.info
    }

    /// Monotonic publication counter. 0 means never executed.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl Default for DataObject {
    fn default() -> Self {
        Self::empty()
    }
}

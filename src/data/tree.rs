//! The recursive domain tree.
//!
//! Leaves hold one fragment plus its domain id; interior nodes group child
//! trees, preserving provenance (per-domain, per-chunk, per-material) across
//! filters. Fragments are behind `Arc` so a published tree can be shared by
//! several downstream sinks while the streamer drops its own references
//! leaf-by-leaf as it consumes them.

use crate::data::fragment::GridFragment;
use std::sync::Arc;

/// Leaf-or-internal tree of per-domain fragments.
#[derive(Debug, Clone)]
pub enum DataTree {
    /// No data. Produced by filters that discard a fragment.
    Empty,
    Leaf {
        domain: usize,
        fragment: Arc<GridFragment>,
    },
    Node(Vec<DataTree>),
}

impl DataTree {
    pub fn leaf(domain: usize, fragment: GridFragment) -> Self {
        DataTree::Leaf {
            domain,
            fragment: Arc::new(fragment),
        }
    }

    pub fn shared_leaf(domain: usize, fragment: Arc<GridFragment>) -> Self {
        DataTree::Leaf { domain, fragment }
    }

    pub fn node(children: Vec<DataTree>) -> Self {
        DataTree::Node(children)
    }

    /// True when no leaf is reachable.
    pub fn is_empty(&self) -> bool {
        match self {
            DataTree::Empty => true,
            DataTree::Leaf { .. } => false,
            DataTree::Node(children) => children.iter().all(|c| c.is_empty()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            DataTree::Empty => 0,
            DataTree::Leaf { .. } => 1,
            DataTree::Node(children) => children.iter().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Domain ids of all leaves, ascending and deduplicated.
    pub fn domain_ids(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_domains(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_domains(&self, out: &mut Vec<usize>) {
        match self {
            DataTree::Empty => {}
            DataTree::Leaf { domain, .. } => out.push(*domain),
            DataTree::Node(children) => {
                for c in children {
                    c.collect_domains(out);
                }
            }
        }
    }

    /// Leaves in stable depth-first order (the streaming order).
    pub fn leaves(&self) -> Vec<(usize, &Arc<GridFragment>)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(usize, &'a Arc<GridFragment>)>) {
        match self {
            DataTree::Empty => {}
            DataTree::Leaf { domain, fragment } => out.push((*domain, fragment)),
            DataTree::Node(children) => {
                for c in children {
                    c.collect_leaves(out);
                }
            }
        }
    }

    /// Consume the tree into its leaves, depth-first.
    pub fn into_leaves(self) -> Vec<(usize, Arc<GridFragment>)> {
        let mut out = Vec::new();
        self.drain_leaves(&mut out);
        out
    }

    fn drain_leaves(self, out: &mut Vec<(usize, Arc<GridFragment>)>) {
        match self {
            DataTree::Empty => {}
            DataTree::Leaf { domain, fragment } => out.push((domain, fragment)),
            DataTree::Node(children) => {
                for c in children {
                    c.drain_leaves(out);
                }
            }
        }
    }

    /// The fragment for one domain, if present.
    pub fn fragment_for_domain(&self, domain: usize) -> Option<&Arc<GridFragment>> {
        match self {
            DataTree::Empty => None,
            DataTree::Leaf {
                domain: d,
                fragment,
            } => (*d == domain).then_some(fragment),
            DataTree::Node(children) => {
                children.iter().find_map(|c| c.fragment_for_domain(domain))
            }
        }
    }

    /// Drop empty children, collapsing all-empty nodes to `Empty`.
    pub fn pruned(self) -> DataTree {
        match self {
            DataTree::Node(children) => {
                let kept: Vec<DataTree> = children
                    .into_iter()
                    .map(|c| c.pruned())
                    .filter(|c| !c.is_empty())
                    .collect();
                if kept.is_empty() {
                    DataTree::Empty
                } else {
                    DataTree::Node(kept)
                }
            }
            other => other,
        }
    }

    pub fn total_cells(&self) -> usize {
        self.leaves().iter().map(|(_, f)| f.n_cells()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extents;

    fn frag(cells: [usize; 3]) -> GridFragment {
        GridFragment::structured(cells, Extents::new([0.0; 3], [1.0; 3]))
    }

    fn two_domain_tree() -> DataTree {
        DataTree::node(vec![
            DataTree::leaf(0, frag([2, 2, 1])),
            DataTree::leaf(1, frag([2, 2, 1])),
        ])
    }

    #[test]
    fn test_leaf_count_and_domains() {
        let t = two_domain_tree();
        assert_eq!(t.leaf_count(), 2);
        assert_eq!(t.domain_ids(), vec![0, 1]);
        assert_eq!(t.total_cells(), 8);
    }

    #[test]
    fn test_nested_order_is_depth_first() {
        let t = DataTree::node(vec![
            DataTree::node(vec![DataTree::leaf(3, frag([1, 1, 1]))]),
            DataTree::leaf(1, frag([1, 1, 1])),
        ]);
        let order: Vec<usize> = t.leaves().iter().map(|(d, _)| *d).collect();
        assert_eq!(order, vec![3, 1]);
        // domain_ids sorts regardless of leaf order.
        assert_eq!(t.domain_ids(), vec![1, 3]);
    }

    #[test]
    fn test_empty_and_prune() {
        assert!(DataTree::Empty.is_empty());
        let t = DataTree::node(vec![
            DataTree::Empty,
            DataTree::node(vec![DataTree::Empty]),
            DataTree::leaf(0, frag([1, 1, 1])),
        ]);
        assert!(!t.is_empty());
        let p = t.pruned();
        assert_eq!(p.leaf_count(), 1);
        match p {
            DataTree::Node(children) => assert_eq!(children.len(), 1),
            _ => panic!("expected node"),
        }

        let all_empty = DataTree::node(vec![DataTree::Empty]).pruned();
        assert!(matches!(all_empty, DataTree::Empty));
    }

    #[test]
    fn test_fragment_for_domain() {
        let t = two_domain_tree();
        assert!(t.fragment_for_domain(1).is_some());
        assert!(t.fragment_for_domain(7).is_none());
    }
}

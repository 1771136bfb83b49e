//! Interval tree over per-domain bounding boxes.
//!
//! Built once from database metadata, then queried to turn a spatial
//! restriction into the list of domains that could possibly contribute —
//! domains whose bounds miss the query box are culled before any I/O.

use crate::types::Extents;

enum Node {
    Leaf {
        domains: Vec<(usize, Extents)>,
    },
    Split {
        bounds: Extents,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Spatial index over domain bounds.
pub struct IntervalTree {
    root: Option<Node>,
    size: usize,
}

/// Below this many domains a subtree stays a flat leaf.
const LEAF_SIZE: usize = 4;

impl IntervalTree {
    /// Build from `(domain id, bounds)` pairs.
    pub fn build(mut domains: Vec<(usize, Extents)>) -> Self {
        let size = domains.len();
        let root = if domains.is_empty() {
            None
        } else {
            Some(Self::build_node(&mut domains))
        };
        Self { root, size }
    }

    fn build_node(domains: &mut [(usize, Extents)]) -> Node {
        if domains.len() <= LEAF_SIZE {
            return Node::Leaf {
                domains: domains.to_vec(),
            };
        }

        let mut bounds = Extents::EMPTY;
        for (_, e) in domains.iter() {
            bounds = bounds.union(e);
        }

        // Median split along the widest axis of the combined bounds.
        let axis = bounds.widest_axis();
        domains.sort_by(|a, b| {
            a.1.center()[axis]
                .partial_cmp(&b.1.center()[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mid = domains.len() / 2;
        let (lo, hi) = domains.split_at_mut(mid);

        Node::Split {
            bounds,
            left: Box::new(Self::build_node(lo)),
            right: Box::new(Self::build_node(hi)),
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Domains whose bounds intersect `query`, ascending.
    pub fn domains_intersecting(&self, query: &Extents) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            Self::query_node(root, query, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    fn query_node(node: &Node, query: &Extents, out: &mut Vec<usize>) {
        match node {
            Node::Leaf { domains } => {
                for (d, e) in domains {
                    if e.intersects(query) {
                        out.push(*d);
                    }
                }
            }
            Node::Split {
                bounds,
                left,
                right,
            } => {
                if !bounds.intersects(query) {
                    return;
                }
                Self::query_node(left, query, out);
                Self::query_node(right, query, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A row of 16 unit boxes along x.
    fn row_of_boxes() -> Vec<(usize, Extents)> {
        (0..16)
            .map(|i| {
                let x = i as f64;
                (
                    i,
                    Extents::new([x, 0.0, 0.0], [x + 1.0, 1.0, 1.0]),
                )
            })
            .collect()
    }

    #[test]
    fn test_query_subrange() {
        let tree = IntervalTree::build(row_of_boxes());
        assert_eq!(tree.len(), 16);

        let query = Extents::new([3.5, 0.0, 0.0], [6.5, 1.0, 1.0]);
        assert_eq!(tree.domains_intersecting(&query), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_query_everything_and_nothing() {
        let tree = IntervalTree::build(row_of_boxes());

        let all = Extents::new([-100.0; 3], [100.0; 3]);
        assert_eq!(tree.domains_intersecting(&all).len(), 16);

        let nothing = Extents::new([50.0; 3], [60.0; 3]);
        assert!(tree.domains_intersecting(&nothing).is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let tree = IntervalTree::build(Vec::new());
        assert!(tree.is_empty());
        let q = Extents::new([0.0; 3], [1.0; 3]);
        assert!(tree.domains_intersecting(&q).is_empty());
    }

    #[test]
    fn test_touching_faces_count() {
        let tree = IntervalTree::build(row_of_boxes());
        // Query box sharing only the face x = 4.0 with domain 3.
        let query = Extents::new([4.0, 0.0, 0.0], [4.0, 1.0, 1.0]);
        let hits = tree.domains_intersecting(&query);
        assert!(hits.contains(&3));
        assert!(hits.contains(&4));
    }
}

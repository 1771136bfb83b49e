//! Streaming per-domain execution.
//!
//! A filter never materializes every output fragment while still holding
//! every input fragment: leaves are visited in stable depth-first order, the
//! transform runs, and the consumed input reference is dropped before the
//! next leaf is touched. With `retain_inputs` set on the context (debug
//! dumps) the input tree instead stays whole until the traversal completes.
//! The abort flag is polled between fragments — cancellation is cooperative.

use crate::data::fragment::GridFragment;
use crate::data::tree::DataTree;
use crate::error::{EngineError, Result};
use crate::pipeline::context::ExecutionContext;
use std::sync::Arc;

/// Map a transform over every leaf of an owned tree.
///
/// The transform may return `None` to discard a fragment (its leaf becomes
/// `Empty` and is pruned). Errors and aborts unwind immediately; the
/// partially built output is dropped on the way out.
pub fn map_tree<F>(input: DataTree, ctx: &ExecutionContext, transform: &mut F) -> Result<DataTree>
where
    F: FnMut(&GridFragment, usize) -> Result<Option<GridFragment>>,
{
    if ctx.retain_inputs() {
        // Retention: walk by reference, input stays intact until we return.
        let out = map_tree_ref(&input, ctx, transform)?;
        return Ok(out.pruned());
    }
    let out = map_tree_consuming(input, ctx, transform)?;
    Ok(out.pruned())
}

fn map_tree_consuming<F>(
    input: DataTree,
    ctx: &ExecutionContext,
    transform: &mut F,
) -> Result<DataTree>
where
    F: FnMut(&GridFragment, usize) -> Result<Option<GridFragment>>,
{
    match input {
        DataTree::Empty => Ok(DataTree::Empty),
        DataTree::Leaf { domain, fragment } => {
            ctx.check_abort()?;
            let result = transform(&fragment, domain)?;
            // Release the consumed input before the next leaf is touched.
            drop(fragment);
            Ok(match result {
                Some(out) => DataTree::leaf(domain, out),
                None => DataTree::Empty,
            })
        }
        DataTree::Node(children) => {
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                out.push(map_tree_consuming(child, ctx, transform)?);
            }
            Ok(DataTree::Node(out))
        }
    }
}

fn map_tree_ref<F>(
    input: &DataTree,
    ctx: &ExecutionContext,
    transform: &mut F,
) -> Result<DataTree>
where
    F: FnMut(&GridFragment, usize) -> Result<Option<GridFragment>>,
{
    match input {
        DataTree::Empty => Ok(DataTree::Empty),
        DataTree::Leaf { domain, fragment } => {
            ctx.check_abort()?;
            Ok(match transform(fragment, *domain)? {
                Some(out) => DataTree::leaf(*domain, out),
                None => DataTree::Empty,
            })
        }
        DataTree::Node(children) => {
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                out.push(map_tree_ref(child, ctx, transform)?);
            }
            Ok(DataTree::Node(out))
        }
    }
}

/// Map a transform over every leaf, letting the transform expand one leaf
/// into a subtree (used by re-partitioning filters).
pub fn map_tree_expanding<F>(
    input: DataTree,
    ctx: &ExecutionContext,
    transform: &mut F,
) -> Result<DataTree>
where
    F: FnMut(&GridFragment, usize) -> Result<DataTree>,
{
    let out = match input {
        DataTree::Empty => DataTree::Empty,
        DataTree::Leaf { domain, fragment } => {
            ctx.check_abort()?;
            let subtree = transform(&fragment, domain)?;
            drop(fragment);
            subtree
        }
        DataTree::Node(children) => {
            let mut out = Vec::with_capacity(children.len());
            for child in children {
                out.push(map_tree_expanding(child, ctx, transform)?);
            }
            DataTree::Node(out)
        }
    };
    Ok(out.pruned())
}

/// Zip N input trees domain-by-domain through a combining transform.
///
/// The trees must agree on their domain-id sequences (in depth-first leaf
/// order); otherwise the zip fails with `StructureMismatch`. The output is a
/// flat node of leaves in the shared domain order.
pub fn zip_trees<F>(
    inputs: Vec<DataTree>,
    ctx: &ExecutionContext,
    transform: &mut F,
) -> Result<DataTree>
where
    F: FnMut(&[&GridFragment], usize) -> Result<Option<GridFragment>>,
{
    if inputs.is_empty() {
        return Ok(DataTree::Empty);
    }

    let mut flattened: Vec<Vec<(usize, Option<Arc<GridFragment>>)>> = inputs
        .into_iter()
        .map(|t| {
            t.into_leaves()
                .into_iter()
                .map(|(d, f)| (d, Some(f)))
                .collect()
        })
        .collect();

    let reference: Vec<usize> = flattened[0].iter().map(|(d, _)| *d).collect();
    for other in &flattened[1..] {
        let domains: Vec<usize> = other.iter().map(|(d, _)| *d).collect();
        if domains != reference {
            return Err(EngineError::StructureMismatch {
                expected: format!("{:?}", reference),
                found: format!("{:?}", domains),
            });
        }
    }

    let mut out = Vec::with_capacity(reference.len());
    for (i, &domain) in reference.iter().enumerate() {
        ctx.check_abort()?;
        let row: Vec<Arc<GridFragment>> = flattened
            .iter_mut()
            .map(|leaves| leaves[i].1.take().expect("leaf consumed twice"))
            .collect();
        let refs: Vec<&GridFragment> = row.iter().map(|f| &**f).collect();
        let result = transform(&refs, domain)?;
        if ctx.retain_inputs() {
            // Put the fragments back so the inputs outlive the traversal.
            for (leaves, frag) in flattened.iter_mut().zip(row) {
                leaves[i].1 = Some(frag);
            }
        } else {
            drop(row);
        }
        if let Some(fragment) = result {
            out.push(DataTree::leaf(domain, fragment));
        }
    }

    Ok(DataTree::Node(out).pruned())
}

/// Collapse a whole tree into at most one fragment (resampling-style
/// filters). Leaves are visited in depth-first order; the input tree is
/// consumed.
pub fn collapse_tree<F>(
    input: DataTree,
    ctx: &ExecutionContext,
    transform: F,
) -> Result<DataTree>
where
    F: FnOnce(&[(usize, Arc<GridFragment>)]) -> Result<Option<GridFragment>>,
{
    ctx.check_abort()?;
    let leaves = input.into_leaves();
    if leaves.is_empty() {
        return Ok(DataTree::Empty);
    }
    let first_domain = leaves[0].0;
    let result = transform(&leaves)?;
    drop(leaves);
    Ok(match result {
        Some(fragment) => DataTree::leaf(first_domain, fragment),
        None => DataTree::Empty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fragment::ArrayData;
    use crate::types::Extents;

    fn frag_with(value: f64) -> GridFragment {
        let mut f = GridFragment::structured([2, 1, 1], Extents::new([0.0; 3], [1.0; 3]));
        f.set_array("v", ArrayData::cell(vec![value, value + 1.0]));
        f
    }

    fn tree() -> DataTree {
        DataTree::node(vec![
            DataTree::leaf(0, frag_with(0.0)),
            DataTree::node(vec![DataTree::leaf(1, frag_with(10.0))]),
        ])
    }

    #[test]
    fn test_map_preserves_shape_and_order() {
        let ctx = ExecutionContext::new();
        let mut visited = Vec::new();
        let out = map_tree(tree(), &ctx, &mut |frag, domain| {
            visited.push(domain);
            Ok(Some(frag.clone()))
        })
        .unwrap();
        assert_eq!(visited, vec![0, 1]);
        assert_eq!(out.leaf_count(), 2);
        assert_eq!(out.domain_ids(), vec![0, 1]);
    }

    #[test]
    fn test_map_discards_to_empty() {
        let ctx = ExecutionContext::new();
        let out = map_tree(tree(), &ctx, &mut |frag, domain| {
            Ok((domain == 1).then(|| frag.clone()))
        })
        .unwrap();
        assert_eq!(out.domain_ids(), vec![1]);
    }

    #[test]
    fn test_map_releases_inputs() {
        let frag = Arc::new(frag_with(0.0));
        let input = DataTree::shared_leaf(0, Arc::clone(&frag));
        let ctx = ExecutionContext::new();
        let _out = map_tree(input, &ctx, &mut |f, _| Ok(Some(f.clone()))).unwrap();
        // Only our local handle remains; the streamer dropped its reference.
        assert_eq!(Arc::strong_count(&frag), 1);
    }

    #[test]
    fn test_map_release_is_per_leaf() {
        // While leaf 1 is being transformed, leaf 0's input must already be
        // gone: the streamer holds at most one input fragment at a time.
        let frag0 = Arc::new(frag_with(0.0));
        let frag1 = Arc::new(frag_with(1.0));
        let input = DataTree::Node(vec![
            DataTree::shared_leaf(0, Arc::clone(&frag0)),
            DataTree::shared_leaf(1, Arc::clone(&frag1)),
        ]);
        let ctx = ExecutionContext::new();
        let probe = Arc::clone(&frag0);
        let _out = map_tree(input, &ctx, &mut |f, domain| {
            if domain == 1 {
                assert_eq!(Arc::strong_count(&probe), 2, "leaf 0 not yet released");
            }
            Ok(Some(f.clone()))
        })
        .unwrap();
    }

    #[test]
    fn test_map_abort() {
        let ctx = ExecutionContext::new();
        ctx.request_abort();
        let res = map_tree(tree(), &ctx, &mut |f, _| Ok(Some(f.clone())));
        assert!(matches!(res, Err(EngineError::Aborted)));
    }

    #[test]
    fn test_map_abort_mid_stream() {
        let ctx = ExecutionContext::new();
        let ctx2 = ctx.clone();
        let mut count = 0;
        let res = map_tree(tree(), &ctx, &mut |f, _| {
            count += 1;
            // Abort after the first fragment; the second leaf must not run.
            ctx2.request_abort();
            Ok(Some(f.clone()))
        });
        assert!(matches!(res, Err(EngineError::Aborted)));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_retained_inputs_outlive_traversal() {
        let frag = Arc::new(frag_with(0.0));
        let input = DataTree::shared_leaf(0, Arc::clone(&frag));
        let ctx = ExecutionContext::new().with_retain_inputs(true);
        let input_clone_for_check = input.clone();
        let _out = map_tree(input, &ctx, &mut |f, _| Ok(Some(f.clone()))).unwrap();
        // Retention path never consumed the leaves.
        assert!(input_clone_for_check.fragment_for_domain(0).is_some());
    }

    #[test]
    fn test_zip_matching_domains() {
        let ctx = ExecutionContext::new();
        let a = tree();
        let b = tree();
        let out = zip_trees(vec![a, b], &ctx, &mut |frags, _| {
            assert_eq!(frags.len(), 2);
            Ok(Some(frags[0].clone()))
        })
        .unwrap();
        assert_eq!(out.domain_ids(), vec![0, 1]);
    }

    #[test]
    fn test_zip_structure_mismatch() {
        let ctx = ExecutionContext::new();
        let a = tree();
        let b = DataTree::leaf(5, frag_with(0.0));
        let res = zip_trees(vec![a, b], &ctx, &mut |frags, _| Ok(Some(frags[0].clone())));
        assert!(matches!(res, Err(EngineError::StructureMismatch { .. })));
    }

    #[test]
    fn test_collapse() {
        let ctx = ExecutionContext::new();
        let out = collapse_tree(tree(), &ctx, |leaves| {
            assert_eq!(leaves.len(), 2);
            Ok(Some(frag_with(99.0)))
        })
        .unwrap();
        assert_eq!(out.leaf_count(), 1);
    }

    #[test]
    fn test_collapse_empty_input() {
        let ctx = ExecutionContext::new();
        let out = collapse_tree(DataTree::Empty, &ctx, |_| Ok(Some(frag_with(0.0)))).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_expanding_map() {
        let ctx = ExecutionContext::new();
        let out = map_tree_expanding(tree(), &ctx, &mut |frag, domain| {
            // Split each leaf into two copies under one node.
            Ok(DataTree::node(vec![
                DataTree::leaf(domain, frag.clone()),
                DataTree::leaf(domain, frag.clone()),
            ]))
        })
        .unwrap();
        assert_eq!(out.leaf_count(), 4);
        assert_eq!(out.domain_ids(), vec![0, 1]);
    }
}

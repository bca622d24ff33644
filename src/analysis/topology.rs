use crate::error::{Result, SurveyError};
use crate::store::{Forest, OccurrenceId, VertexId};

/// Assigns nested-set bounds and depths to every occurrence reachable from a root.
///
/// Roots are numbered in their stored order, children in sibling order, so a
/// `left` sort reproduces the pre-order traversal of the whole forest.
/// Returns the number of occurrences numbered.
pub fn renumber(forest: &mut Forest) -> usize {
    let count = forest.count();
    let mut seen = vec![false; count];
    let mut left_of = vec![0u32; count];
    let mut bounds = Vec::with_capacity(count);
    let mut counter = 1u32;

    let mut stack: Vec<(OccurrenceId, u32, bool)> =
        forest.roots().iter().rev().map(|&r| (r, 0, false)).collect();

    while let Some((id, depth, exiting)) = stack.pop() {
        if exiting {
            bounds.push((id, left_of[id.index()], counter, depth));
            counter += 1;
            continue;
        }
        if seen[id.index()] {
            continue;
        }
        seen[id.index()] = true;
        left_of[id.index()] = counter;
        counter += 1;

        stack.push((id, depth, true));
        for &child in forest.children(id).iter().rev() {
            stack.push((child, depth + 1, false));
        }
    }

    let numbered = bounds.len();
    for (id, left, right, depth) in bounds {
        forest.set_bounds(id, left, right, depth);
    }
    numbered
}

/// Copies `root` and its whole sub-tree. The copy is a new root referencing the
/// same vertices.
pub fn clone_subtree(forest: &mut Forest, root: OccurrenceId, limit: usize) -> Result<OccurrenceId> {
    let copy = forest.insert_root(forest.vertex_of(root));
    let mut queue = vec![(root, copy, 0usize)];

    while let Some((original, target, depth)) = queue.pop() {
        if depth >= limit {
            return Err(SurveyError::DepthLimit { limit });
        }
        let children = forest.children(original).to_vec();
        for child in children {
            let new_child = forest.insert_child(target, forest.vertex_of(child));
            queue.push((child, new_child, depth + 1));
        }
    }
    Ok(copy)
}

/// `id` followed by all of its descendants, pre-order, by following child links.
pub fn subtree(forest: &Forest, id: OccurrenceId) -> Vec<OccurrenceId> {
    let mut out = Vec::new();
    let mut seen = vec![false; forest.count()];
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if std::mem::replace(&mut seen[current.index()], true) {
            continue;
        }
        out.push(current);
        stack.extend(forest.children(current).iter().rev().copied());
    }
    out
}

/// Descendants of `id` by nested-set range. Bounds must be fresh.
pub fn descendants(forest: &Forest, id: OccurrenceId) -> Vec<OccurrenceId> {
    let node = forest.node(id);
    let (l, r) = (node.left, node.right);
    let mut out: Vec<OccurrenceId> = forest
        .live_ids()
        .filter(|&o| {
            let n = forest.node(o);
            n.left > l && n.right < r
        })
        .collect();
    out.sort_by_key(|&o| forest.node(o).left);
    out
}

/// Ancestors of `id` by nested-set range, outermost first. Bounds must be fresh.
pub fn ancestors(forest: &Forest, id: OccurrenceId) -> Vec<OccurrenceId> {
    let node = forest.node(id);
    let (l, r) = (node.left, node.right);
    let mut out: Vec<OccurrenceId> = forest
        .live_ids()
        .filter(|&o| {
            let n = forest.node(o);
            n.left < l && n.right > r
        })
        .collect();
    out.sort_by_key(|&o| forest.node(o).left);
    out
}

/// Whether `id` is `other` or sits somewhere below it.
pub fn is_descendant_of(forest: &Forest, id: OccurrenceId, other: OccurrenceId) -> bool {
    let mut current = Some(id);
    let mut steps = 0;
    while let Some(c) = current {
        if c == other {
            return true;
        }
        steps += 1;
        if steps > forest.count() {
            break;
        }
        current = forest.parent(c);
    }
    false
}

/// Walks upward from `id` (inclusive) while the occurrence has a parent and
/// its vertex satisfies `pred`.
pub fn ancestors_while(
    forest: &Forest,
    id: OccurrenceId,
    pred: impl Fn(VertexId) -> bool,
) -> Vec<OccurrenceId> {
    let mut out = Vec::new();
    let mut current = id;
    while let Some(parent) = forest.parent(current) {
        if !pred(forest.vertex_of(current)) || out.len() > forest.count() {
            break;
        }
        out.push(current);
        current = parent;
    }
    out
}

/// Walks downward from `id` (inclusive), descending only through occurrences
/// whose vertex satisfies `pred`.
pub fn descendants_while(
    forest: &Forest,
    id: OccurrenceId,
    pred: impl Fn(VertexId) -> bool,
) -> Vec<OccurrenceId> {
    let mut out = Vec::new();
    let mut seen = vec![false; forest.count()];
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if !pred(forest.vertex_of(current)) || std::mem::replace(&mut seen[current.index()], true) {
            continue;
        }
        out.push(current);
        stack.extend(forest.children(current).iter().rev().copied());
    }
    out
}

/// Whether some downward path starting at `start` visits the same vertex twice.
pub fn has_cycle(forest: &Forest, start: OccurrenceId, limit: usize) -> Result<bool> {
    let mut path: Vec<VertexId> = Vec::new();
    let mut stack = vec![(start, 0usize)];

    while let Some((id, depth)) = stack.pop() {
        if depth >= limit {
            return Err(SurveyError::DepthLimit { limit });
        }
        path.truncate(depth);
        let vertex = forest.vertex_of(id);
        if path.contains(&vertex) {
            return Ok(true);
        }
        path.push(vertex);
        for &child in forest.children(id).iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    Ok(false)
}

/// Checks a loaded forest: no loops below any root, and every live occurrence
/// reachable from a root.
pub fn verify(forest: &Forest, limit: usize) -> Result<()> {
    for &root in forest.roots() {
        if has_cycle(forest, root, limit)? {
            return Err(SurveyError::InfiniteLoop(forest.vertex_of(root)));
        }
    }
    let reachable: usize = forest.roots().iter().map(|&r| subtree(forest, r).len()).sum();
    if reachable != forest.live_count() {
        return Err(SurveyError::MalformedForest(format!(
            "{} occurrences are not reachable from any root",
            forest.live_count() - reachable.min(forest.live_count())
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> VertexId { VertexId(i) }

    /// q(0) -> [a(1) -> q2(2) -> a(3), a(4)]
    fn sample() -> (Forest, Vec<OccurrenceId>) {
        let mut f = Forest::new();
        let q = f.insert_root(v(0));
        let a1 = f.insert_child(q, v(1));
        let q2 = f.insert_child(a1, v(2));
        let a3 = f.insert_child(q2, v(3));
        let a4 = f.insert_child(q, v(4));
        renumber(&mut f);
        (f, vec![q, a1, q2, a3, a4])
    }

    #[test]
    fn test_renumber_nested_set_bounds() {
        let (f, ids) = sample();
        let bounds: Vec<_> = ids.iter().map(|&id| {
            let n = f.get(id).unwrap();
            (n.left, n.right, n.depth)
        }).collect();
        assert_eq!(bounds, vec![(1, 10, 0), (2, 7, 1), (3, 6, 2), (4, 5, 3), (8, 9, 1)]);
    }

    #[test]
    fn test_range_queries_match_links() {
        let (f, ids) = sample();
        assert_eq!(descendants(&f, ids[1]), vec![ids[2], ids[3]]);
        assert_eq!(ancestors(&f, ids[3]), vec![ids[0], ids[1], ids[2]]);
        assert_eq!(subtree(&f, ids[0]), vec![ids[0], ids[1], ids[2], ids[3], ids[4]]);
        assert!(is_descendant_of(&f, ids[3], ids[1]));
        assert!(!is_descendant_of(&f, ids[4], ids[1]));
    }

    #[test]
    fn test_clone_is_isomorphic_and_disjoint() {
        let (mut f, ids) = sample();
        let copy = clone_subtree(&mut f, ids[0], 64).unwrap();
        renumber(&mut f);

        let original = subtree(&f, ids[0]);
        let cloned = subtree(&f, copy);
        let shape = |list: &[OccurrenceId]| -> Vec<(VertexId, usize)> {
            list.iter().map(|&o| (f.vertex_of(o), f.children(o).len())).collect()
        };
        assert_eq!(shape(&original), shape(&cloned));
        assert!(original.iter().all(|o| !cloned.contains(o)));
        assert_eq!(f.parent(copy), None);
    }

    #[test]
    fn test_walks_stop_at_predicate() {
        let (f, ids) = sample();
        let answers = |vx: VertexId| vx == v(1) || vx == v(3) || vx == v(4);
        assert_eq!(ancestors_while(&f, ids[3], answers), vec![ids[3]]);
        assert_eq!(descendants_while(&f, ids[1], answers), vec![ids[1]]);
        assert!(descendants_while(&f, ids[0], answers).is_empty());
    }

    #[test]
    fn test_cycle_detection_on_forced_loop() {
        let (mut f, ids) = sample();
        assert!(!has_cycle(&f, ids[0], 64).unwrap());

        // Hang a second occurrence of q(0) below a3 by hand.
        let again = f.insert_child(ids[3], v(0));
        assert!(has_cycle(&f, ids[0], 64).unwrap());
        assert!(!has_cycle(&f, again, 64).unwrap());
    }

    #[test]
    fn test_cycle_detection_survives_linked_occurrence_loop() {
        let (mut f, ids) = sample();
        // Make the root a child of its own grandchild: a real occurrence loop.
        f.attach(ids[0], ids[2]);
        assert!(has_cycle(&f, ids[1], 64).unwrap());
    }

    #[test]
    fn test_depth_limit_is_reported() {
        let (mut f, ids) = sample();
        let err = clone_subtree(&mut f, ids[0], 2).unwrap_err();
        assert!(matches!(err, SurveyError::DepthLimit { limit: 2 }));
    }

    #[test]
    fn test_verify_flags_orphans() {
        let (mut f, ids) = sample();
        assert!(verify(&f, 64).is_ok());
        f.attach(ids[0], ids[2]);
        assert!(verify(&f, 64).is_err());
    }
}

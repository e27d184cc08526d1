use crate::plane::{principal_plane, SplitPlane};
use crate::IndexError;

/// The result of a neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<const D: usize> {
    /// The closest point found.
    pub point: [f64; D],
    /// Euclidean distance between the query and `point`.
    pub distance: f64,
}

/// A node of the search tree.
///
/// Every point stored under the left child of a [`TreeNode::Split`] has a
/// non-positive signed distance to its plane, every point under the right
/// child a non-negative one.
#[derive(Debug, Clone)]
pub enum TreeNode<const D: usize> {
    /// A bucket of points searched linearly.
    Leaf {
        /// Points stored in the leaf.
        points: Vec<[f64; D]>,
    },
    /// A splitting plane with its two subtrees.
    Split {
        /// The splitting plane.
        plane: SplitPlane<D>,
        /// Points on the non-positive side of the plane.
        left: Box<TreeNode<D>>,
        /// Points on the positive side of the plane.
        right: Box<TreeNode<D>>,
    },
}

/// Build a search tree over `points`.
///
/// A set is stored in a single leaf once its extent along the split normal
/// is at most `max_leaf_extent`. Sets without spread (coincident points,
/// rank-deficient covariance) become leaves as well. Points with a NaN or
/// infinite coordinate are rejected.
///
/// # Arguments
///
/// * `points` - The points to index. The tree takes ownership.
/// * `max_leaf_extent` - Maximum distance of a leaf point to the plane that would split the leaf.
///
/// # Returns
///
/// The root of the tree.
pub fn build_tree<const D: usize>(
    points: Vec<[f64; D]>,
    max_leaf_extent: f64,
) -> Result<TreeNode<D>, IndexError> {
    if !max_leaf_extent.is_finite() || max_leaf_extent < 0.0 {
        return Err(IndexError::InvalidExtent(max_leaf_extent));
    }
    if let Some(index) = points
        .iter()
        .position(|p| p.iter().any(|x| !x.is_finite()))
    {
        return Err(IndexError::NonFinitePoint { index });
    }
    Ok(build_node(points, max_leaf_extent))
}

fn build_node<const D: usize>(points: Vec<[f64; D]>, max_leaf_extent: f64) -> TreeNode<D> {
    let Some(plane) = principal_plane(&points) else {
        return TreeNode::Leaf { points };
    };

    if plane.extent(&points) <= max_leaf_extent {
        return TreeNode::Leaf { points };
    }

    let (mut left, right) = plane.partition(points);
    if left.is_empty() || right.is_empty() {
        left.extend(right);
        return TreeNode::Leaf { points: left };
    }

    TreeNode::Split {
        plane,
        left: Box::new(build_node(left, max_leaf_extent)),
        right: Box::new(build_node(right, max_leaf_extent)),
    }
}

fn squared_distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn linear_search<const D: usize>(
    points: &[[f64; D]],
    query: &[f64; D],
    max_distance: f64,
) -> Option<Neighbor<D>> {
    let (best, best_sq) = points
        .iter()
        .map(|p| (p, squared_distance(p, query)))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    let distance = best_sq.sqrt();
    if distance <= max_distance {
        Some(Neighbor {
            point: *best,
            distance,
        })
    } else {
        None
    }
}

impl<const D: usize> TreeNode<D> {
    /// Find the closest point to `query` within `max_distance`.
    ///
    /// The subtree on the query's side of a plane is searched first; the
    /// other subtree is searched only when it could hold a strictly closer
    /// point than the best one found so far. The result is the exact nearest
    /// neighbor, or `None` if no point lies within `max_distance`.
    pub fn find_neighbor(&self, query: &[f64; D], max_distance: f64) -> Option<Neighbor<D>> {
        match self {
            TreeNode::Leaf { points } => linear_search(points, query, max_distance),
            TreeNode::Split { plane, left, right } => {
                let d = plane.signed_distance(query);
                let (near, far) = if d <= 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                let best = near.find_neighbor(query, max_distance);
                let visit_far = match &best {
                    Some(b) => d.abs() < b.distance,
                    None => d.abs() <= max_distance,
                };
                if !visit_far {
                    return best;
                }

                let bound = best.as_ref().map_or(max_distance, |b| b.distance);
                match (best, far.find_neighbor(query, bound)) {
                    (Some(b), Some(c)) if c.distance < b.distance => Some(c),
                    (Some(b), _) => Some(b),
                    (None, c) => c,
                }
            }
        }
    }

    /// Near-side-only variant of [`TreeNode::find_neighbor`].
    ///
    /// Only the subtree on the query's side of each plane is visited, so the
    /// returned point may be farther than the true nearest neighbor. It is
    /// still never farther than `max_distance`.
    pub fn find_neighbor_approx(
        &self,
        query: &[f64; D],
        max_distance: f64,
    ) -> Option<Neighbor<D>> {
        match self {
            TreeNode::Leaf { points } => linear_search(points, query, max_distance),
            TreeNode::Split { plane, left, right } => {
                if plane.is_left(query) {
                    left.find_neighbor_approx(query, max_distance)
                } else {
                    right.find_neighbor_approx(query, max_distance)
                }
            }
        }
    }

    /// Number of points stored under this node.
    pub fn len(&self) -> usize {
        match self {
            TreeNode::Leaf { points } => points.len(),
            TreeNode::Split { left, right, .. } => left.len() + right.len(),
        }
    }

    /// Returns true if no point is stored under this node.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth of the subtree; a single leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Number of leaves of the subtree.
    pub fn num_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.num_leaves() + right.num_leaves(),
        }
    }

    /// Visit every point stored under this node.
    pub fn for_each_point(&self, f: &mut impl FnMut(&[f64; D])) {
        match self {
            TreeNode::Leaf { points } => {
                for p in points {
                    f(p);
                }
            }
            TreeNode::Split { left, right, .. } => {
                left.for_each_point(f);
                right.for_each_point(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_partition<const D: usize>(node: &TreeNode<D>) {
        if let TreeNode::Split { plane, left, right } = node {
            left.for_each_point(&mut |p: &[f64; D]| assert!(plane.signed_distance(p) <= 0.0));
            right.for_each_point(&mut |p: &[f64; D]| assert!(plane.signed_distance(p) >= 0.0));
            check_partition(left);
            check_partition(right);
        }
    }

    #[test]
    fn test_build_splits_and_keeps_points() -> Result<(), IndexError> {
        let points = (0..64)
            .map(|i| [(i % 4) as f64, ((i / 4) % 4) as f64, (i / 16) as f64])
            .collect::<Vec<_>>();
        let root = build_tree(points, 0.5)?;
        assert_eq!(root.len(), 64);
        assert!(root.num_leaves() > 1);
        check_partition(&root);
        Ok(())
    }

    #[test]
    fn test_build_large_extent_is_single_leaf() -> Result<(), IndexError> {
        let points = vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.5]];
        let root = build_tree(points, 10.0)?;
        assert!(matches!(root, TreeNode::Leaf { ref points } if points.len() == 3));
        Ok(())
    }

    #[test]
    fn test_build_coincident_points_is_leaf() -> Result<(), IndexError> {
        let root = build_tree(vec![[0.1, 0.2, 0.3]; 10], 0.0)?;
        assert!(matches!(root, TreeNode::Leaf { .. }));
        assert_eq!(root.len(), 10);
        Ok(())
    }

    #[test]
    fn test_build_rejects_invalid_extent() {
        assert_eq!(
            build_tree(vec![[0.0; 3]], -1.0).err(),
            Some(IndexError::InvalidExtent(-1.0))
        );
        assert!(build_tree(vec![[0.0; 3]], f64::NAN).is_err());
    }

    #[test]
    fn test_build_rejects_non_finite_points() {
        let mut points = (0..32)
            .map(|i| [(i % 4) as f64, (i / 4) as f64, 0.5 * i as f64])
            .collect::<Vec<_>>();
        points[17][1] = f64::NAN;
        assert_eq!(
            build_tree(points.clone(), 0.1).err(),
            Some(IndexError::NonFinitePoint { index: 17 })
        );

        points[17][1] = 1.0;
        points[3][2] = f64::NEG_INFINITY;
        assert_eq!(
            build_tree(points, 0.1).err(),
            Some(IndexError::NonFinitePoint { index: 3 })
        );
    }

    #[test]
    fn test_leaf_search_respects_bound() {
        let leaf = TreeNode::Leaf {
            points: vec![[0.0, 0.0], [3.0, 4.0]],
        };
        let nn = leaf.find_neighbor(&[3.0, 3.0], 1.0);
        assert_eq!(
            nn,
            Some(Neighbor {
                point: [3.0, 4.0],
                distance: 1.0
            })
        );
        assert_eq!(leaf.find_neighbor(&[3.0, 3.0], 0.99), None);
    }

    #[test]
    fn test_far_side_is_searched() -> Result<(), IndexError> {
        // the query sits just left of the first split but its nearest point is on the right
        let points = vec![[-10.0, 0.0], [-9.0, 0.0], [0.2, 0.0], [10.0, 0.0], [9.0, 0.0]];
        let root = build_tree(points, 0.0)?;
        let query = [-0.1, 5.0];
        let exact = root.find_neighbor(&query, 100.0);
        assert_eq!(exact.map(|n| n.point), Some([0.2, 0.0]));
        Ok(())
    }

    #[test]
    fn test_empty_leaf() {
        let leaf = TreeNode::<3>::Leaf { points: vec![] };
        assert!(leaf.is_empty());
        assert_eq!(leaf.find_neighbor(&[0.0; 3], f64::MAX), None);
        assert_eq!(leaf.find_neighbor_approx(&[0.0; 3], f64::MAX), None);
    }
}

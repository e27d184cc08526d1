use crate::node::{build_tree, Neighbor, TreeNode};
use crate::IndexError;

/// Search tree over a set of `D`-dimensional points.
///
/// The tree is built once and is read-only afterwards, so it can be shared
/// between threads and queried concurrently.
#[derive(Debug, Clone)]
pub struct SearchTree<const D: usize> {
    root: TreeNode<D>,
    max_leaf_extent: f64,
}

impl<const D: usize> SearchTree<D> {
    /// Build the tree from a set of points.
    ///
    /// # Arguments
    ///
    /// * `points` - The points to index.
    /// * `max_leaf_extent` - Extent below which a point set is stored in a single leaf.
    pub fn build(points: &[[f64; D]], max_leaf_extent: f64) -> Result<Self, IndexError> {
        let now = std::time::Instant::now();
        let root = build_tree(points.to_vec(), max_leaf_extent)?;
        log::trace!(
            "built search tree: {} points, {} leaves, depth {} in {:?}",
            points.len(),
            root.num_leaves(),
            root.depth(),
            now.elapsed()
        );
        Ok(Self {
            root,
            max_leaf_extent,
        })
    }

    /// Build the tree from interleaved coordinates `[x0, y0, z0, x1, ...]`.
    pub fn from_flat(data: &[f64], max_leaf_extent: f64) -> Result<Self, IndexError> {
        if D == 0 || data.len() % D != 0 {
            return Err(IndexError::DimensionMismatch {
                expected: D,
                actual: data.len(),
            });
        }
        let points = data
            .chunks_exact(D)
            .map(|chunk| std::array::from_fn(|i| chunk[i]))
            .collect::<Vec<[f64; D]>>();
        Self::build(&points, max_leaf_extent)
    }

    /// Find the nearest point to `query` within `max_distance`.
    ///
    /// Returns `None` if no point lies within `max_distance`.
    #[inline]
    pub fn find_neighbor(&self, query: &[f64; D], max_distance: f64) -> Option<Neighbor<D>> {
        self.root.find_neighbor(query, max_distance)
    }

    /// Approximate nearest neighbor search that never crosses a splitting plane.
    ///
    /// See [`TreeNode::find_neighbor_approx`].
    #[inline]
    pub fn find_neighbor_approx(
        &self,
        query: &[f64; D],
        max_distance: f64,
    ) -> Option<Neighbor<D>> {
        self.root.find_neighbor_approx(query, max_distance)
    }

    /// Same as [`SearchTree::find_neighbor`] for a query given as a slice.
    pub fn find_neighbor_slice(
        &self,
        query: &[f64],
        max_distance: f64,
    ) -> Result<Option<Neighbor<D>>, IndexError> {
        let query: &[f64; D] = query
            .try_into()
            .map_err(|_| IndexError::DimensionMismatch {
                expected: D,
                actual: query.len(),
            })?;
        Ok(self.find_neighbor(query, max_distance))
    }

    /// The root node.
    pub fn root(&self) -> &TreeNode<D> {
        &self.root
    }

    /// The extent threshold the tree was built with.
    pub fn max_leaf_extent(&self) -> f64 {
        self.max_leaf_extent
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Returns true if the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Depth of the tree; a tree made of a single leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.root.num_leaves()
    }
}

#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The tree splits a point set recursively with planes through the mean of
//! the points, oriented along the direction of largest spread. Leaves hold
//! small buckets that are scanned linearly.
//!
//! ```rust
//! use scanreg_index::SearchTree;
//!
//! let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
//! let tree = SearchTree::build(&points, 0.1)?;
//!
//! let nn = tree.find_neighbor(&[0.9, 0.1, 0.0], 1.0).expect("a neighbor within 1.0");
//! assert_eq!(nn.point, [1.0, 0.0, 0.0]);
//!
//! // nothing within 0.01
//! assert!(tree.find_neighbor(&[0.5, 0.5, 0.5], 0.01).is_none());
//! # Ok::<(), scanreg_index::IndexError>(())
//! ```

/// Splitting planes and the principal-axis partition.
pub mod plane;

/// Tree nodes, construction and neighbor search.
pub mod node;

mod tree;
pub use tree::SearchTree;

pub use node::{build_tree, Neighbor, TreeNode};
pub use plane::SplitPlane;

/// Error types for the search tree.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IndexError {
    /// Input data does not match the dimension of the tree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the tree points.
        expected: usize,
        /// Length of the offending input.
        actual: usize,
    },

    /// A point has a NaN or infinite coordinate.
    #[error("Point {index} has a non-finite coordinate")]
    NonFinitePoint {
        /// Position of the offending point in the input.
        index: usize,
    },

    /// The leaf extent threshold must be finite and non-negative.
    #[error("Invalid maximum leaf extent: {0}")]
    InvalidExtent(f64),
}

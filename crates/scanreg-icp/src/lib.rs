#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The optimizer aligns a source cloud to a target cloud. Correspondences
//! come from a [`scanreg_index::SearchTree`] built over the target, the
//! point-to-point error is linearized on SE(3), weighted with a
//! [`RobustKernel`] and the pose is updated through the exponential map.
//!
//! ```rust
//! use scanreg_icp::{align, IcpConfig, PointCloud};
//! use scanreg_lie::Pose;
//!
//! let points = (0..125)
//!     .map(|i| {
//!         let (x, y, z) = ((i % 5) as f64, ((i / 5) % 5) as f64, (i / 25) as f64);
//!         [0.3 * x, 0.2 * y + 0.01 * x * x, 0.25 * z]
//!     })
//!     .collect::<Vec<_>>();
//! let motion = Pose::exp(&[0.0, 0.0, 0.01, 0.02, 0.0, -0.01]);
//!
//! let source = PointCloud::from_vec(points.clone())?;
//! let target = PointCloud::from_vec(motion.transform_points(&points))?;
//!
//! let result = align(&source, &target, None, IcpConfig::default())?;
//! assert!((result.pose.translation() - motion.translation()).length() < 1e-6);
//! assert!((result.pose.inverse() * motion).rotation().angle() < 1e-6);
//! # Ok::<(), scanreg_icp::IcpError>(())
//! ```

mod icp_manifold;
pub use icp_manifold::*;

mod kernel;
pub use kernel::RobustKernel;

mod ops;
pub use ops::{error_and_jacobian, Correspondence, ErrorJacobian, NormalEquations};

mod point_cloud_transformation;
pub use point_cloud_transformation::{compute_centroids, fit_transformation, relaxed_align};

mod pointcloud;
pub use pointcloud::PointCloud;

pub use scanreg_lie::Pose;

use scanreg_index::IndexError;
use scanreg_lie::PoseError;

/// Error types for the registration module.
#[derive(Debug, thiserror::Error)]
pub enum IcpError {
    /// A point cloud without points was given.
    #[error("Point cloud is empty")]
    EmptyPointCloud,

    /// Point sets that must be in one-to-one correspondence differ in size.
    #[error("Mismatched point counts: {left_len} != {right_len}")]
    MismatchedInputLengths {
        /// Number of points of the first set.
        left_len: usize,
        /// Number of points of the second set.
        right_len: usize,
    },

    /// The geometry does not determine a unique rigid transform.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error raised by the search tree.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Error raised while building a pose.
    #[error(transparent)]
    Pose(#[from] PoseError),
}

//! Rigid registration of 3D point clouds.
//!
//! - [`lie`]: SO(3) and SE(3) poses with exponential and logarithm maps.
//! - [`index`]: principal-axis search tree for nearest neighbor queries.
//! - [`icp`]: robust point-to-point ICP on SE(3) and closed-form alignment.

#[doc(inline)]
pub use scanreg_lie as lie;

#[doc(inline)]
pub use scanreg_index as index;

#[doc(inline)]
pub use scanreg_icp as icp;

#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Rotations and rigid transforms
//!
//! - **SO(3)**: 3D rotations stored as unit quaternions, with the hat/vee
//!   operators and the exponential/logarithm maps.
//! - **SE(3)**: rigid transforms ([`se3::Pose`]) updated through a tangent
//!   increment `[ω; ρ]` and the exponential map, so the rotation block stays
//!   orthonormal.
//!
//! ## Example
//!
//! ```rust
//! use scanreg_lie::se3::Pose;
//!
//! // a quarter turn around z, no translation
//! let pose = Pose::exp(&[0.0, 0.0, std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0]);
//! let p = pose.transform_point(&[1.0, 0.0, 0.0]);
//! assert!(p[0].abs() < 1e-9 && (p[1] - 1.0).abs() < 1e-9);
//! ```

/// Special Euclidean group SE(3) for 3D rigid transformations.
pub mod se3;

/// Special Orthogonal group SO(3) for 3D rotations.
pub mod so3;

pub use se3::{Pose, PoseError};
pub use so3::SO3;

use glam::{DMat3, DMat4, DVec3, DVec4};
use thiserror::Error;

use crate::so3::SO3;

/// Tolerance used when checking that a matrix is a proper rotation.
pub const ROTATION_TOLERANCE: f64 = 1e-6;

/// Error types for building a pose from raw matrices.
#[derive(Debug, Error, PartialEq)]
pub enum PoseError {
    /// The rotation block is not orthonormal with determinant +1.
    #[error("Matrix is not a rotation: det = {determinant}, max |RᵀR - I| = {orthogonality_error}")]
    NotARotation {
        /// Determinant of the rotation block.
        determinant: f64,
        /// Largest absolute entry of `RᵀR - I`.
        orthogonality_error: f64,
    },

    /// The last row of a homogeneous matrix is not `[0, 0, 0, 1]`.
    #[error("Last row of a homogeneous transform must be [0, 0, 0, 1]")]
    NotHomogeneous,

    /// The rotation or the translation holds a NaN or infinite entry.
    #[error("Transform has non-finite entries")]
    NonFinite,

    /// An axis-angle rotation was requested around a zero vector.
    #[error("Cannot compute a rotation from a zero axis")]
    ZeroAxis,
}

/// A rigid transform in SE(3): `p' = R p + t`.
///
/// The rotation is stored as a unit quaternion, so the rotation block handed
/// out by [`Pose::rotation_matrix`] is orthonormal with determinant +1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    rotation: SO3,
    translation: DVec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation: SO3::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Create a pose from a rotation and a translation.
    pub fn new(rotation: SO3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a pose from a rotation of `angle` radians around `axis` and a translation.
    pub fn from_axis_angle(axis: DVec3, angle: f64, translation: DVec3) -> Result<Self, PoseError> {
        let rotation = SO3::from_axis_angle(axis, angle).ok_or(PoseError::ZeroAxis)?;
        Ok(Self::new(rotation, translation))
    }

    /// Create a pose from a rotation matrix and a translation.
    ///
    /// The rotation matrix is validated: it must be orthonormal with determinant +1.
    pub fn from_rt(rotation: &DMat3, translation: DVec3) -> Result<Self, PoseError> {
        if !rotation.is_finite() || !translation.is_finite() {
            return Err(PoseError::NonFinite);
        }
        let determinant = rotation.determinant();
        let orthogonality_error = orthogonality_error(rotation);
        let is_rotation = orthogonality_error <= ROTATION_TOLERANCE && determinant > 0.0;
        if !is_rotation {
            return Err(PoseError::NotARotation {
                determinant,
                orthogonality_error,
            });
        }
        Ok(Self::new(SO3::from_matrix(rotation), translation))
    }

    /// Create a pose from a 4x4 homogeneous matrix.
    pub fn from_matrix(mat: &DMat4) -> Result<Self, PoseError> {
        if mat.row(3) != DVec4::new(0.0, 0.0, 0.0, 1.0) {
            return Err(PoseError::NotHomogeneous);
        }
        let rotation = DMat3::from_cols(
            mat.x_axis.truncate(),
            mat.y_axis.truncate(),
            mat.z_axis.truncate(),
        );
        Self::from_rt(&rotation, mat.w_axis.truncate())
    }

    /// Create a pose from a row-major 4x4 homogeneous matrix.
    pub fn from_array(mat: &[[f64; 4]; 4]) -> Result<Self, PoseError> {
        Self::from_matrix(&DMat4::from_cols_array_2d(mat).transpose())
    }

    /// The rotation component.
    pub fn rotation(&self) -> &SO3 {
        &self.rotation
    }

    /// The rotation component as a 3x3 matrix.
    pub fn rotation_matrix(&self) -> DMat3 {
        self.rotation.matrix()
    }

    /// The translation component.
    pub fn translation(&self) -> DVec3 {
        self.translation
    }

    /// The 4x4 homogeneous matrix.
    pub fn matrix(&self) -> DMat4 {
        let r = self.rotation.matrix();
        DMat4::from_cols(
            r.x_axis.extend(0.0),
            r.y_axis.extend(0.0),
            r.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// The row-major 4x4 homogeneous matrix.
    pub fn to_array(&self) -> [[f64; 4]; 4] {
        self.matrix().transpose().to_cols_array_2d()
    }

    /// Apply the transform to a point.
    #[inline]
    pub fn transform(&self, p: DVec3) -> DVec3 {
        self.rotation.transform(p) + self.translation
    }

    /// Apply the transform to a point given as an array.
    #[inline]
    pub fn transform_point(&self, p: &[f64; 3]) -> [f64; 3] {
        self.transform(DVec3::from_array(*p)).to_array()
    }

    /// Apply the transform to a set of points.
    pub fn transform_points(&self, points: &[[f64; 3]]) -> Vec<[f64; 3]> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -rotation.transform(self.translation),
        }
    }

    /// Composition `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Pose) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.translation + self.rotation.transform(other.translation),
        }
    }

    /// Exponential map of a tangent increment `[ω; ρ]` (rotation first).
    pub fn exp(delta: &[f64; 6]) -> Self {
        let omega = DVec3::new(delta[0], delta[1], delta[2]);
        let rho = DVec3::new(delta[3], delta[4], delta[5]);
        Self {
            rotation: SO3::exp(omega),
            translation: SO3::left_jacobian(omega) * rho,
        }
    }

    /// Logarithm map, the inverse of [`Pose::exp`].
    pub fn log(&self) -> [f64; 6] {
        let omega = self.rotation.log();
        let rho = SO3::left_jacobian_inverse(omega) * self.translation;
        [omega.x, omega.y, omega.z, rho.x, rho.y, rho.z]
    }

    /// Apply a tangent increment on the right: `self ∘ Exp(delta)`.
    pub fn retract(&self, delta: &[f64; 6]) -> Self {
        self.compose(&Self::exp(delta))
    }

    /// Largest absolute entry of `RᵀR - I` for the rotation block.
    pub fn orthogonality_error(&self) -> f64 {
        orthogonality_error(&self.rotation.matrix())
    }

    /// Re-project the rotation onto SO(3) by renormalizing its quaternion.
    pub fn orthonormalized(&self) -> Self {
        Self {
            rotation: SO3::from_quaternion(&self.rotation.quaternion()),
            translation: self.translation,
        }
    }
}

impl std::ops::Mul<Pose> for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Self::Output {
        self.compose(&rhs)
    }
}

fn orthogonality_error(r: &DMat3) -> f64 {
    (r.transpose() * *r - DMat3::IDENTITY)
        .to_cols_array()
        .iter()
        .fold(0.0, |acc, x| acc.max(x.abs()))
}

use glam::{DMat3, DQuat, DVec3};

/// Below this rotation angle the maps switch to their Taylor expansions.
pub const SMALL_ANGLE_EPSILON: f64 = 1e-8;

/// A 3D rotation stored as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3 {
    q: DQuat,
}

impl SO3 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { q: DQuat::IDENTITY };

    /// Create a rotation from a quaternion. The quaternion is normalized.
    pub fn from_quaternion(quat: &DQuat) -> Self {
        Self {
            q: quat.normalize(),
        }
    }

    /// Create a rotation from a rotation matrix.
    ///
    /// PRECONDITION: `mat` is orthonormal with determinant +1.
    pub fn from_matrix(mat: &DMat3) -> Self {
        Self {
            q: DQuat::from_mat3(mat).normalize(),
        }
    }

    /// Create a rotation of `angle` radians around `axis`.
    ///
    /// Returns `None` when the axis has zero length.
    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Option<Self> {
        let axis = axis.try_normalize()?;
        Some(Self {
            q: DQuat::from_axis_angle(axis, angle),
        })
    }

    /// The unit quaternion.
    pub fn quaternion(&self) -> DQuat {
        self.q
    }

    /// The rotation matrix.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_quat(self.q)
    }

    /// The inverse rotation.
    pub fn inverse(&self) -> Self {
        Self {
            q: self.q.conjugate(),
        }
    }

    /// Rotate a vector.
    #[inline]
    pub fn transform(&self, v: DVec3) -> DVec3 {
        self.q * v
    }

    /// The rotation angle in radians, in `[0, pi]`.
    pub fn angle(&self) -> f64 {
        self.log().length()
    }

    /// Lie algebra -> Lie group
    pub fn exp(omega: DVec3) -> Self {
        let theta_sq = omega.dot(omega);
        let theta = theta_sq.sqrt();

        let (w, b) = if theta < SMALL_ANGLE_EPSILON {
            // taylor expansion of cos(x/2) and sin(x/2)/x around 0
            (1.0 - theta_sq / 8.0, 0.5 - theta_sq / 48.0)
        } else {
            let half = 0.5 * theta;
            (half.cos(), half.sin() / theta)
        };

        let xyz = b * omega;
        Self {
            q: DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, w).normalize(),
        }
    }

    /// Lie group -> Lie algebra
    pub fn log(&self) -> DVec3 {
        let mut w = self.q.w;
        let mut vec = DVec3::new(self.q.x, self.q.y, self.q.z);

        // q and -q are the same rotation; pick the short way round
        if w < 0.0 {
            w = -w;
            vec = -vec;
        }

        let sin_half = vec.length();
        if sin_half < SMALL_ANGLE_EPSILON {
            vec * (2.0 / w)
        } else {
            let theta = 2.0 * sin_half.atan2(w);
            vec * (theta / sin_half)
        }
    }

    /// Vector space -> Lie algebra: the cross-product matrix of `v`.
    pub fn hat(v: DVec3) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(0.0, v.z, -v.y),
            DVec3::new(-v.z, 0.0, v.x),
            DVec3::new(v.y, -v.x, 0.0),
        )
    }

    /// Lie algebra -> vector space
    pub fn vee(omega: DMat3) -> DVec3 {
        DVec3::new(omega.y_axis.z, omega.z_axis.x, omega.x_axis.y)
    }

    /// Left Jacobian of SO(3), the `V` matrix of the SE(3) exponential.
    pub fn left_jacobian(omega: DVec3) -> DMat3 {
        let skew = Self::hat(omega);
        let skew_sq = skew * skew;
        let theta_sq = omega.dot(omega);
        let theta = theta_sq.sqrt();

        if theta < SMALL_ANGLE_EPSILON {
            return DMat3::IDENTITY + 0.5 * skew + (1.0 / 6.0) * skew_sq;
        }

        DMat3::IDENTITY
            + ((1.0 - theta.cos()) / theta_sq) * skew
            + ((theta - theta.sin()) / (theta_sq * theta)) * skew_sq
    }

    /// Inverse of [`SO3::left_jacobian`].
    pub fn left_jacobian_inverse(omega: DVec3) -> DMat3 {
        let skew = Self::hat(omega);
        let skew_sq = skew * skew;
        let theta_sq = omega.dot(omega);
        let theta = theta_sq.sqrt();

        if theta < SMALL_ANGLE_EPSILON {
            return DMat3::IDENTITY - 0.5 * skew + (1.0 / 12.0) * skew_sq;
        }

        let coeff = (1.0 - theta * theta.sin() / (2.0 * (1.0 - theta.cos()))) / theta_sq;
        DMat3::IDENTITY - 0.5 * skew + coeff * skew_sq
    }
}

impl std::ops::Mul<SO3> for SO3 {
    type Output = SO3;

    fn mul(self, rhs: Self) -> Self::Output {
        Self { q: self.q * rhs.q }
    }
}

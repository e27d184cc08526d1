use glam::{DMat3, DVec3};
use nalgebra::{Matrix3, Vector3};
use scanreg_lie::Pose;

use crate::{IcpError, RegistrationResult};

/// Relative rank threshold on the scatter of a point set.
const RANK_TOLERANCE: f64 = 1e-9;

/// Rounding error of a centred coordinate, in units of the centroid's ulp.
const CENTERING_ULPS: f64 = 16.0;

/// Compute the centroids of two point sets.
///
/// Both sets must be non-empty.
pub fn compute_centroids(points_in_src: &[[f64; 3]], points_in_dst: &[[f64; 3]]) -> (DVec3, DVec3) {
    (centroid(points_in_src), centroid(points_in_dst))
}

fn centroid(points: &[[f64; 3]]) -> DVec3 {
    let sum = points
        .iter()
        .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p));
    sum / points.len() as f64
}

fn to_vector(v: DVec3) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

/// Returns true if the centred points do not span at least a plane.
///
/// The spread is compared against the rounding error of centring at
/// `centroid`, so the result does not depend on where the set lies.
fn is_degenerate(points: &[[f64; 3]], centroid: DVec3) -> bool {
    let mut scatter = Matrix3::zeros();
    for p in points {
        let centered = to_vector(DVec3::from_array(*p) - centroid);
        scatter += centered * centered.transpose();
    }

    let eigenvalues = scatter.symmetric_eigenvalues();
    let mut s = [eigenvalues[0], eigenvalues[1], eigenvalues[2]];
    s.sort_by(|a, b| b.total_cmp(a));

    // squared rounding error of one centred coordinate, summed over the set
    let rounding = CENTERING_ULPS * f64::EPSILON * centroid.abs().max_element().max(1.0);
    let noise_floor = points.len() as f64 * rounding * rounding;

    !(s[0] > noise_floor) || s[1] <= RANK_TOLERANCE * s[0]
}

/// Compute the rigid transform that best maps `points_in_src` onto `points_in_dst`.
///
/// The points are assumed to be in one-to-one correspondence. The rotation
/// is computed from the SVD of the cross-covariance of the centred sets and
/// is always proper (determinant +1), also when the best orthogonal fit is a
/// reflection.
///
/// # Arguments
///
/// * `points_in_src` - Points in the source frame.
/// * `points_in_dst` - Corresponding points in the destination frame.
///
/// # Returns
///
/// The pose `dst_T_src` minimizing `Σ |R p + t - q|²`.
pub fn fit_transformation(
    points_in_src: &[[f64; 3]],
    points_in_dst: &[[f64; 3]],
) -> Result<Pose, IcpError> {
    if points_in_src.len() != points_in_dst.len() {
        return Err(IcpError::MismatchedInputLengths {
            left_len: points_in_src.len(),
            right_len: points_in_dst.len(),
        });
    }
    if points_in_src.len() < 3 {
        return Err(IcpError::DegenerateGeometry(
            "at least 3 point pairs are required",
        ));
    }

    let (src_centroid, dst_centroid) = compute_centroids(points_in_src, points_in_dst);
    if is_degenerate(points_in_src, src_centroid) {
        return Err(IcpError::DegenerateGeometry(
            "source points are collinear or coincident",
        ));
    }
    if is_degenerate(points_in_dst, dst_centroid) {
        return Err(IcpError::DegenerateGeometry(
            "destination points are collinear or coincident",
        ));
    }

    // cross-covariance H = Σ (p - p̄)(q - q̄)ᵀ
    let mut h = Matrix3::zeros();
    for (p_in_src, p_in_dst) in points_in_src.iter().zip(points_in_dst.iter()) {
        let src_centered = to_vector(DVec3::from_array(*p_in_src) - src_centroid);
        let dst_centered = to_vector(DVec3::from_array(*p_in_dst) - dst_centroid);
        h += src_centered * dst_centered.transpose();
    }

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(IcpError::DegenerateGeometry("SVD did not converge"));
    };
    let v = v_t.transpose();

    // flip the axis of the smallest singular value to turn a reflection into a rotation
    let mut correction = Matrix3::identity();
    if (v * u.transpose()).determinant() < 0.0 {
        let smallest = svd.singular_values.imin();
        correction[(smallest, smallest)] = -1.0;
    }
    let r = v * correction * u.transpose();

    let rotation = DMat3::from_cols_slice(r.as_slice());
    let translation = dst_centroid - rotation * src_centroid;

    Ok(Pose::from_rt(&rotation, translation)?)
}

/// Closed-form registration of two point sets in known correspondence.
///
/// Same as [`fit_transformation`], packaged as a [`RegistrationResult`] with
/// a single cost entry holding the residual sum of squares and unit weights.
pub fn relaxed_align(
    set1: &[[f64; 3]],
    set2: &[[f64; 3]],
) -> Result<RegistrationResult, IcpError> {
    let pose = fit_transformation(set1, set2)?;

    let rotation = pose.rotation_matrix();
    let translation = pose.translation();
    let cost = set1
        .iter()
        .zip(set2.iter())
        .map(|(p, q)| {
            (rotation * DVec3::from_array(*p) + translation - DVec3::from_array(*q))
                .length_squared()
        })
        .sum::<f64>();

    log::debug!("closed form alignment of {} pairs, cost {}", set1.len(), cost);

    Ok(RegistrationResult {
        pose,
        costs: vec![cost],
        weights: vec![vec![1.0; set1.len()]],
        num_inliers: vec![set1.len()],
        num_iterations: 1,
        converged: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn create_random_points(num_points: usize, seed: u64) -> Vec<[f64; 3]> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..num_points)
            .map(|_| {
                [
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ]
            })
            .collect()
    }

    #[test]
    fn test_compute_centroids() {
        let (src, dst) = compute_centroids(
            &[[1.0, 2.0, 3.0], [3.0, 4.0, 5.0]],
            &[[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, 2.0]],
        );
        assert_eq!(src, DVec3::new(2.0, 3.0, 4.0));
        assert_eq!(dst, DVec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_fit_transformation_identity() -> Result<(), IcpError> {
        let points = create_random_points(30, 0);
        let pose = fit_transformation(&points, &points)?;
        assert!(pose.rotation().angle() < 1e-9);
        assert!(pose.translation().length() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_recovers_pose() -> Result<(), IcpError> {
        let points_src = create_random_points(30, 1);
        let expected = Pose::from_axis_angle(
            DVec3::new(1.0, -2.0, 0.5),
            1.2,
            DVec3::new(0.5, -1.0, 2.0),
        )?;
        let points_dst = expected.transform_points(&points_src);

        let result = relaxed_align(&points_src, &points_dst)?;
        let difference = result.pose.inverse() * expected;
        assert!(difference.rotation().angle() < 1e-9);
        assert!(difference.translation().length() < 1e-9);

        assert_eq!(result.costs.len(), 1);
        assert!(result.costs[0] < 1e-18);
        assert_eq!(result.weights, vec![vec![1.0; 30]]);
        assert_eq!(result.num_iterations, 1);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_planar_points() -> Result<(), IcpError> {
        let points_src = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let expected = Pose::from_axis_angle(DVec3::X, 0.4, DVec3::new(0.0, 0.1, 0.0))?;
        let points_dst = expected.transform_points(&points_src);

        let pose = fit_transformation(&points_src, &points_dst)?;
        for (p, q) in points_src.iter().zip(points_dst.iter()) {
            let mapped = pose.transform_point(p);
            for i in 0..3 {
                assert_relative_eq!(mapped[i], q[i], epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_fit_transformation_never_reflects() -> Result<(), IcpError> {
        let points_src = create_random_points(20, 2);
        let mirrored = points_src
            .iter()
            .map(|p| [p[0], p[1], -p[2]])
            .collect::<Vec<_>>();

        let pose = fit_transformation(&points_src, &mirrored)?;
        assert_relative_eq!(pose.rotation_matrix().determinant(), 1.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_far_from_origin() -> Result<(), IcpError> {
        let center = DVec3::new(5e5, 4e6, 100.0);
        let points_src = (0..27)
            .map(|i| {
                let offset = DVec3::new(
                    (i % 3) as f64 - 1.0,
                    ((i / 3) % 3) as f64 - 1.0,
                    (i / 9) as f64 - 1.0,
                );
                (center + offset).to_array()
            })
            .collect::<Vec<_>>();

        // small rotation about the centre of the set plus a shift
        let motion = Pose::from_axis_angle(DVec3::new(0.01, -0.02, 0.03), 0.0374, DVec3::ZERO)?;
        let shift = DVec3::new(0.2, -0.1, 0.05);
        let points_dst = points_src
            .iter()
            .map(|p| (center + motion.transform(DVec3::from_array(*p) - center) + shift).to_array())
            .collect::<Vec<_>>();

        let result = relaxed_align(&points_src, &points_dst)?;
        for (p, q) in points_src.iter().zip(points_dst.iter()) {
            let mapped = result.pose.transform_point(p);
            for i in 0..3 {
                assert_relative_eq!(mapped[i], q[i], epsilon = 1e-6);
            }
        }
        assert_relative_eq!(result.pose.rotation().angle(), 0.0374, epsilon = 1e-7);

        // coincident points far from the origin are still rejected
        let coincident = vec![center.to_array(); 5];
        assert!(matches!(
            fit_transformation(&coincident, &points_src[..5]),
            Err(IcpError::DegenerateGeometry(_))
        ));
        Ok(())
    }

    #[test]
    fn test_fit_transformation_errors() {
        let points = create_random_points(5, 3);
        assert!(matches!(
            fit_transformation(&points, &points[..4]),
            Err(IcpError::MismatchedInputLengths {
                left_len: 5,
                right_len: 4
            })
        ));
        assert!(matches!(
            fit_transformation(&points[..2], &points[..2]),
            Err(IcpError::DegenerateGeometry(_))
        ));

        let collinear = (0..5).map(|i| [i as f64, 2.0 * i as f64, 0.5]).collect::<Vec<_>>();
        assert!(matches!(
            relaxed_align(&collinear, &points),
            Err(IcpError::DegenerateGeometry(_))
        ));

        let coincident = vec![[0.3, 0.2, 0.1]; 5];
        assert!(matches!(
            relaxed_align(&coincident, &points),
            Err(IcpError::DegenerateGeometry(_))
        ));
    }
}

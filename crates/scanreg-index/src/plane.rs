use nalgebra::{DMatrix, SymmetricEigen};

/// A splitting plane given by a point on the plane and a unit normal.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlane<const D: usize> {
    /// Point on the plane, the mean of the points it splits.
    pub mean: [f64; D],
    /// Unit normal of the plane.
    pub normal: [f64; D],
}

impl<const D: usize> SplitPlane<D> {
    /// Signed distance of a point to the plane: `dot(normal, p - mean)`.
    #[inline]
    pub fn signed_distance(&self, p: &[f64; D]) -> f64 {
        self.normal
            .iter()
            .zip(p.iter().zip(self.mean.iter()))
            .map(|(n, (x, m))| n * (x - m))
            .sum()
    }

    /// Returns true if the point lies on the left side (signed distance <= 0).
    #[inline]
    pub fn is_left(&self, p: &[f64; D]) -> bool {
        self.signed_distance(p) <= 0.0
    }

    /// Distance of the farthest point from the plane.
    pub fn extent(&self, points: &[[f64; D]]) -> f64 {
        points
            .iter()
            .map(|p| self.signed_distance(p).abs())
            .fold(0.0, f64::max)
    }

    /// Partition points into left (signed distance <= 0) and right (> 0).
    pub fn partition(&self, points: Vec<[f64; D]>) -> (Vec<[f64; D]>, Vec<[f64; D]>) {
        points.into_iter().partition(|p| self.is_left(p))
    }
}

/// Compute the mean of a point set.
///
/// PRECONDITION: `points` is not empty.
pub fn compute_mean<const D: usize>(points: &[[f64; D]]) -> [f64; D] {
    let mut mean = [0.0; D];
    for p in points {
        for (m, x) in mean.iter_mut().zip(p.iter()) {
            *m += x;
        }
    }
    let n = points.len() as f64;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}

/// Compute the sample covariance of a point set around `mean`.
pub fn compute_covariance<const D: usize>(points: &[[f64; D]], mean: &[f64; D]) -> DMatrix<f64> {
    let mut cov = DMatrix::<f64>::zeros(D, D);
    for p in points {
        for i in 0..D {
            let di = p[i] - mean[i];
            for j in i..D {
                cov[(i, j)] += di * (p[j] - mean[j]);
            }
        }
    }
    for i in 0..D {
        for j in 0..i {
            cov[(i, j)] = cov[(j, i)];
        }
    }
    cov / points.len() as f64
}

/// Compute the splitting plane of a point set.
///
/// The plane passes through the mean and its normal is the eigenvector of
/// the largest covariance eigenvalue.
///
/// Returns `None` when the set has fewer than two points or has no spread
/// (coincident points or non-finite coordinates).
pub fn principal_plane<const D: usize>(points: &[[f64; D]]) -> Option<SplitPlane<D>> {
    if points.len() < 2 || D == 0 {
        return None;
    }

    let mean = compute_mean(points);
    let cov = compute_covariance(points, &mean);
    if cov.iter().any(|x| !x.is_finite()) {
        return None;
    }

    let eig = SymmetricEigen::new(cov);
    let imax = eig.eigenvalues.imax();
    let lambda = eig.eigenvalues[imax];
    if !lambda.is_finite() || lambda <= 0.0 {
        return None;
    }

    let axis = eig.eigenvectors.column(imax);
    let norm = axis.norm();
    if norm <= 0.0 {
        return None;
    }
    let normal = std::array::from_fn(|i| axis[i] / norm);

    Some(SplitPlane { mean, normal })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compute_mean() {
        let mean = compute_mean(&[[1.0, 2.0, 3.0], [3.0, 4.0, 5.0]]);
        assert_eq!(mean, [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_compute_covariance() {
        let points = [[1.0, 0.0], [-1.0, 0.0], [0.0, 2.0], [0.0, -2.0]];
        let mean = compute_mean(&points);
        let cov = compute_covariance(&points, &mean);
        assert_relative_eq!(cov[(0, 0)], 0.5);
        assert_relative_eq!(cov[(1, 1)], 2.0);
        assert_relative_eq!(cov[(0, 1)], 0.0);
        assert_relative_eq!(cov[(1, 0)], 0.0);
    }

    #[test]
    fn test_principal_plane_follows_largest_spread() -> Result<(), &'static str> {
        // elongated along the (1, 1, 0) diagonal
        let points = (0..20)
            .map(|i| {
                let t = i as f64 * 0.5;
                let jitter = if i % 2 == 0 { 0.05 } else { -0.05 };
                [t, t + jitter, 0.1 * jitter]
            })
            .collect::<Vec<_>>();
        let plane = principal_plane(&points).ok_or("degenerate")?;
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let alignment = (plane.normal[0] * s + plane.normal[1] * s).abs();
        assert!(alignment > 0.999, "normal {:?}", plane.normal);

        let norm: f64 = plane.normal.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_principal_plane_degenerate() {
        assert!(principal_plane(&[[1.0, 1.0, 1.0]; 5]).is_none());
        assert!(principal_plane(&[[1.0, 2.0, 3.0]]).is_none());
        assert!(principal_plane::<3>(&[]).is_none());
        assert!(principal_plane(&[[f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0]]).is_none());
    }

    #[test]
    fn test_partition_and_extent() {
        let plane = SplitPlane {
            mean: [0.0, 0.0],
            normal: [1.0, 0.0],
        };
        let points = vec![[-2.0, 1.0], [0.0, 5.0], [3.0, -1.0], [0.5, 0.0]];
        assert_relative_eq!(plane.extent(&points), 3.0);

        let (left, right) = plane.partition(points);
        assert_eq!(left, vec![[-2.0, 1.0], [0.0, 5.0]]);
        assert_eq!(right, vec![[3.0, -1.0], [0.5, 0.0]]);
    }
}

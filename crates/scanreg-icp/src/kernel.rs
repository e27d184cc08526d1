/// Robust kernel used to weight correspondences.
///
/// Every kernel gives full weight to a correspondence whose squared error is
/// within the threshold. Above it the weight decreases monotonically with the
/// squared error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobustKernel {
    /// Weight `sqrt(threshold / cost)`: the weighted squared error equals the threshold.
    #[default]
    Huber,
    /// Weight `threshold / cost`: far correspondences fade out quadratically.
    Cauchy,
    /// Weight `0`: correspondences above the threshold are dropped.
    Truncated,
}

impl RobustKernel {
    /// Compute the weight of a correspondence.
    ///
    /// # Arguments
    ///
    /// * `cost` - Squared error `eᵀe` of the correspondence.
    /// * `threshold` - Inlier/outlier boundary on the squared error.
    ///
    /// # Returns
    ///
    /// A weight in `[0, 1]`.
    pub fn weight(&self, cost: f64, threshold: f64) -> f64 {
        if cost <= threshold {
            return 1.0;
        }
        if !cost.is_finite() {
            return 0.0;
        }
        match self {
            RobustKernel::Huber => (threshold / cost).sqrt(),
            RobustKernel::Cauchy => threshold / cost,
            RobustKernel::Truncated => 0.0,
        }
    }

    /// Returns true if the cost is within the inlier threshold.
    #[inline]
    pub fn is_inlier(cost: f64, threshold: f64) -> bool {
        cost <= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const KERNELS: [RobustKernel; 3] = [
        RobustKernel::Huber,
        RobustKernel::Cauchy,
        RobustKernel::Truncated,
    ];

    #[test]
    fn test_inliers_have_full_weight() {
        for kernel in KERNELS {
            assert_eq!(kernel.weight(0.0, 0.01), 1.0);
            assert_eq!(kernel.weight(0.01, 0.01), 1.0);
        }
    }

    #[test]
    fn test_huber_weight() {
        let kernel = RobustKernel::Huber;
        assert_relative_eq!(kernel.weight(4.0, 1.0), 0.5);
        // the weighted error has the squared norm of the threshold
        let cost = 9.0;
        let w = kernel.weight(cost, 1.0);
        assert_relative_eq!(w * w * cost, 1.0);
    }

    #[test]
    fn test_cauchy_weight() {
        assert_relative_eq!(RobustKernel::Cauchy.weight(4.0, 1.0), 0.25);
    }

    #[test]
    fn test_truncated_weight() {
        assert_eq!(RobustKernel::Truncated.weight(1.0001, 1.0), 0.0);
    }

    #[test]
    fn test_weights_are_monotonic_and_bounded() {
        for kernel in KERNELS {
            let mut previous = 1.0;
            for i in 0..100 {
                let cost = 0.001 * (i * i) as f64;
                let w = kernel.weight(cost, 0.5);
                assert!((0.0..=1.0).contains(&w));
                assert!(w <= previous);
                previous = w;
            }
        }
    }

    #[test]
    fn test_far_outliers_vanish() {
        for kernel in KERNELS {
            assert!(kernel.weight(1e8, 1e-2) < 1e-4);
        }
    }

    #[test]
    fn test_non_finite_cost() {
        for kernel in KERNELS {
            assert_eq!(kernel.weight(f64::INFINITY, 1.0), 0.0);
            assert_eq!(kernel.weight(f64::NAN, 1.0), 0.0);
        }
    }

    #[test]
    fn test_default_is_huber() {
        assert_eq!(RobustKernel::default(), RobustKernel::Huber);
        assert!(RobustKernel::is_inlier(0.5, 0.5));
        assert!(!RobustKernel::is_inlier(0.6, 0.5));
    }
}

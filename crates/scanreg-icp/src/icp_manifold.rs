use scanreg_index::SearchTree;
use scanreg_lie::Pose;

use crate::ops::{find_correspondences, NormalEquations};
use crate::{Correspondence, IcpError, PointCloud, RobustKernel};

/// Parameters of the manifold ICP.
#[derive(Debug, Clone, PartialEq)]
pub struct IcpConfig {
    /// Number of Gauss-Newton iterations.
    pub iterations: usize,
    /// Squared error above which a correspondence is downweighted.
    pub kernel_threshold: f64,
    /// Robust kernel applied to the squared errors.
    pub kernel: RobustKernel,
    /// Maximum distance between a transformed source point and its match.
    pub max_correspondence_distance: f64,
    /// Extent below which the target search tree stops splitting.
    pub max_leaf_extent: f64,
    /// Damping added to the normal equations, relative to their mean diagonal.
    pub damping: f64,
    /// Stop early once the norm of the increment falls below this value.
    pub convergence_tolerance: Option<f64>,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            iterations: 30,
            kernel_threshold: 0.01,
            kernel: RobustKernel::Huber,
            max_correspondence_distance: 1.0,
            max_leaf_extent: 0.05,
            damping: 1e-6,
            convergence_tolerance: None,
        }
    }
}

impl IcpConfig {
    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), IcpError> {
        fn non_negative(name: &str, value: f64) -> Result<(), IcpError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(IcpError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )))
            }
        }

        non_negative("kernel_threshold", self.kernel_threshold)?;
        non_negative("max_leaf_extent", self.max_leaf_extent)?;
        non_negative("damping", self.damping)?;
        if let Some(tolerance) = self.convergence_tolerance {
            non_negative("convergence_tolerance", tolerance)?;
        }
        if self.max_correspondence_distance.is_nan() || self.max_correspondence_distance <= 0.0 {
            return Err(IcpError::InvalidConfig(format!(
                "max_correspondence_distance must be positive, got {}",
                self.max_correspondence_distance
            )));
        }
        Ok(())
    }
}

/// Outcome of a registration.
///
/// The pose maps source points into the target frame.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Estimated pose.
    pub pose: Pose,
    /// Total weighted squared error `Σ w eᵀe` of each iteration.
    pub costs: Vec<f64>,
    /// Per-iteration weight of every source point; 0 for unmatched points.
    pub weights: Vec<Vec<f64>>,
    /// Per-iteration number of correspondences within the kernel threshold.
    pub num_inliers: Vec<usize>,
    /// The total number of iterations performed.
    pub num_iterations: usize,
    /// Whether the increment fell below the convergence tolerance.
    pub converged: bool,
}

impl RegistrationResult {
    fn new(pose: Pose) -> Self {
        Self {
            pose,
            costs: Vec::new(),
            weights: Vec::new(),
            num_inliers: Vec::new(),
            num_iterations: 0,
            converged: false,
        }
    }

    /// Cost of the last iteration.
    pub fn final_cost(&self) -> Option<f64> {
        self.costs.last().copied()
    }

    /// Weights of the last iteration.
    pub fn final_weights(&self) -> Option<&[f64]> {
        self.weights.last().map(Vec::as_slice)
    }
}

/// Point-to-point ICP solved by Gauss-Newton on SE(3).
///
/// Every iteration matches the source points to the target through a search
/// tree, weights the matches with a robust kernel and applies the solution of
/// the normal equations through the exponential map.
pub struct IcpManifold<'a> {
    source: &'a PointCloud,
    target: &'a PointCloud,
    initial_guess: Pose,
    config: IcpConfig,
}

impl<'a> IcpManifold<'a> {
    /// Create an optimizer aligning `source` onto `target`.
    ///
    /// The initial guess is the identity.
    pub fn new(
        source: &'a PointCloud,
        target: &'a PointCloud,
        config: IcpConfig,
    ) -> Result<Self, IcpError> {
        config.validate()?;
        Ok(Self {
            source,
            target,
            initial_guess: Pose::IDENTITY,
            config,
        })
    }

    /// Set the pose the optimization starts from.
    pub fn with_initial_guess(mut self, initial_guess: Pose) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// The pose the optimization starts from.
    pub fn initial_guess(&self) -> &Pose {
        &self.initial_guess
    }

    /// Build the search tree over the target points.
    pub fn build_tree(&self) -> Result<SearchTree<3>, IcpError> {
        Ok(SearchTree::build(
            self.target.points(),
            self.config.max_leaf_extent,
        )?)
    }

    /// Weighted correspondences of the source points under `pose`.
    pub fn correspondences(&self, tree: &SearchTree<3>, pose: &Pose) -> Vec<Correspondence> {
        find_correspondences(
            self.source.points(),
            pose,
            tree,
            self.config.max_correspondence_distance,
            self.config.kernel,
            self.config.kernel_threshold,
        )
    }

    /// Run the optimization.
    ///
    /// # Returns
    ///
    /// The estimated pose together with the per-iteration costs and weights.
    pub fn align(&self) -> Result<RegistrationResult, IcpError> {
        let tree = self.build_tree()?;
        Ok(self.align_with_tree(&tree))
    }

    /// Run the optimization against a prebuilt tree over the target points.
    pub fn align_with_tree(&self, tree: &SearchTree<3>) -> RegistrationResult {
        let num_points = self.source.num_points();
        let mut result = RegistrationResult::new(self.initial_guess);

        for i in 0..self.config.iterations {
            log::debug!("Iteration: {}", i);
            let now = std::time::Instant::now();

            let correspondences = self.correspondences(tree, &result.pose);

            let mut system = NormalEquations::default();
            let mut weights = vec![0.0; num_points];
            let mut cost = 0.0;
            let mut num_inliers = 0;
            for c in &correspondences {
                system.add(&c.linearization, c.weight);
                weights[c.source_index] = c.weight;
                cost += c.weight * c.cost;
                if RobustKernel::is_inlier(c.cost, self.config.kernel_threshold) {
                    num_inliers += 1;
                }
            }

            result.costs.push(cost);
            result.weights.push(weights);
            result.num_inliers.push(num_inliers);
            result.num_iterations += 1;

            if correspondences.is_empty() {
                log::warn!("Iteration {}: no correspondences, pose left unchanged", i);
                continue;
            }

            let delta = match system.solve(self.config.damping) {
                Some(delta) => delta,
                None => {
                    log::warn!("Iteration {}: normal equations could not be solved", i);
                    [0.0; 6]
                }
            };
            result.pose = result.pose.retract(&delta);

            let step = delta.iter().map(|x| x * x).sum::<f64>().sqrt();
            log::debug!(
                "Num correspondences: {}, inliers: {}, cost: {}, step: {}",
                correspondences.len(),
                num_inliers,
                cost,
                step
            );
            log::debug!("elapsed: {:?}", now.elapsed());

            if let Some(tolerance) = self.config.convergence_tolerance {
                if step < tolerance {
                    log::debug!("ICP converged in {} iterations with cost {}", i + 1, cost);
                    result.converged = true;
                    break;
                }
            }
        }

        result
    }
}

/// Align `source` onto `target` with the manifold ICP.
///
/// # Arguments
///
/// * `source` - Points to move.
/// * `target` - Reference points.
/// * `initial_guess` - Starting pose; the identity if `None`.
/// * `config` - Optimization parameters.
///
/// # Returns
///
/// The pose mapping `source` into the frame of `target`, with diagnostics.
pub fn align(
    source: &PointCloud,
    target: &PointCloud,
    initial_guess: Option<Pose>,
    config: IcpConfig,
) -> Result<RegistrationResult, IcpError> {
    IcpManifold::new(source, target, config)?
        .with_initial_guess(initial_guess.unwrap_or_default())
        .align()
}

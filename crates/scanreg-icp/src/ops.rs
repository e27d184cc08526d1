use glam::{DMat3, DVec3};
use nalgebra::{Matrix3x6, Matrix6, Vector3, Vector6};
use rayon::prelude::*;
use scanreg_index::SearchTree;
use scanreg_lie::{Pose, SO3};

use crate::RobustKernel;

/// Number of times the damping is increased when the normal equations cannot be factorized.
const MAX_DAMPING_RETRIES: usize = 3;

/// Linearized point-to-point error of one correspondence.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorJacobian {
    /// Error `e = z - (R p + t)`.
    pub error: Vector3<f64>,
    /// Derivative of `e` with respect to a right perturbation `[ω; ρ]` of the pose.
    pub jacobian: Matrix3x6<f64>,
    /// The source point mapped by the pose, `R p + t`.
    pub transformed: [f64; 3],
    /// The target point `z`.
    pub target: [f64; 3],
}

/// Compute the error and Jacobian of a source/target point pair.
///
/// For the update `pose ∘ Exp([ω; ρ])` the error behaves as
/// `e(δ) ≈ e + J δ` with `J = [R·hat(p) | -R]`.
///
/// # Arguments
///
/// * `pose` - The current estimate.
/// * `source_point` - The point `p` in the source frame.
/// * `target_point` - The matched point `z` in the target frame.
pub fn error_and_jacobian(
    pose: &Pose,
    source_point: &[f64; 3],
    target_point: &[f64; 3],
) -> ErrorJacobian {
    linearize(
        &pose.rotation_matrix(),
        pose.translation(),
        source_point,
        target_point,
    )
}

pub(crate) fn linearize(
    rotation: &DMat3,
    translation: DVec3,
    source_point: &[f64; 3],
    target_point: &[f64; 3],
) -> ErrorJacobian {
    let p = DVec3::from_array(*source_point);
    let transformed = *rotation * p + translation;
    let e = DVec3::from_array(*target_point) - transformed;

    let r_hat = *rotation * SO3::hat(p);
    let jacobian = Matrix3x6::from_fn(|i, j| {
        if j < 3 {
            r_hat.col(j)[i]
        } else {
            -rotation.col(j - 3)[i]
        }
    });

    ErrorJacobian {
        error: Vector3::new(e.x, e.y, e.z),
        jacobian,
        transformed: transformed.to_array(),
        target: *target_point,
    }
}

/// A source point matched to its nearest target point.
#[derive(Debug, Clone, PartialEq)]
pub struct Correspondence {
    /// Index of the source point.
    pub source_index: usize,
    /// The source point in the source frame.
    pub source: [f64; 3],
    /// Error, Jacobian and matched target point.
    pub linearization: ErrorJacobian,
    /// Squared error `eᵀe`.
    pub cost: f64,
    /// Weight assigned by the robust kernel.
    pub weight: f64,
}

/// Match every source point to its nearest target point under `pose`.
///
/// The search runs in parallel; the result is in source order and skips
/// source points without a target within `max_distance`.
pub(crate) fn find_correspondences(
    source: &[[f64; 3]],
    pose: &Pose,
    tree: &SearchTree<3>,
    max_distance: f64,
    kernel: RobustKernel,
    kernel_threshold: f64,
) -> Vec<Correspondence> {
    let rotation = pose.rotation_matrix();
    let translation = pose.translation();

    source
        .par_iter()
        .enumerate()
        .filter_map(|(source_index, p)| {
            let query = (rotation * DVec3::from_array(*p) + translation).to_array();
            let neighbor = tree.find_neighbor(&query, max_distance)?;
            let linearization = linearize(&rotation, translation, p, &neighbor.point);
            let cost = linearization.error.norm_squared();
            Some(Correspondence {
                source_index,
                source: *p,
                linearization,
                cost,
                weight: kernel.weight(cost, kernel_threshold),
            })
        })
        .collect()
}

/// Accumulated Gauss-Newton system `H = Σ w JᵀJ`, `b = Σ w Jᵀe`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquations {
    /// Approximate Hessian.
    pub h: Matrix6<f64>,
    /// Gradient term.
    pub b: Vector6<f64>,
    /// Number of terms added.
    pub num_terms: usize,
}

impl Default for NormalEquations {
    fn default() -> Self {
        Self {
            h: Matrix6::zeros(),
            b: Vector6::zeros(),
            num_terms: 0,
        }
    }
}

impl NormalEquations {
    /// Add a weighted correspondence to the system.
    pub fn add(&mut self, linearization: &ErrorJacobian, weight: f64) {
        let jt = linearization.jacobian.transpose();
        self.h += (jt * linearization.jacobian) * weight;
        self.b += (jt * linearization.error) * weight;
        self.num_terms += 1;
    }

    /// Solve `(H + λI) δ = -b` for the pose increment.
    ///
    /// `λ` is `damping` scaled by the mean diagonal of `H`. If the damped
    /// system is not positive definite, `λ` is increased a few times before
    /// giving up.
    ///
    /// # Returns
    ///
    /// The increment `[ω; ρ]`, or `None` if no factorization succeeded.
    pub fn solve(&self, damping: f64) -> Option<[f64; 6]> {
        let scale = (self.h.trace() / 6.0).max(1.0);
        let mut lambda = damping * scale;

        for attempt in 0..=MAX_DAMPING_RETRIES {
            let damped = self.h + Matrix6::identity() * lambda;
            if let Some(cholesky) = damped.cholesky() {
                let delta = cholesky.solve(&(-self.b));
                if delta.iter().all(|x| x.is_finite()) {
                    return Some(std::array::from_fn(|i| delta[i]));
                }
            }
            log::trace!("normal equations not positive definite at attempt {attempt}, λ = {lambda}");
            lambda = (lambda * 1e3).max(1e-9 * scale);
        }

        None
    }
}

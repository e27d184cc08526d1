use glam::DVec3;
use scanreg_index::IndexError;

use crate::IcpError;

/// A non-empty set of 3D points.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud(Vec<[f64; 3]>);

impl PointCloud {
    /// Create a point cloud taking ownership of `points`.
    ///
    /// Returns [`IcpError::EmptyPointCloud`] if `points` is empty and
    /// [`IndexError::NonFinitePoint`] if a coordinate is NaN or infinite.
    pub fn from_vec(points: Vec<[f64; 3]>) -> Result<Self, IcpError> {
        if points.is_empty() {
            return Err(IcpError::EmptyPointCloud);
        }
        if let Some(index) = points
            .iter()
            .position(|p| p.iter().any(|x| !x.is_finite()))
        {
            return Err(IndexError::NonFinitePoint { index }.into());
        }
        Ok(Self(points))
    }

    /// Create a point cloud from interleaved coordinates `[x0, y0, z0, x1, ...]`.
    pub fn from_flat(data: &[f64]) -> Result<Self, IcpError> {
        if data.len() % 3 != 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 3,
                actual: data.len(),
            }
            .into());
        }
        Self::from_vec(
            data.chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        )
    }

    /// Number of points in the cloud.
    pub fn num_points(&self) -> usize {
        self.0.len()
    }

    /// The points as a slice.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.0
    }

    /// Consume the cloud and return its points.
    pub fn into_inner(self) -> Vec<[f64; 3]> {
        self.0
    }

    /// Mean of the points.
    pub fn centroid(&self) -> DVec3 {
        let sum = self
            .0
            .iter()
            .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p));
        sum / self.0.len() as f64
    }
}

impl std::ops::Deref for PointCloud {
    type Target = [[f64; 3]];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

use serde::{Deserialize, Serialize};

use super::util;
use crate::error::{Error, Result};
use crate::exec::Executor;

/// Fitted cluster centers. Immutable once built.
///
/// Deserialization goes through [`ClusterModel::new`], so a persisted model
/// with no centroids or ragged centroids is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelRepr")]
pub struct ClusterModel {
    centroids: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct ModelRepr {
    centroids: Vec<Vec<f64>>,
}

impl TryFrom<ModelRepr> for ClusterModel {
    type Error = Error;

    fn try_from(repr: ModelRepr) -> Result<Self> {
        Self::new(repr.centroids)
    }
}

impl ClusterModel {
    /// Wrap a set of centroids. All must share one non-zero dimension.
    pub fn new(centroids: Vec<Vec<f64>>) -> Result<Self> {
        util::check_points(&centroids)?;
        Ok(Self { centroids })
    }

    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Dimension shared by every centroid.
    pub fn dim(&self) -> usize {
        self.centroids[0].len()
    }

    /// Centroids in cluster-id order.
    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Closest centroid and the Euclidean distance to it.
    pub fn nearest(&self, point: &[f64]) -> Result<(usize, f64)> {
        if point.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: point.len(),
            });
        }
        let (c, d2) = util::nearest(point, &self.centroids);
        Ok((c, d2.sqrt()))
    }

    /// Cluster id of every point.
    pub fn predict<E: Executor>(&self, exec: &E, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        self.check(data)?;
        Ok(exec.map(data, |x| util::nearest(x, &self.centroids).0))
    }

    /// Sum of squared distances from every point to its closest centroid.
    pub fn inertia<E: Executor>(&self, exec: &E, data: &[Vec<f64>]) -> Result<f64> {
        self.check(data)?;
        Ok(exec.reduce(
            data,
            || 0.0,
            |acc, x| acc + util::nearest(x, &self.centroids).1,
            |a, b| a + b,
        ))
    }

    fn check(&self, data: &[Vec<f64>]) -> Result<()> {
        let d = util::check_points(data)?;
        if d != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: d,
            });
        }
        Ok(())
    }
}

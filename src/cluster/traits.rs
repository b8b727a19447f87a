use super::model::ClusterModel;
use crate::error::Result;
use crate::exec::Sequential;

/// Common interface for centroid clustering engines (one label per point).
pub trait Clustering {
    /// Fit the engine and return the fitted centroids.
    fn fit_model(&self, data: &[Vec<f64>]) -> Result<ClusterModel>;

    /// Fit the engine and return one cluster label per input point.
    ///
    /// The default assigns every point to its nearest fitted centroid.
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        self.fit_model(data)?.predict(&Sequential, data)
    }

    /// The configured number of clusters.
    fn n_clusters(&self) -> usize;
}

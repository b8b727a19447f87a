//! Bisecting k-means: divisive hierarchical clustering built on 2-means.
//!
//! Start with every point in one cluster. Until there are `k` clusters, take
//! the divisible cluster with the largest within-cluster sum of squares and
//! split it in two with [`Kmeans`]. A cluster is divisible when it holds at
//! least two distinct points.
//!
//! Compared with flat k-means, the result depends less on initialization,
//! and the cluster sizes tend to be more even.
//!
//! ## References
//!
//! Steinbach, M., Karypis, G., Kumar, V. (2000). "A Comparison of Document
//! Clustering Techniques." KDD Workshop on Text Mining.

use super::kmeans::{Init, Kmeans};
use super::model::ClusterModel;
use super::traits::Clustering;
use super::util;
use crate::error::{Error, Result};
use crate::exec::{CancelToken, Executor, Sequential};

/// Bisecting k-means.
#[derive(Debug, Clone, PartialEq)]
pub struct BisectingKmeans {
    k: usize,
    max_iter: usize,
    tol: f64,
    init: Init,
    seed: u64,
}

/// Result of a bisecting k-means fit.
#[derive(Debug, Clone)]
pub struct BisectingFit {
    pub model: ClusterModel,
    pub labels: Vec<usize>,
    pub inertia: f64,
    /// Number of splits performed (`k - 1` on success).
    pub splits: usize,
}

struct Node {
    members: Vec<usize>,
    centroid: Vec<f64>,
    sse: f64,
    divisible: bool,
}

impl Node {
    fn new(data: &[Vec<f64>], members: Vec<usize>, dim: usize) -> Self {
        let centroid = util::mean_of(data, &members, dim);
        let sse = members
            .iter()
            .map(|&i| util::squared_euclidean(&data[i], &centroid))
            .sum();
        let divisible = members.iter().any(|&i| data[i] != data[members[0]]);
        Self {
            members,
            centroid,
            sse,
            divisible,
        }
    }
}

impl BisectingKmeans {
    /// Defaults: `max_iter = 20` per split, `tol = 1e-4`, random init, `seed = 42`.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 20,
            tol: 1e-4,
            init: Init::Random,
            seed: 42,
        }
    }

    /// Iteration cap for each 2-means split.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Centroid-shift tolerance for each 2-means split.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Initialization used by each 2-means split.
    pub fn with_init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    /// Base seed; split `i` uses `seed + i`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit sequentially without cancellation.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<BisectingFit> {
        self.fit_with(&Sequential, data, &CancelToken::new())
    }

    pub fn fit_with<E: Executor>(
        &self,
        exec: &E,
        data: &[Vec<f64>],
        cancel: &CancelToken,
    ) -> Result<BisectingFit> {
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        let dim = util::check_points(data)?;
        let distinct = util::count_distinct(data);
        if self.k > distinct {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: distinct,
            });
        }

        let mut nodes = vec![Node::new(data, (0..data.len()).collect(), dim)];
        let mut splits = 0usize;

        while nodes.len() < self.k {
            cancel.check()?;
            let Some(target) = nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.divisible)
                .max_by(|(ia, a), (ib, b)| a.sse.total_cmp(&b.sse).then(ib.cmp(ia)))
                .map(|(i, _)| i)
            else {
                break;
            };

            let members = std::mem::take(&mut nodes[target].members);
            let subset: Vec<Vec<f64>> = members.iter().map(|&i| data[i].clone()).collect();
            let fit = Kmeans::new(2)
                .with_max_iter(self.max_iter)
                .with_tol(self.tol)
                .with_init(self.init)
                .with_seed(self.seed.wrapping_add(splits as u64))
                .fit_with(exec, &subset, cancel)?;

            let (left, right): (Vec<(usize, usize)>, Vec<(usize, usize)>) = members
                .iter()
                .copied()
                .zip(fit.labels.iter().copied())
                .partition(|&(_, l)| l == 0);
            if left.is_empty() || right.is_empty() {
                nodes[target] = Node {
                    divisible: false,
                    ..Node::new(data, members, dim)
                };
                continue;
            }

            tracing::debug!(
                split = splits,
                size = members.len(),
                left = left.len(),
                right = right.len(),
                "bisecting split"
            );
            nodes[target] = Node::new(data, left.into_iter().map(|(i, _)| i).collect(), dim);
            nodes.push(Node::new(data, right.into_iter().map(|(i, _)| i).collect(), dim));
            splits += 1;
        }

        let mut labels = vec![0usize; data.len()];
        for (c, node) in nodes.iter().enumerate() {
            for &i in &node.members {
                labels[i] = c;
            }
        }
        let inertia = nodes.iter().map(|n| n.sse).sum();
        let model = ClusterModel::new(nodes.into_iter().map(|n| n.centroid).collect())?;

        Ok(BisectingFit {
            model,
            labels,
            inertia,
            splits,
        })
    }
}

impl Clustering for BisectingKmeans {
    fn fit_model(&self, data: &[Vec<f64>]) -> Result<ClusterModel> {
        Ok(self.fit(data)?.model)
    }

    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

//! K-means: Lloyd's algorithm with seeded initialization and empty-cluster reseeding.
//!
//! # The Algorithm (Lloyd, 1982)
//!
//! 1. Pick `k` initial centroids (uniformly at random, or k-means++).
//! 2. Assign every point to its nearest centroid (squared Euclidean).
//! 3. Move every centroid to the mean of its assigned points.
//! 4. Repeat 2–3 until assignments stop changing, the largest centroid shift
//!    drops to `tol`, or `max_iter` iterations have run.
//!
//! Objective (inertia):
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! Both steps can only lower `J`, so the recorded inertia history is
//! non-increasing.
//!
//! ## Empty clusters
//!
//! A cluster left without points after an assignment step has its centroid
//! moved to the point farthest from its own centroid. That point then has
//! distance 0 to the reseeded centroid, so the objective still cannot rise
//! and the cluster is non-empty after the next assignment. Fitting requires at
//! least `k` distinct points, which guarantees a candidate always exists.
//!
//! ## Parallelism
//!
//! The assignment step is an [`Executor::map`]; the centroid update is a
//! per-cluster sum/count [`Executor::reduce`]. Iterations are sequential, and
//! a [`CancelToken`] is checked at the top of each one.
//!
//! ## References
//!
//! Lloyd, S. (1982). "Least squares quantization in PCM." IEEE Trans. Inf. Theory.
//!
//! Arthur, D., Vassilvitskii, S. (2007). "k-means++: The Advantages of Careful
//! Seeding." SODA 2007.

use rand::prelude::*;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use super::model::ClusterModel;
use super::traits::Clustering;
use super::util;
use crate::error::{Error, Result};
use crate::exec::{CancelToken, Executor, Sequential};

/// Centroid initialization policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Init {
    /// `k` distinct points drawn uniformly.
    #[default]
    Random,
    /// D²-weighted seeding (Arthur & Vassilvitskii).
    KmeansPlusPlus,
}

/// K-means clustering.
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    max_iter: usize,
    tol: f64,
    seed: u64,
    init: Init,
}

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Final centroids.
    pub model: ClusterModel,
    /// Cluster id of every input point, consistent with `model`.
    pub labels: Vec<usize>,
    /// Final inertia.
    pub inertia: f64,
    /// Inertia after the initial assignment and after every later assignment.
    pub inertia_history: Vec<f64>,
    /// Lloyd iterations performed.
    pub iterations: usize,
    /// Whether a stopping criterion other than the iteration cap was met.
    pub converged: bool,
    /// Number of times an empty cluster was reseeded.
    pub reseeds: usize,
}

impl Kmeans {
    /// K-means with `k` clusters.
    ///
    /// Defaults: `max_iter = 10`, `tol = 1e-4`, `seed = 42`, random initialization.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 10,
            tol: 1e-4,
            seed: 42,
            init: Init::Random,
        }
    }

    /// Set the number of clusters.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the centroid-shift tolerance (Euclidean).
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the initialization seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the initialization policy.
    pub fn with_init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Initialization seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1",
            });
        }
        if !(self.tol >= 0.0 && self.tol.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "tol",
                message: "must be finite and non-negative",
            });
        }
        Ok(())
    }

    /// Fit on the calling thread.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KmeansFit> {
        self.fit_with(&Sequential, data, &CancelToken::new())
    }

    /// Fit using `exec`, checking `cancel` before every iteration.
    pub fn fit_with<E: Executor>(
        &self,
        exec: &E,
        data: &[Vec<f64>],
        cancel: &CancelToken,
    ) -> Result<KmeansFit> {
        self.validate()?;
        let dim = util::check_points(data)?;
        let n = data.len();
        if self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        let distinct = util::count_distinct(data);
        if self.k > distinct {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: distinct,
            });
        }

        cancel.check()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = match self.init {
            Init::Random => random_init(data, self.k, &mut rng),
            Init::KmeansPlusPlus => plus_plus_init(data, self.k, &mut rng),
        };

        let (mut labels, mut inertia) = assign(exec, data, &centroids);
        let mut inertia_history = vec![inertia];
        let mut iterations = 0usize;
        let mut converged = false;
        let mut reseeds = 0usize;

        while iterations < self.max_iter {
            cancel.check()?;
            iterations += 1;

            let (sums, counts) = cluster_sums(exec, data, &labels, self.k, dim);
            let mut next = centroids.clone();
            let mut empty = Vec::new();
            for c in 0..self.k {
                if counts[c] == 0 {
                    empty.push(c);
                } else {
                    let inv = 1.0 / counts[c] as f64;
                    next[c] = sums[c].iter().map(|s| s * inv).collect();
                }
            }
            if !empty.is_empty() {
                reseeds += reseed(data, &labels, &mut next, &empty);
            }

            let shift = centroids
                .iter()
                .zip(&next)
                .map(|(a, b)| util::squared_euclidean(a, b).sqrt())
                .fold(0.0, f64::max);

            let (next_labels, next_inertia) = assign(exec, data, &next);
            let changed = next_labels != labels;
            centroids = next;
            labels = next_labels;
            inertia = next_inertia;
            inertia_history.push(inertia);

            tracing::debug!(
                k = self.k,
                iteration = iterations,
                inertia,
                shift,
                changed,
                "kmeans iteration"
            );

            if !changed || shift <= self.tol {
                converged = true;
                break;
            }
        }

        // A cluster can still be empty if the last assignment emptied it.
        for _ in 0..self.k {
            let counts = label_counts(&labels, self.k);
            let empty: Vec<usize> = (0..self.k).filter(|&c| counts[c] == 0).collect();
            if empty.is_empty() {
                break;
            }
            let moved = reseed(data, &labels, &mut centroids, &empty);
            if moved == 0 {
                break;
            }
            reseeds += moved;
            let (l, i) = assign(exec, data, &centroids);
            labels = l;
            inertia = i;
            inertia_history.push(inertia);
        }

        if !converged {
            tracing::debug!(
                k = self.k,
                max_iter = self.max_iter,
                "kmeans reached the iteration cap"
            );
        }

        Ok(KmeansFit {
            model: ClusterModel::new(centroids)?,
            labels,
            inertia,
            inertia_history,
            iterations,
            converged,
            reseeds,
        })
    }
}

impl Default for Kmeans {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Clustering for Kmeans {
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

fn random_init(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    sample(rng, data.len(), k)
        .into_iter()
        .map(|i| data[i].clone())
        .collect()
}

fn plus_plus_init(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.random_range(0..n)].clone());

    let mut d2: Vec<f64> = data
        .iter()
        .map(|x| util::squared_euclidean(x, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let idx = if total > 0.0 {
            let mut pick = rng.random::<f64>() * total;
            let mut idx = n - 1;
            for (i, &w) in d2.iter().enumerate() {
                if pick < w {
                    idx = i;
                    break;
                }
                pick -= w;
            }
            idx
        } else {
            rng.random_range(0..n)
        };
        let chosen = data[idx].clone();
        for (slot, x) in d2.iter_mut().zip(data) {
            let d = util::squared_euclidean(x, &chosen);
            if d < *slot {
                *slot = d;
            }
        }
        centroids.push(chosen);
    }
    centroids
}

/// Nearest-centroid labels and the resulting inertia.
fn assign<E: Executor>(exec: &E, data: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let nearest = exec.map(data, |x| util::nearest(x, centroids));
    let inertia = nearest.iter().map(|&(_, d)| d).sum();
    (nearest.into_iter().map(|(c, _)| c).collect(), inertia)
}

fn cluster_sums<E: Executor>(
    exec: &E,
    data: &[Vec<f64>],
    labels: &[usize],
    k: usize,
    dim: usize,
) -> (Vec<Vec<f64>>, Vec<usize>) {
    let rows: Vec<(&Vec<f64>, usize)> = data.iter().zip(labels.iter().copied()).collect();
    exec.reduce(
        &rows,
        || (vec![vec![0.0; dim]; k], vec![0usize; k]),
        |(mut sums, mut counts), &(x, c)| {
            for (s, v) in sums[c].iter_mut().zip(x) {
                *s += v;
            }
            counts[c] += 1;
            (sums, counts)
        },
        |(mut sa, mut ca), (sb, cb)| {
            for c in 0..k {
                ca[c] += cb[c];
                for (a, b) in sa[c].iter_mut().zip(&sb[c]) {
                    *a += b;
                }
            }
            (sa, ca)
        },
    )
}

fn label_counts(labels: &[usize], k: usize) -> Vec<usize> {
    let mut counts = vec![0usize; k];
    for &l in labels {
        counts[l] += 1;
    }
    counts
}

/// Move each empty cluster's centroid onto the point farthest from its own
/// centroid, skipping points already used. Returns how many were moved.
fn reseed(
    data: &[Vec<f64>],
    labels: &[usize],
    centroids: &mut [Vec<f64>],
    empty: &[usize],
) -> usize {
    let mut candidates: Vec<(usize, f64)> = data
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (x, &c))| (i, util::squared_euclidean(x, &centroids[c])))
        .filter(|&(_, d)| d > 0.0)
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut used: Vec<usize> = Vec::with_capacity(empty.len());
    let mut moved = 0;
    let mut next = candidates.into_iter();
    for &c in empty {
        let pick = next.find(|&(i, _)| used.iter().all(|&u| data[u] != data[i]));
        match pick {
            Some((i, _)) => {
                centroids[c] = data[i].clone();
                used.push(i);
                moved += 1;
            }
            None => break,
        }
    }
    moved
}

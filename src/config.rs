//! Pipeline configuration.
//!
//! Every knob of the pipeline lives in [`PipelineConfig`]. All sections
//! deserialize with defaults, so a JSON document only needs the fields it
//! changes:
//!
//! ```rust
//! use stray::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{
//!     "vectorizer": { "vocab_size": 500 },
//!     "sampler": { "bernoulli": { "fraction": 0.001, "seed": 42 } },
//!     "clustering": { "chosen_k": 4 }
//! }"#).unwrap();
//!
//! assert_eq!(config.vectorizer.vocab_size, 500);
//! assert_eq!(config.minhash.num_hashes, 20);
//! assert_eq!(config.clustering.chosen_k, 4);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::cluster::{BisectingKmeans, Init, Kmeans, ModelOrderSweep, SilhouetteDistance};
use crate::error::{Error, Result};
use crate::minhash::MinHashConfig;
use crate::sample::Sampler;
use crate::scale::ScalerConfig;
use crate::score::{Bandwidth, Grid, Kernel, KernelDensity};
use crate::text::VectorizerConfig;

/// Which algorithm fits the final model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    /// Flat Lloyd k-means.
    #[default]
    Kmeans,
    /// Bisecting k-means; each split is a 2-means run with the same
    /// `max_iter`, `tol`, `init` and `seed`.
    Bisecting,
}

/// Clustering and model-order sweep parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Candidate cluster counts for the sweep.
    pub k_range: RangeInclusive<usize>,
    /// Cluster count of the final model.
    pub chosen_k: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
    pub init: Init,
    pub silhouette_distance: SilhouetteDistance,
    pub engine: Engine,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k_range: 2..=9,
            chosen_k: 5,
            max_iter: 10,
            tol: 1e-4,
            seed: 42,
            init: Init::Random,
            silhouette_distance: SilhouetteDistance::SquaredEuclidean,
            engine: Engine::Kmeans,
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<()> {
        let (start, end) = (*self.k_range.start(), *self.k_range.end());
        if start == 0 || start > end {
            return Err(Error::InvalidRange {
                name: "k_range",
                start,
                end,
            });
        }
        if self.chosen_k == 0 {
            return Err(Error::InvalidParameter {
                name: "chosen_k",
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

    /// K-means with these settings and `k` clusters.
    pub fn kmeans(&self, k: usize) -> Kmeans {
        Kmeans::new(k)
            .with_max_iter(self.max_iter)
            .with_tol(self.tol)
            .with_seed(self.seed)
            .with_init(self.init)
    }

    /// Bisecting k-means with `k` clusters; every 2-means split uses these settings.
    pub fn bisecting(&self, k: usize) -> BisectingKmeans {
        BisectingKmeans::new(k)
            .with_max_iter(self.max_iter)
            .with_tol(self.tol)
            .with_init(self.init)
            .with_seed(self.seed)
    }

    pub fn sweep(&self) -> Result<ModelOrderSweep> {
        Ok(ModelOrderSweep::new(self.k_range.clone())?
            .with_kmeans(self.kmeans(*self.k_range.start()))
            .with_distance(self.silhouette_distance))
    }
}

/// Density estimate parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    pub kernel: Kernel,
    pub bandwidth: Bandwidth,
    pub grid: Grid,
}

impl DensityConfig {
    pub fn validate(&self) -> Result<()> {
        self.bandwidth.validate()?;
        self.grid.validate()
    }

    pub fn estimator(&self) -> KernelDensity {
        KernelDensity::new(self.kernel, self.bandwidth)
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vectorizer: VectorizerConfig,
    pub minhash: MinHashConfig,
    pub scaler: ScalerConfig,
    pub sampler: Sampler,
    pub clustering: ClusteringConfig,
    pub density: DensityConfig,
}

impl PipelineConfig {
    /// Check every section. Called by `Pipeline::new` before any work.
    pub fn validate(&self) -> Result<()> {
        self.vectorizer.validate()?;
        self.minhash.validate()?;
        self.sampler.validate()?;
        self.clustering.validate()?;
        self.density.validate()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

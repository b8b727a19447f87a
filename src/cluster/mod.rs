//! Centroid clustering over scaled feature vectors.
//!
//! ## Engines
//!
//! ### K-means
//!
//! Assign each point to the nearest centroid, then move every centroid to the
//! mean of its points. Repeat.
//!
//! **Objective**: minimize the within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! **Assumptions**:
//! - Clusters are roughly spherical
//! - Clusters have similar sizes
//! - You pick k (see [`ModelOrderSweep`])
//!
//! ### Bisecting k-means
//!
//! Top-down: repeatedly split the cluster with the largest sum of squares with
//! 2-means until there are `k` clusters.
//!
//! ## Choosing k
//!
//! [`ModelOrderSweep`] fits one model per candidate `k` on the fitting set and
//! reports the mean [silhouette](silhouette_score) of each. Picking the final
//! `k` is left to the caller.
//!
//! ## Usage
//!
//! ```rust
//! use stray::cluster::{BisectingKmeans, Clustering, Kmeans};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! let labels = Kmeans::new(2).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! let model = BisectingKmeans::new(2).fit_model(&data).unwrap();
//! assert_eq!(model.k(), 2);
//! ```

mod bisecting;
mod kmeans;
mod model;
mod silhouette;
mod sweep;
mod traits;
pub(crate) mod util;

pub use bisecting::{BisectingFit, BisectingKmeans};
pub use kmeans::{Init, Kmeans, KmeansFit};
pub use model::ClusterModel;
pub use silhouette::{silhouette_score, SilhouetteDistance};
pub use sweep::{ModelOrderSweep, SweepEntry, SweepFailure, SweepReport};
pub use traits::Clustering;

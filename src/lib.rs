//! Document anomaly detection by distance to cluster centers.
//!
//! `stray` turns a corpus of text documents into compact numeric signatures,
//! clusters them, and ranks every document by how far it sits from its
//! cluster center:
//!
//! 1. [`text`]: tokenize, drop stop words, count terms over a frozen vocabulary.
//!    Documents with no in-vocabulary term are set aside as degenerate.
//! 2. [`minhash`]: `H`-dimensional MinHash signature of each count vector's support.
//! 3. [`sample`]: optional seeded sampling of the fitting set.
//! 4. [`scale`]: per-dimension standardization fitted on the fitting set.
//! 5. [`cluster`]: k-means (or bisecting k-means) plus a silhouette sweep over `k`.
//! 6. [`score`]: distance ranking of every document and a density estimate over
//!    the distances.
//!
//! [`pipeline::Pipeline`] chains the stages; each is also usable on its own.
//! Choosing `k` and choosing an anomaly threshold are left to the caller: the
//! crate publishes the silhouette table and the density curve to inform both.
//!
//! Per-document stages run through an [`exec::Executor`]; [`exec::Parallel`]
//! uses rayon and gives the same results as [`exec::Sequential`].
//!
//! ```rust
//! use stray::exec::Sequential;
//! use stray::pipeline::{Pipeline, RawDocument};
//! use stray::config::PipelineConfig;
//!
//! let mut config = PipelineConfig::default();
//! config.minhash.num_hashes = 8;
//! config.clustering.k_range = 2..=3;
//! config.clustering.chosen_k = 2;
//!
//! let docs: Vec<RawDocument> = (0..12)
//!     .map(|i| {
//!         let body = if i % 2 == 0 { "meeting agenda notes" } else { "invoice payment overdue" };
//!         RawDocument::new(format!("m{i}"), body)
//!     })
//!     .chain([RawDocument::new("blank", "")])
//!     .collect();
//!
//! let out = Pipeline::new(config).unwrap().run(&Sequential, &docs).unwrap();
//! assert_eq!(out.report.len(), 13);
//! assert_eq!(out.report.records()[0].id, "blank");
//! assert!(out.report.records()[0].cluster.is_none());
//! ```

#![forbid(unsafe_code)]

pub mod cluster;
pub mod config;
pub mod error;
pub mod exec;
pub mod minhash;
pub mod pipeline;
pub mod sample;
pub mod scale;
pub mod score;
pub mod text;

pub use cluster::{
    silhouette_score, BisectingKmeans, ClusterModel, Clustering, Init, Kmeans, KmeansFit,
    ModelOrderSweep, SilhouetteDistance, SweepReport,
};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use exec::{CancelToken, Executor, Parallel, Sequential};
pub use minhash::{MinHashConfig, MinHasher, Signature};
pub use pipeline::{Pipeline, PipelineOutput, Prepared, RawDocument};
pub use score::{
    AnomalyRecord, AnomalyReport, AnomalyScorer, Assignment, DensityCurve, KernelDensity,
};

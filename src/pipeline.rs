//! End-to-end anomaly pipeline.
//!
//! ```text
//! raw documents ─► tokenize / stop words ─► vocabulary fit ─► count vectors
//!        │                                                        │
//!        └─ missing id/text: skipped                all-zero ─────┤─► degenerate bucket
//!                                                                 ▼
//!                                                          MinHash signatures
//!                                                                 │
//!                                        sampler ─► fitting set ─►┤ scaler fit
//!                                                                 ▼
//!                                                         scaled features
//!                                                                 │
//!                    sweep (fitting set) ─► {k → silhouette}      │
//!                    fit(k) (fitting set) ─► ClusterModel ──────► score (all documents)
//!                                                                 │
//!                                                    AnomalyReport + density curve
//! ```
//!
//! The stages are exposed separately so a caller can look at the sweep table
//! before choosing `k`. [`Pipeline::run`] chains them with the configured
//! `chosen_k`.

use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterModel, SweepReport};
use crate::config::{Engine, PipelineConfig};
use crate::error::{Error, Result};
use crate::exec::{CancelToken, Executor};
use crate::minhash::MinHasher;
use crate::scale::{ScalerModel, StandardScaler};
use crate::score::{AnomalyReport, AnomalyScorer, DensityCurve};
use crate::text::{split_degenerate, CountVectorizer, Vocabulary};

/// A document as delivered by the corpus reader. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: Option<String>,
    pub text: Option<String>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: Some(text.into()),
        }
    }
}

/// State shared by the sweep, the final fit and scoring.
#[derive(Debug)]
pub struct Prepared {
    pub vocabulary: Vocabulary,
    pub scaler: ScalerModel,
    /// Scaled feature of every hashed document, in input order.
    pub features: Vec<(String, Vec<f64>)>,
    /// Scaled features of the sampled fitting set.
    pub fitting_set: Vec<Vec<f64>>,
    /// Ids of documents with an all-zero count vector.
    pub degenerate: Vec<String>,
    /// Documents dropped for missing fields.
    pub skipped: Vec<Error>,
}

/// Everything [`Pipeline::run`] produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub sweep: SweepReport,
    pub model: ClusterModel,
    pub report: AnomalyReport,
    /// `None` when no document received a finite distance.
    pub density: Option<DensityCurve>,
    pub skipped: Vec<Error>,
}

/// Configured pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    vectorizer: CountVectorizer,
    hasher: MinHasher,
    cancel: CancelToken,
}

impl Pipeline {
    /// Validate `config` and build the stage components.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let vectorizer = CountVectorizer::new(config.vectorizer.clone())?;
        let hasher = MinHasher::new(&config.minhash)?;
        Ok(Self {
            config,
            vectorizer,
            hasher,
            cancel: CancelToken::new(),
        })
    }

    /// Replace the hash family built from the configuration.
    pub fn with_hasher(mut self, hasher: MinHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Observe `cancel` between stages and inside clustering.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn hasher(&self) -> &MinHasher {
        &self.hasher
    }

    /// Vectorize, hash, sample and scale `docs`.
    pub fn prepare<E: Executor>(&self, exec: &E, docs: &[RawDocument]) -> Result<Prepared> {
        let (docs, skipped) = validate_documents(docs);
        if docs.is_empty() {
            return Err(Error::EmptyInput);
        }
        tracing::info!(documents = docs.len(), skipped = skipped.len(), "ingested");

        self.cancel.check()?;
        let tokens = exec.map(&docs, |(_, text)| self.vectorizer.analyze(text));
        let vocabulary = self.vectorizer.fit(exec, &tokens);
        let rows = docs
            .iter()
            .map(|(id, _)| id.clone())
            .zip(exec.map(&tokens, |t| vocabulary.transform(t)))
            .collect();
        let split = split_degenerate(rows);
        tracing::info!(
            terms = vocabulary.len(),
            normal = split.normal.len(),
            degenerate = split.degenerate.len(),
            "vectorized"
        );

        self.cancel.check()?;
        let hashed = exec.map(&split.normal, |(id, cv)| {
            (id.clone(), self.hasher.signature(cv).map(|s| s.to_f64()))
        });
        let mut degenerate = split.degenerate;
        let mut raw = Vec::with_capacity(hashed.len());
        for (id, sig) in hashed {
            match sig {
                Some(v) => raw.push((id, v)),
                None => degenerate.push(id),
            }
        }
        if raw.is_empty() {
            return Err(Error::EmptyInput);
        }

        self.cancel.check()?;
        let vectors: Vec<Vec<f64>> = raw.iter().map(|(_, v)| v.clone()).collect();
        let sample = self.config.sampler.select(exec, &vectors)?;
        let scaler = StandardScaler::new(self.config.scaler).fit(exec, &sample)?;
        let features = exec
            .map(&raw, |(id, v)| scaler.transform(v).map(|s| (id.clone(), s)))
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        let fitting_set = exec
            .map(&sample, |v| scaler.transform(v))
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(
            hashed = features.len(),
            fitting_set = fitting_set.len(),
            "scaled"
        );

        Ok(Prepared {
            vocabulary,
            scaler,
            features,
            fitting_set,
            degenerate,
            skipped,
        })
    }

    /// Silhouette of every configured `k` on the fitting set.
    pub fn sweep<E: Executor>(&self, exec: &E, prepared: &Prepared) -> Result<SweepReport> {
        let report = self
            .config
            .clustering
            .sweep()?
            .run(exec, &prepared.fitting_set, &self.cancel)?;
        tracing::info!(
            trials = report.entries.len(),
            failures = report.failures.len(),
            "model-order sweep"
        );
        Ok(report)
    }

    /// Fit the final model with `k` clusters on the fitting set.
    pub fn fit<E: Executor>(
        &self,
        exec: &E,
        prepared: &Prepared,
        k: usize,
    ) -> Result<ClusterModel> {
        let clustering = &self.config.clustering;
        let model = match clustering.engine {
            Engine::Kmeans => {
                let fit = clustering
                    .kmeans(k)
                    .fit_with(exec, &prepared.fitting_set, &self.cancel)?;
                if !fit.converged {
                    tracing::warn!(k, iterations = fit.iterations, "k-means did not converge");
                }
                fit.model
            }
            Engine::Bisecting => {
                clustering
                    .bisecting(k)
                    .fit_with(exec, &prepared.fitting_set, &self.cancel)?
                    .model
            }
        };
        tracing::info!(k, engine = ?clustering.engine, "fitted model");
        Ok(model)
    }

    /// Rank every document (not just the fitting set) against `model`.
    pub fn score<E: Executor>(
        &self,
        exec: &E,
        prepared: &Prepared,
        model: &ClusterModel,
    ) -> Result<AnomalyReport> {
        self.cancel.check()?;
        AnomalyScorer::new(model).score(exec, &prepared.features, &prepared.degenerate)
    }

    /// Density of the finite distances in `report` over the configured grid.
    pub fn density<E: Executor>(&self, exec: &E, report: &AnomalyReport) -> Result<DensityCurve> {
        let density = &self.config.density;
        density
            .estimator()
            .estimate(exec, &report.distances(), &density.grid)
    }

    /// Prepare, sweep, fit `chosen_k`, score and estimate density.
    pub fn run<E: Executor>(&self, exec: &E, docs: &[RawDocument]) -> Result<PipelineOutput> {
        let prepared = self.prepare(exec, docs)?;
        let sweep = self.sweep(exec, &prepared)?;
        let model = self.fit(exec, &prepared, self.config.clustering.chosen_k)?;
        let report = self.score(exec, &prepared, &model)?;
        let density = if report.distances().is_empty() {
            None
        } else {
            Some(self.density(exec, &report)?)
        };
        Ok(PipelineOutput {
            sweep,
            model,
            report,
            density,
            skipped: prepared.skipped,
        })
    }
}

/// Split raw documents into `(id, text)` pairs and per-document errors.
fn validate_documents(docs: &[RawDocument]) -> (Vec<(String, String)>, Vec<Error>) {
    let mut ok = Vec::with_capacity(docs.len());
    let mut skipped = Vec::new();
    for (position, doc) in docs.iter().enumerate() {
        match (&doc.id, &doc.text) {
            (Some(id), Some(text)) => ok.push((id.clone(), text.clone())),
            (None, _) => skipped.push(Error::MissingField { position, field: "id" }),
            (Some(_), None) => skipped.push(Error::MissingField { position, field: "text" }),
        }
    }
    for e in &skipped {
        tracing::warn!(error = %e, "skipping document");
    }
    (ok, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Parallel, Sequential};
    use crate::text::MinDf;

    fn corpus() -> Vec<RawDocument> {
        let topics = [
            "quarterly budget forecast revenue spreadsheet review",
            "team lunch friday pizza office celebration",
            "server outage database restart incident ticket",
        ];
        let mut docs = Vec::new();
        for i in 0..30 {
            let base = topics[i % 3];
            let extra = ["today", "tomorrow", "soon", "please"][i % 4];
            docs.push(RawDocument::new(format!("msg{i:02}"), format!("{base} {extra}")));
        }
        docs.push(RawDocument::new("odd", "zzzz qqqq xxxx"));
        docs
    }

    fn small_config() -> PipelineConfig {
        let mut c = PipelineConfig::default();
        c.vectorizer.min_df = MinDf::Count(2);
        c.minhash.num_hashes = 8;
        c.clustering.k_range = 2..=4;
        c.clustering.chosen_k = 3;
        c
    }

    #[test]
    fn missing_fields_are_skipped_not_fatal() {
        let mut docs = corpus();
        docs.push(RawDocument {
            id: None,
            text: Some("no id".into()),
        });
        docs.push(RawDocument {
            id: Some("no-text".into()),
            text: None,
        });
        let prepared = Pipeline::new(small_config())
            .unwrap()
            .prepare(&Sequential, &docs)
            .unwrap();
        assert_eq!(prepared.skipped.len(), 2);
        assert!(matches!(
            prepared.skipped[0],
            Error::MissingField { position: 31, field: "id" }
        ));
        assert!(matches!(
            prepared.skipped[1],
            Error::MissingField { position: 32, field: "text" }
        ));
    }

    #[test]
    fn unmatched_document_is_degenerate() {
        let prepared = Pipeline::new(small_config())
            .unwrap()
            .prepare(&Sequential, &corpus())
            .unwrap();
        assert_eq!(prepared.degenerate, vec!["odd".to_string()]);
        assert_eq!(prepared.features.len(), 30);
        assert!(prepared.features.iter().all(|(_, f)| f.len() == 8));
    }

    #[test]
    fn run_produces_full_report() {
        let out = Pipeline::new(small_config()).unwrap().run(&Sequential, &corpus()).unwrap();
        assert_eq!(out.report.len(), 31);
        assert_eq!(out.report.records()[0].id, "odd");
        assert!(out.report.records()[0].cluster.is_none());
        assert_eq!(out.model.k(), 3);
        assert!(out.density.is_some());
        assert!(out
            .report
            .records()
            .windows(2)
            .all(|w| w[0].distance >= w[1].distance));
    }

    #[test]
    fn executors_give_identical_reports() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let a = pipeline.run(&Sequential, &corpus()).unwrap();
        let b = pipeline.run(&Parallel, &corpus()).unwrap();
        assert_eq!(a.report, b.report);
        assert_eq!(a.sweep, b.sweep);
    }

    #[test]
    fn cancellation_is_observed() {
        let token = CancelToken::new();
        token.cancel();
        let err = Pipeline::new(small_config())
            .unwrap()
            .with_cancel_token(token)
            .run(&Sequential, &corpus())
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        assert!(matches!(pipeline.prepare(&Sequential, &[]), Err(Error::EmptyInput)));
    }
}

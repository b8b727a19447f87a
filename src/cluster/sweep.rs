//! Model-order sweep: fit k-means for a range of `k` and tabulate silhouettes.
//!
//! The sweep publishes the `{k → silhouette}` table and nothing else; choosing
//! the final `k` is left to the caller. [`SweepReport::best_by_silhouette`] is
//! available for callers who explicitly want the argmax.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use super::kmeans::Kmeans;
use super::silhouette::{silhouette_score, SilhouetteDistance};
use crate::error::{Error, Result};
use crate::exec::{CancelToken, Executor};

/// One successful trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub k: usize,
    pub silhouette: f64,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// A trial excluded from the table, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub k: usize,
    pub reason: String,
}

/// Output of [`ModelOrderSweep::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Successful trials, ascending by `k`.
    pub entries: Vec<SweepEntry>,
    /// Skipped or failed trials, ascending by `k`.
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    /// `(k, silhouette)` pairs, ascending by `k`.
    pub fn table(&self) -> Vec<(usize, f64)> {
        self.entries.iter().map(|e| (e.k, e.silhouette)).collect()
    }

    pub fn get(&self, k: usize) -> Option<&SweepEntry> {
        self.entries.iter().find(|e| e.k == k)
    }

    /// Entry with the highest silhouette (smallest `k` on ties).
    ///
    /// Opt-in only: nothing in the crate selects `k` automatically.
    pub fn best_by_silhouette(&self) -> Option<&SweepEntry> {
        self.entries.iter().fold(None, |best: Option<&SweepEntry>, e| match best {
            Some(b) if b.silhouette >= e.silhouette => Some(b),
            _ => Some(e),
        })
    }
}

/// Fits one k-means model per `k` and scores each with the silhouette.
#[derive(Debug, Clone)]
pub struct ModelOrderSweep {
    ks: RangeInclusive<usize>,
    kmeans: Kmeans,
    distance: SilhouetteDistance,
}

impl ModelOrderSweep {
    /// Sweep `ks` with default k-means settings.
    pub fn new(ks: RangeInclusive<usize>) -> Result<Self> {
        if *ks.start() == 0 || ks.start() > ks.end() {
            return Err(Error::InvalidRange {
                name: "k_range",
                start: *ks.start(),
                end: *ks.end(),
            });
        }
        Ok(Self {
            ks,
            kmeans: Kmeans::default(),
            distance: SilhouetteDistance::default(),
        })
    }

    /// Use `kmeans` for every trial; its own `k` is overridden.
    pub fn with_kmeans(mut self, kmeans: Kmeans) -> Self {
        self.kmeans = kmeans;
        self
    }

    pub fn with_distance(mut self, distance: SilhouetteDistance) -> Self {
        self.distance = distance;
        self
    }

    /// Run every trial on `data` (the fitting set).
    ///
    /// A trial that fails is recorded in [`SweepReport::failures`] and the
    /// sweep continues. Cancellation aborts the whole sweep.
    pub fn run<E: Executor>(
        &self,
        exec: &E,
        data: &[Vec<f64>],
        cancel: &CancelToken,
    ) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        for k in self.ks.clone() {
            cancel.check()?;
            if k < 2 {
                report.failures.push(SweepFailure {
                    k,
                    reason: "silhouette is undefined for k < 2".to_string(),
                });
                continue;
            }

            let fit = match self.kmeans.clone().with_k(k).fit_with(exec, data, cancel) {
                Ok(fit) => fit,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::warn!(k, error = %e, "sweep trial failed");
                    report.failures.push(SweepFailure {
                        k,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match silhouette_score(exec, data, &fit.labels, self.distance)? {
                Some(silhouette) => {
                    tracing::info!(
                        k,
                        silhouette,
                        inertia = fit.inertia,
                        converged = fit.converged,
                        "sweep trial"
                    );
                    report.entries.push(SweepEntry {
                        k,
                        silhouette,
                        inertia: fit.inertia,
                        iterations: fit.iterations,
                        converged: fit.converged,
                    });
                }
                None => report.failures.push(SweepFailure {
                    k,
                    reason: "fewer than two populated clusters".to_string(),
                }),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Init;
    use crate::exec::Sequential;

    fn three_blobs() -> Vec<Vec<f64>> {
        let mut data = Vec::new();
        for c in [0.0, 20.0, 40.0] {
            for i in 0..8 {
                data.push(vec![c + i as f64 * 0.1, (i % 3) as f64 * 0.1]);
            }
        }
        data
    }

    #[test]
    fn table_covers_range_and_stays_in_bounds() {
        let sweep = ModelOrderSweep::new(2..=6).unwrap();
        let report = sweep.run(&Sequential, &three_blobs(), &CancelToken::new()).unwrap();
        let ks: Vec<usize> = report.entries.iter().map(|e| e.k).collect();
        assert_eq!(ks, vec![2, 3, 4, 5, 6]);
        for e in &report.entries {
            assert!((-1.0..=1.0).contains(&e.silhouette), "{e:?}");
        }
    }

    #[test]
    fn argmax_is_opt_in_and_finds_true_k() {
        let sweep = ModelOrderSweep::new(2..=5)
            .unwrap()
            .with_kmeans(Kmeans::new(2).with_init(Init::KmeansPlusPlus).with_max_iter(50));
        let report = sweep.run(&Sequential, &three_blobs(), &CancelToken::new()).unwrap();
        assert_eq!(report.best_by_silhouette().map(|e| e.k), Some(3));
    }

    #[test]
    fn impossible_trials_are_excluded_not_fatal() {
        let data = vec![vec![0.0], vec![1.0], vec![5.0]];
        let report = ModelOrderSweep::new(1..=4)
            .unwrap()
            .run(&Sequential, &data, &CancelToken::new())
            .unwrap();
        assert_eq!(report.table().iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![2, 3]);
        let failed: Vec<usize> = report.failures.iter().map(|f| f.k).collect();
        assert_eq!(failed, vec![1, 4]);
    }

    #[test]
    fn cancellation_aborts_sweep() {
        let token = CancelToken::new();
        token.cancel();
        let err = ModelOrderSweep::new(2..=3)
            .unwrap()
            .run(&Sequential, &three_blobs(), &token)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn invalid_range() {
        assert!(ModelOrderSweep::new(0..=3).is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let r = 5..=2;
        assert!(ModelOrderSweep::new(r).is_err());
    }
}

//! Per-dimension standardization of signatures.
//!
//! Statistics are accumulated with a mergeable mean/M2 summary (Chan et al.),
//! so partial summaries from any partitioning combine into the same result
//! as a single pass. MinHash values sit near `1e9`, where a naive
//! sum-of-squares loses most of its precision.
//!
//! The standard deviation is the corrected sample estimate (`n - 1`).

use serde::{Deserialize, Serialize};

use crate::cluster::util;
use crate::error::{Error, Result};
use crate::exec::Executor;

/// What to do with a dimension whose standard deviation is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVariance {
    /// Leave the value unscaled (divide by 1).
    #[default]
    PassThrough,
    /// Emit 0 for that dimension.
    Zero,
}

/// Scaler parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    /// Subtract the mean before dividing.
    pub with_mean: bool,
    /// What to do with dimensions whose standard deviation is zero.
    pub zero_variance: ZeroVariance,
}

/// Running count/mean/M2 per dimension.
#[derive(Debug, Clone, Default)]
struct Moments {
    n: u64,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl Moments {
    fn push(mut self, x: &[f64]) -> Self {
        if self.n == 0 {
            self.mean = vec![0.0; x.len()];
            self.m2 = vec![0.0; x.len()];
        }
        self.n += 1;
        let n = self.n as f64;
        for ((m, m2), &v) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(x) {
            let delta = v - *m;
            *m += delta / n;
            *m2 += delta * (v - *m);
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        if self.n == 0 {
            return other;
        }
        if other.n == 0 {
            return self;
        }
        let (na, nb) = (self.n as f64, other.n as f64);
        let n = na + nb;
        let mut out = Moments {
            n: self.n + other.n,
            mean: Vec::with_capacity(self.mean.len()),
            m2: Vec::with_capacity(self.m2.len()),
        };
        for j in 0..self.mean.len() {
            let delta = other.mean[j] - self.mean[j];
            out.mean.push(self.mean[j] + delta * nb / n);
            out.m2.push(self.m2[j] + other.m2[j] + delta * delta * na * nb / n);
        }
        out
    }
}

/// Fits a [`ScalerModel`].
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    config: ScalerConfig,
}

impl StandardScaler {
    pub fn new(config: ScalerConfig) -> Self {
        Self { config }
    }

    /// Compute per-dimension statistics over the fitting set.
    pub fn fit<E: Executor>(&self, exec: &E, data: &[Vec<f64>]) -> Result<ScalerModel> {
        let d = util::check_points(data)?;
        let moments = exec.reduce(data, Moments::default, |acc, x| acc.push(x), Moments::merge);

        let std = if moments.n > 1 {
            let denom = (moments.n - 1) as f64;
            moments.m2.iter().map(|&m2| (m2.max(0.0) / denom).sqrt()).collect()
        } else {
            vec![0.0; d]
        };
        let zero_dims = std.iter().filter(|s| **s == 0.0).count();
        if zero_dims > 0 {
            tracing::debug!(
                zero_dims,
                policy = ?self.config.zero_variance,
                "zero-variance dimensions"
            );
        }

        Ok(ScalerModel {
            mean: moments.mean,
            std,
            config: self.config,
        })
    }
}

/// Fitted scaling statistics. Immutable after [`StandardScaler::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerModel {
    mean: Vec<f64>,
    std: Vec<f64>,
    config: ScalerConfig,
}

impl ScalerModel {
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn dim(&self) -> usize {
        self.std.len()
    }

    /// `x / std` (or `(x - mean) / std` when centering); zero-variance
    /// dimensions follow the configured [`ZeroVariance`] policy.
    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>> {
        self.check(x)?;
        Ok(x.iter()
            .enumerate()
            .map(|(j, &v)| {
                let centered = if self.config.with_mean { v - self.mean[j] } else { v };
                match (self.std[j] == 0.0, self.config.zero_variance) {
                    (false, _) => centered / self.std[j],
                    (true, ZeroVariance::PassThrough) => centered,
                    (true, ZeroVariance::Zero) => 0.0,
                }
            })
            .collect())
    }

    /// Undo [`transform`](Self::transform). Zero-variance dimensions under the
    /// `Zero` policy cannot be recovered and come back as the mean (or 0).
    pub fn inverse_transform(&self, scaled: &[f64]) -> Result<Vec<f64>> {
        self.check(scaled)?;
        Ok(scaled
            .iter()
            .enumerate()
            .map(|(j, &s)| {
                let unscaled = if self.std[j] == 0.0 { s } else { s * self.std[j] };
                if self.config.with_mean {
                    unscaled + self.mean[j]
                } else {
                    unscaled
                }
            })
            .collect())
    }

    fn check(&self, x: &[f64]) -> Result<()> {
        if x.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: x.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Parallel, Sequential};

    fn data() -> Vec<Vec<f64>> {
        vec![
            vec![1.0e9, 5.0, 7.0],
            vec![1.2e9, 5.0, 9.0],
            vec![0.9e9, 5.0, 11.0],
            vec![1.1e9, 5.0, 13.0],
        ]
    }

    #[test]
    fn sample_std_with_n_minus_one() {
        let m = StandardScaler::default().fit(&Sequential, &data()).unwrap();
        // Third column: 7, 9, 11, 13 -> mean 10, sample var 20/3.
        assert!((m.mean()[2] - 10.0).abs() < 1e-12);
        assert!((m.std()[2] - (20.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(m.std()[1], 0.0);
    }

    #[test]
    fn no_centering_round_trip() {
        let m = StandardScaler::default().fit(&Sequential, &data()).unwrap();
        for row in data() {
            let scaled = m.transform(&row).unwrap();
            for j in 0..row.len() {
                let back = if m.std()[j] == 0.0 { scaled[j] } else { scaled[j] * m.std()[j] };
                assert!((back - row[j]).abs() <= 1e-6 * row[j].abs().max(1.0));
            }
            let inv = m.inverse_transform(&scaled).unwrap();
            for (a, b) in inv.iter().zip(&row) {
                assert!((a - b).abs() <= 1e-6 * b.abs().max(1.0));
            }
        }
    }

    #[test]
    fn zero_variance_pass_through_keeps_value() {
        let m = StandardScaler::default().fit(&Sequential, &data()).unwrap();
        assert_eq!(m.transform(&data()[0]).unwrap()[1], 5.0);
    }

    #[test]
    fn zero_variance_zero_policy() {
        let scaler = StandardScaler::new(ScalerConfig {
            with_mean: false,
            zero_variance: ZeroVariance::Zero,
        });
        let m = scaler.fit(&Sequential, &data()).unwrap();
        assert_eq!(m.transform(&data()[0]).unwrap()[1], 0.0);
    }

    #[test]
    fn centering_gives_zero_mean() {
        let scaler = StandardScaler::new(ScalerConfig {
            with_mean: true,
            ..Default::default()
        });
        let m = scaler.fit(&Sequential, &data()).unwrap();
        let scaled: Vec<Vec<f64>> = data().iter().map(|r| m.transform(r).unwrap()).collect();
        for j in 0..3 {
            let mean: f64 = scaled.iter().map(|r| r[j]).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-9, "dim {j} mean {mean}");
        }
    }

    #[test]
    fn parallel_reduction_matches_sequential() {
        let rows: Vec<Vec<f64>> = (0..5_000)
            .map(|i| vec![1.0e9 + (i * 7919 % 1000) as f64, (i % 17) as f64])
            .collect();
        let a = StandardScaler::default().fit(&Sequential, &rows).unwrap();
        let b = StandardScaler::default().fit(&Parallel, &rows).unwrap();
        for j in 0..2 {
            assert!((a.std()[j] - b.std()[j]).abs() <= 1e-9 * a.std()[j].max(1.0));
            assert!((a.mean()[j] - b.mean()[j]).abs() <= 1e-3);
        }
    }

    #[test]
    fn single_row_is_all_zero_variance() {
        let m = StandardScaler::default().fit(&Sequential, &[vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.std(), &[0.0, 0.0]);
        assert_eq!(m.transform(&[3.0, 4.0]).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(StandardScaler::default().fit(&Sequential, &[]).is_err());
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(StandardScaler::default().fit(&Sequential, &ragged).is_err());
        let m = StandardScaler::default().fit(&Sequential, &data()).unwrap();
        assert!(m.transform(&[1.0]).is_err());
    }
}

//! One-dimensional kernel density estimation over anomaly distances.
//!
//! ```text
//! f̂(x) = 1 / (n h) · Σ_i K((x - x_i) / h)
//! ```
//!
//! The curve is informational: it helps a person pick a distance threshold,
//! and nothing in this crate derives a threshold from it.
//!
//! Non-finite samples (the sentinel distance of degenerate documents) are
//! ignored.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::exec::Executor;

/// Smoothing kernel, normalized to integrate to 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// `exp(-u²/2) / √(2π)`.
    #[default]
    Gaussian,
    /// `3/4 (1 - u²)` on `|u| ≤ 1`.
    Epanechnikov,
    /// `1/2` on `|u| ≤ 1`.
    Tophat,
}

impl Kernel {
    #[inline]
    fn eval(self, u: f64) -> f64 {
        match self {
            Kernel::Gaussian => (-0.5 * u * u).exp() / (2.0 * std::f64::consts::PI).sqrt(),
            Kernel::Epanechnikov => {
                if u.abs() <= 1.0 {
                    0.75 * (1.0 - u * u)
                } else {
                    0.0
                }
            }
            Kernel::Tophat => {
                if u.abs() <= 1.0 {
                    0.5
                } else {
                    0.0
                }
            }
        }
    }
}

/// Bandwidth `h`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    /// Use this exact width.
    Fixed(f64),
    /// Scott's rule: `σ · n^(-1/5)`.
    Scott,
    /// Silverman's rule: `0.9 · min(σ, IQR / 1.34) · n^(-1/5)`.
    Silverman,
}

impl Default for Bandwidth {
    fn default() -> Self {
        Bandwidth::Fixed(1.0)
    }
}

impl Bandwidth {
    pub fn validate(&self) -> Result<()> {
        if let Bandwidth::Fixed(h) = *self {
            if !(h > 0.0 && h.is_finite()) {
                return Err(Error::InvalidParameter {
                    name: "bandwidth",
                    message: "must be finite and positive",
                });
            }
        }
        Ok(())
    }

    /// Resolve to a concrete `h` for `samples` (finite values only).
    pub fn resolve(&self, samples: &[f64]) -> Result<f64> {
        self.validate()?;
        let h = match *self {
            Bandwidth::Fixed(h) => return Ok(h),
            Bandwidth::Scott => sample_std(samples)? * n_factor(samples.len()),
            Bandwidth::Silverman => {
                let sigma = sample_std(samples)?;
                let iqr = interquartile_range(samples);
                let spread = if iqr > 0.0 { sigma.min(iqr / 1.34) } else { sigma };
                0.9 * spread * n_factor(samples.len())
            }
        };
        if h > 0.0 && h.is_finite() {
            Ok(h)
        } else {
            Err(Error::InvalidParameter {
                name: "bandwidth",
                message: "rule-of-thumb bandwidth is zero for constant samples",
            })
        }
    }
}

fn n_factor(n: usize) -> f64 {
    (n as f64).powf(-0.2)
}

fn sample_std(samples: &[f64]) -> Result<f64> {
    if samples.len() < 2 {
        return Err(Error::InvalidParameter {
            name: "bandwidth",
            message: "rule-of-thumb bandwidth needs at least two samples",
        });
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Ok(var.sqrt())
}

/// Linear-interpolated quartile spread.
fn interquartile_range(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q = |p: f64| {
        let pos = p * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    };
    q(0.75) - q(0.25)
}

/// Upper bound on [`Grid::len`] accepted by [`Grid::validate`].
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Evaluation points `start, start + step, …` strictly below `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grid {
    /// First evaluation point.
    pub start: f64,
    /// Exclusive upper end.
    pub stop: f64,
    /// Spacing between points.
    pub step: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: 20.0,
            step: 0.1,
        }
    }
}

impl Grid {
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self> {
        let grid = Self { start, stop, step };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "grid.step",
                message: "must be finite and positive",
            });
        }
        if !(self.start.is_finite() && self.stop.is_finite() && self.stop > self.start) {
            return Err(Error::InvalidParameter {
                name: "grid",
                message: "need finite start < stop",
            });
        }
        let count = self.raw_len();
        if !(count.is_finite() && count <= MAX_GRID_POINTS as f64) {
            return Err(Error::InvalidParameter {
                name: "grid",
                message: "too many points (at most 1,000,000)",
            });
        }
        Ok(())
    }

    // The epsilon absorbs rounding in (stop - start) / step, e.g. 20 / 0.1.
    fn raw_len(&self) -> f64 {
        ((self.stop - self.start) / self.step - 1e-9).ceil().max(0.0)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.raw_len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// One evaluated grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub x: f64,
    pub density: f64,
}

/// `{x → density}` over a [`Grid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCurve {
    /// Resolved bandwidth.
    pub bandwidth: f64,
    /// Number of finite samples used.
    pub n_samples: usize,
    pub points: Vec<DensityPoint>,
}

impl DensityCurve {
    /// Grid point with the highest density (first on ties).
    pub fn mode(&self) -> Option<DensityPoint> {
        self.points.iter().copied().fold(None, |best, p| match best {
            Some(b) if b.density >= p.density => Some(b),
            _ => Some(p),
        })
    }
}

/// Kernel density estimator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelDensity {
    pub kernel: Kernel,
    pub bandwidth: Bandwidth,
}

impl KernelDensity {
    pub fn new(kernel: Kernel, bandwidth: Bandwidth) -> Self {
        Self { kernel, bandwidth }
    }

    /// Evaluate the density of `samples` at every grid point.
    pub fn estimate<E: Executor>(
        &self,
        exec: &E,
        samples: &[f64],
        grid: &Grid,
    ) -> Result<DensityCurve> {
        grid.validate()?;
        let finite: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
        if finite.is_empty() {
            return Err(Error::EmptyInput);
        }
        let h = self.bandwidth.resolve(&finite)?;
        let norm = 1.0 / (finite.len() as f64 * h);
        let kernel = self.kernel;

        let xs = grid.points();
        let densities = exec.map(&xs, |&x| {
            norm * finite.iter().map(|&xi| kernel.eval((x - xi) / h)).sum::<f64>()
        });

        tracing::debug!(
            n_samples = finite.len(),
            bandwidth = h,
            grid_points = xs.len(),
            "density estimate"
        );

        Ok(DensityCurve {
            bandwidth: h,
            n_samples: finite.len(),
            points: xs
                .into_iter()
                .zip(densities)
                .map(|(x, density)| DensityPoint { x, density })
                .collect(),
        })
    }
}

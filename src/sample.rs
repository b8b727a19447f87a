//! Selection of the fitting set.
//!
//! Sampling only bounds the cost of scaler fitting and the clustering sweep;
//! every document is still scored against the resulting model.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::exec::Executor;

/// How the fitting set is drawn from the hashed documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampler {
    /// Use every document.
    #[default]
    All,
    /// Keep each document independently with probability `fraction`.
    Bernoulli { fraction: f64, seed: u64 },
    /// Keep exactly `min(size, n)` documents, uniformly (Algorithm R).
    Reservoir { size: usize, seed: u64 },
}

impl Sampler {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Sampler::All => Ok(()),
            Sampler::Bernoulli { fraction, .. } => {
                if fraction > 0.0 && fraction <= 1.0 {
                    Ok(())
                } else {
                    Err(Error::InvalidParameter {
                        name: "sample_fraction",
                        message: "must be in (0, 1]",
                    })
                }
            }
            Sampler::Reservoir { size, .. } => {
                if size == 0 {
                    Err(Error::InvalidParameter {
                        name: "reservoir_size",
                        message: "must be at least 1",
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Draw the fitting set. Output preserves input order.
    pub fn select<E, T>(&self, exec: &E, items: &[T]) -> Result<Vec<T>>
    where
        E: Executor,
        T: Clone + Send + Sync,
    {
        self.validate()?;
        Ok(match *self {
            Sampler::All => items.to_vec(),
            Sampler::Bernoulli { fraction, seed } => exec.sample(items, fraction, seed),
            Sampler::Reservoir { size, seed } => {
                let mut picked = reservoir_indices(items.len(), size, seed);
                picked.sort_unstable();
                picked.into_iter().map(|i| items[i].clone()).collect()
            }
        })
    }
}

fn reservoir_indices(n: usize, size: usize, seed: u64) -> Vec<usize> {
    if size >= n {
        return (0..n).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut reservoir: Vec<usize> = (0..size).collect();
    for i in size..n {
        let j = rng.random_range(0..=i);
        if j < size {
            reservoir[j] = i;
        }
    }
    reservoir
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Parallel, Sequential};

    #[test]
    fn all_keeps_everything() {
        let xs: Vec<u32> = (0..10).collect();
        assert_eq!(Sampler::All.select(&Sequential, &xs).unwrap(), xs);
    }

    #[test]
    fn bernoulli_is_reproducible() {
        let xs: Vec<u32> = (0..10_000).collect();
        let s = Sampler::Bernoulli {
            fraction: 0.001,
            seed: 42,
        };
        let a = s.select(&Sequential, &xs).unwrap();
        let b = s.select(&Parallel, &xs).unwrap();
        assert_eq!(a, b);
        assert!(a.len() < 40);
    }

    #[test]
    fn reservoir_has_exact_size() {
        let xs: Vec<u32> = (0..1_000).collect();
        let s = Sampler::Reservoir { size: 25, seed: 9 };
        let a = s.select(&Sequential, &xs).unwrap();
        assert_eq!(a.len(), 25);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(a, s.select(&Sequential, &xs).unwrap());

        let small = Sampler::Reservoir { size: 50, seed: 9 };
        assert_eq!(small.select(&Sequential, &xs[..10]).unwrap().len(), 10);
    }

    #[test]
    fn invalid_parameters() {
        let xs = [1, 2, 3];
        for s in [
            Sampler::Bernoulli { fraction: 0.0, seed: 1 },
            Sampler::Bernoulli { fraction: 1.5, seed: 1 },
            Sampler::Reservoir { size: 0, seed: 1 },
        ] {
            assert!(s.select(&Sequential, &xs).is_err());
        }
    }
}

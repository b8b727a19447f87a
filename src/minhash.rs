//! MinHash signatures over the nonzero index set of a count vector.
//!
//! # The scheme (Broder, 1997)
//!
//! For a set `S` and a random hash function `h`, the probability that
//! `min h(S) == min h(T)` equals the Jaccard similarity `|S ∩ T| / |S ∪ T|`.
//! Stacking `H` independent functions gives a dense `H`-vector whose
//! per-dimension agreement rate estimates Jaccard similarity.
//!
//! Each function is a universal hash over the vocabulary index:
//!
//! ```text
//! h_j(i) = ((1 + i) * a_j + b_j) mod P        P = 2_038_074_743
//! ```
//!
//! with `a_j ∈ [1, P)` and `b_j ∈ [0, P)` drawn once from an RNG seeded by
//! `seed_j`. Coefficients are fixed at construction; hashing itself involves
//! no randomness, so a given vector and seed list always produce the same
//! signature.
//!
//! Signatures are undefined for the empty set: [`MinHasher::signature`]
//! returns `None` for all-zero vectors.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::text::CountVector;

/// Prime modulus of the hash family.
pub const HASH_PRIME: u64 = 2_038_074_743;

/// MinHash parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinHashConfig {
    /// Number of hash functions `H`.
    pub num_hashes: usize,
    /// Base seed; function `j` uses `seed + j` unless `seeds` is given.
    pub seed: u64,
    /// Explicit per-function seeds (length must equal `num_hashes`).
    pub seeds: Option<Vec<u64>>,
}

impl Default for MinHashConfig {
    fn default() -> Self {
        Self {
            num_hashes: 20,
            seed: 0,
            seeds: None,
        }
    }
}

impl MinHashConfig {
    /// Check `num_hashes >= 1` and that explicit seeds, if given, match it.
    pub fn validate(&self) -> Result<()> {
        if self.num_hashes == 0 {
            return Err(Error::InvalidParameter {
                name: "num_hashes",
                message: "must be at least 1",
            });
        }
        if let Some(seeds) = &self.seeds {
            if seeds.len() != self.num_hashes {
                return Err(Error::DimensionMismatch {
                    expected: self.num_hashes,
                    found: seeds.len(),
                });
            }
        }
        Ok(())
    }

    /// Seed of every hash function, in order.
    pub fn resolved_seeds(&self) -> Vec<u64> {
        match &self.seeds {
            Some(seeds) => seeds.clone(),
            None => (0..self.num_hashes as u64)
                .map(|j| self.seed.wrapping_add(j))
                .collect(),
        }
    }
}

/// Dense MinHash signature (`H` values, each in `[0, P)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(Vec<u64>);

impl Signature {
    /// Per-function minima, in hash-function order.
    pub fn values(&self) -> &[u64] {
        &self.0
    }

    /// Number of hash functions `H`.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values as `f64`, the representation used by scaling and clustering.
    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().map(|&v| v as f64).collect()
    }

    /// Fraction of agreeing positions: an estimate of Jaccard similarity.
    pub fn estimate_jaccard(&self, other: &Signature) -> Result<f64> {
        if self.len() != other.len() {
            return Err(Error::DimensionMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        if self.is_empty() {
            return Err(Error::EmptyInput);
        }
        let agree = self.0.iter().zip(&other.0).filter(|(a, b)| a == b).count();
        Ok(agree as f64 / self.len() as f64)
    }
}

/// A fixed family of `H` hash functions.
#[derive(Debug, Clone)]
pub struct MinHasher {
    coefficients: Vec<(u64, u64)>,
}

impl MinHasher {
    /// Draw coefficients for every configured seed.
    pub fn new(config: &MinHashConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_seeds(&config.resolved_seeds()))
    }

    /// One hash function per seed.
    pub fn from_seeds(seeds: &[u64]) -> Self {
        let coefficients = seeds
            .iter()
            .map(|&s| {
                let mut rng = StdRng::seed_from_u64(s);
                let a = rng.random_range(1..HASH_PRIME);
                let b = rng.random_range(0..HASH_PRIME);
                (a, b)
            })
            .collect();
        Self { coefficients }
    }

    /// Use explicit `(a, b)` pairs, e.g. from a previously fitted hasher.
    pub fn from_coefficients(coefficients: Vec<(u64, u64)>) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(Error::EmptyInput);
        }
        if coefficients
            .iter()
            .any(|&(a, b)| a == 0 || a >= HASH_PRIME || b >= HASH_PRIME)
        {
            return Err(Error::InvalidParameter {
                name: "coefficients",
                message: "need a in [1, P) and b in [0, P)",
            });
        }
        Ok(Self { coefficients })
    }

    /// `(a, b)` of every hash function.
    pub fn coefficients(&self) -> &[(u64, u64)] {
        &self.coefficients
    }

    /// Number of hash functions `H`.
    pub fn num_hashes(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    fn hash(a: u64, b: u64, index: usize) -> u64 {
        let v = (1 + index as u128) * a as u128 + b as u128;
        (v % HASH_PRIME as u128) as u64
    }

    /// Signature of the nonzero index set of `cv`, or `None` if `cv` is all zero.
    pub fn signature(&self, cv: &CountVector) -> Option<Signature> {
        if cv.is_zero() {
            return None;
        }
        Some(self.signature_of_indices(cv.entries().iter().map(|&(i, _)| i)))
    }

    /// Signature of an explicit index set. The iterator must be non-empty and
    /// is consumed once per hash function.
    fn signature_of_indices<I>(&self, indices: I) -> Signature
    where
        I: Iterator<Item = usize> + Clone,
    {
        let values = self
            .coefficients
            .iter()
            .map(|&(a, b)| {
                indices
                    .clone()
                    .map(|i| Self::hash(a, b, i))
                    .min()
                    .unwrap_or(HASH_PRIME)
            })
            .collect();
        Signature(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::index::sample;

    fn cv(dim: usize, idx: &[usize]) -> CountVector {
        CountVector::from_entries(dim, idx.iter().map(|&i| (i, 1))).unwrap()
    }

    #[test]
    fn signature_has_length_h() {
        let hasher = MinHasher::new(&MinHashConfig::default()).unwrap();
        let sig = hasher.signature(&cv(100, &[3, 17, 42])).unwrap();
        assert_eq!(sig.len(), 20);
        assert!(sig.values().iter().all(|&v| v < HASH_PRIME));
    }

    #[test]
    fn zero_vector_has_no_signature() {
        let hasher = MinHasher::new(&MinHashConfig::default()).unwrap();
        assert!(hasher.signature(&CountVector::zeros(10)).is_none());
    }

    #[test]
    fn deterministic_across_instances() {
        let config = MinHashConfig {
            num_hashes: 8,
            seed: 7,
            seeds: None,
        };
        let a = MinHasher::new(&config).unwrap().signature(&cv(50, &[1, 2, 30]));
        let b = MinHasher::new(&config).unwrap().signature(&cv(50, &[1, 2, 30]));
        assert_eq!(a, b);
    }

    #[test]
    fn counts_do_not_matter_only_support() {
        let hasher = MinHasher::new(&MinHashConfig::default()).unwrap();
        let a = CountVector::from_entries(20, [(2, 1), (9, 5)]).unwrap();
        let b = CountVector::from_entries(20, [(2, 7), (9, 1)]).unwrap();
        assert_eq!(hasher.signature(&a), hasher.signature(&b));
    }

    #[test]
    fn explicit_seeds_match_base_seed() {
        let base = MinHashConfig {
            num_hashes: 3,
            seed: 10,
            seeds: None,
        };
        let explicit = MinHashConfig {
            seeds: Some(vec![10, 11, 12]),
            ..base.clone()
        };
        let v = cv(30, &[4, 5]);
        assert_eq!(
            MinHasher::new(&base).unwrap().signature(&v),
            MinHasher::new(&explicit).unwrap().signature(&v)
        );
    }

    #[test]
    fn seed_list_length_is_validated() {
        let config = MinHashConfig {
            num_hashes: 3,
            seed: 0,
            seeds: Some(vec![1, 2]),
        };
        assert!(MinHasher::new(&config).is_err());
        let config = MinHashConfig {
            num_hashes: 0,
            ..Default::default()
        };
        assert!(MinHasher::new(&config).is_err());
    }

    #[test]
    fn agreement_tracks_jaccard() {
        let hasher = MinHasher::from_seeds(&(0..256).collect::<Vec<u64>>());
        let mut rng = StdRng::seed_from_u64(11);
        let picked = sample(&mut rng, 100_000, 150).into_vec();
        // 50 shared of 150 total: J = 1/3.
        let a = cv(100_000, &picked[..100]);
        let b = cv(100_000, &picked[50..]);
        let est = hasher
            .signature(&a)
            .unwrap()
            .estimate_jaccard(&hasher.signature(&b).unwrap())
            .unwrap();
        assert!((est - 1.0 / 3.0).abs() < 0.12, "estimate {est}");
    }

    #[test]
    fn overlapping_pairs_agree_more_than_disjoint_pairs() {
        let hasher = MinHasher::from_seeds(&(100..132).collect::<Vec<u64>>());
        let mut rng = StdRng::seed_from_u64(3);
        let (mut overlap, mut disjoint) = (0.0, 0.0);
        let trials = 200;
        for _ in 0..trials {
            let picked = sample(&mut rng, 1000, 30).into_vec();
            let base = &picked[..10];
            let near: Vec<usize> = picked[..9].iter().chain(&picked[10..11]).copied().collect();
            let far = &picked[20..30];
            let sa = hasher.signature(&cv(1000, base)).unwrap();
            overlap += sa
                .estimate_jaccard(&hasher.signature(&cv(1000, &near)).unwrap())
                .unwrap();
            disjoint += sa
                .estimate_jaccard(&hasher.signature(&cv(1000, far)).unwrap())
                .unwrap();
        }
        let (overlap, disjoint) = (overlap / trials as f64, disjoint / trials as f64);
        assert!(overlap > 0.6, "overlap agreement {overlap}");
        assert!(disjoint < 0.1, "disjoint agreement {disjoint}");
    }
}

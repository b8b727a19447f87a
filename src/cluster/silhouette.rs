//! Silhouette coefficient (Rousseeuw, 1987).
//!
//! For point `i` in cluster `A`:
//!
//! ```text
//! a(i) = mean distance from i to the other members of A
//! b(i) = min over clusters B ≠ A of the mean distance from i to members of B
//! s(i) = (b(i) - a(i)) / max(a(i), b(i))      (0 when A = {i} or max = 0)
//! ```
//!
//! The score is the mean of `s(i)`, always in `[-1, 1]`, and is only defined
//! when at least two clusters are non-empty.
//!
//! Cost is quadratic in the number of points; callers should pass a sampled
//! fitting set rather than a full corpus.

use serde::{Deserialize, Serialize};

use super::util;
use crate::error::{Error, Result};
use crate::exec::Executor;

/// Pairwise distance used inside the silhouette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilhouetteDistance {
    /// `||x - y||²`.
    #[default]
    SquaredEuclidean,
    /// `||x - y||`.
    Euclidean,
}

impl SilhouetteDistance {
    #[inline]
    fn eval(self, a: &[f64], b: &[f64]) -> f64 {
        let d2 = util::squared_euclidean(a, b);
        match self {
            SilhouetteDistance::SquaredEuclidean => d2,
            SilhouetteDistance::Euclidean => d2.sqrt(),
        }
    }
}

/// Mean silhouette of a labeling, or `None` when fewer than two clusters are populated.
pub fn silhouette_score<E: Executor>(
    exec: &E,
    data: &[Vec<f64>],
    labels: &[usize],
    distance: SilhouetteDistance,
) -> Result<Option<f64>> {
    util::check_points(data)?;
    if labels.len() != data.len() {
        return Err(Error::DimensionMismatch {
            expected: data.len(),
            found: labels.len(),
        });
    }

    let k = labels.iter().max().map_or(0, |&m| m + 1);
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return Ok(None);
    }

    let indices: Vec<usize> = (0..data.len()).collect();
    let per_point = exec.map(&indices, |&i| {
        let own = labels[i];
        if sizes[own] < 2 {
            return 0.0;
        }
        let mut sums = vec![0.0f64; k];
        for (j, x) in data.iter().enumerate() {
            if j != i {
                sums[labels[j]] += distance.eval(&data[i], x);
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            (b - a) / denom
        } else {
            0.0
        }
    });

    Ok(Some(per_point.iter().sum::<f64>() / per_point.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Parallel, Sequential};

    #[test]
    fn well_separated_clusters_score_high() {
        let data = vec![vec![0.0, 0.0], vec![0.1, 0.1], vec![5.0, 5.0], vec![5.1, 5.1]];
        let labels = vec![0, 0, 1, 1];
        for d in [SilhouetteDistance::Euclidean, SilhouetteDistance::SquaredEuclidean] {
            let s = silhouette_score(&Sequential, &data, &labels, d).unwrap().unwrap();
            assert!(s > 0.9, "{d:?}: {s}");
        }
    }

    #[test]
    fn known_value_one_dimension() {
        // Points 0, 1 | 4 with Euclidean distance:
        // p0: a=1, b=4 -> 0.75; p1: a=1, b=3 -> 2/3; p2: singleton -> 0.
        let data = vec![vec![0.0], vec![1.0], vec![4.0]];
        let s = silhouette_score(&Sequential, &data, &[0, 0, 1], SilhouetteDistance::Euclidean)
            .unwrap()
            .unwrap();
        let expected = (0.75 + 2.0 / 3.0) / 3.0;
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn bad_labeling_is_negative() {
        let data = vec![vec![0.0], vec![10.0], vec![0.1], vec![10.1]];
        let s = silhouette_score(&Sequential, &data, &[0, 0, 1, 1], SilhouetteDistance::Euclidean)
            .unwrap()
            .unwrap();
        assert!(s < 0.0);
        assert!(s >= -1.0);
    }

    #[test]
    fn undefined_for_single_cluster() {
        let data = vec![vec![0.0], vec![1.0]];
        let s =
            silhouette_score(&Sequential, &data, &[0, 0], SilhouetteDistance::default()).unwrap();
        assert!(s.is_none());
        // Label 1 is unused, so only one cluster is populated.
        let s =
            silhouette_score(&Sequential, &data, &[2, 2], SilhouetteDistance::default()).unwrap();
        assert!(s.is_none());
    }

    #[test]
    fn executors_agree() {
        let data: Vec<Vec<f64>> = (0..60).map(|i| vec![(i % 5) as f64, (i / 7) as f64]).collect();
        let labels: Vec<usize> = (0..60).map(|i| i % 3).collect();
        let a =
            silhouette_score(&Sequential, &data, &labels, SilhouetteDistance::default()).unwrap();
        let b = silhouette_score(&Parallel, &data, &labels, SilhouetteDistance::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn label_length_must_match() {
        let data = vec![vec![0.0], vec![1.0]];
        assert!(silhouette_score(&Sequential, &data, &[0], SilhouetteDistance::default()).is_err());
    }
}

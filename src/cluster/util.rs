use std::cmp::Ordering;

use crate::error::{Error, Result};

#[inline]
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Index and squared distance of the closest centroid. Ties go to the lowest index.
#[inline]
pub(crate) fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = 0usize;
    let mut best_d = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_euclidean(point, centroid);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    (best, best_d)
}

/// Validate a dense dataset and return its dimensionality.
pub(crate) fn check_points(data: &[Vec<f64>]) -> Result<usize> {
    let first = data.first().ok_or(Error::EmptyInput)?;
    let d = first.len();
    if d == 0 {
        return Err(Error::InvalidParameter {
            name: "dimension",
            message: "must be at least 1",
        });
    }
    for point in data.iter().skip(1) {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
    }
    Ok(d)
}

fn lexicographic(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Number of distinct points (exact coordinate equality).
pub(crate) fn count_distinct(data: &[Vec<f64>]) -> usize {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&i, &j| lexicographic(&data[i], &data[j]));
    order.dedup_by(|i, j| lexicographic(&data[*i], &data[*j]).is_eq());
    order.len()
}

/// Component-wise mean of the selected rows. `members` must be non-empty.
pub(crate) fn mean_of(data: &[Vec<f64>], members: &[usize], dim: usize) -> Vec<f64> {
    let mut mean = vec![0.0; dim];
    for &i in members {
        for (m, x) in mean.iter_mut().zip(&data[i]) {
            *m += x;
        }
    }
    let n = members.len().max(1) as f64;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}

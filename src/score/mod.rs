//! Distance-to-centroid anomaly scoring.
//!
//! Every hashed document is assigned to its nearest centroid in a
//! [`ClusterModel`] and scored by its Euclidean distance to that centroid.
//! Documents whose count vector was all zero never get a feature vector; they
//! are merged back with a distance of `f64::INFINITY` and no cluster, so they
//! always rank above every scored document.
//!
//! The resulting [`AnomalyReport`] is ordered by descending distance, ties
//! broken by ascending document id.

mod kde;

pub use kde::{
    Bandwidth, DensityCurve, DensityPoint, Grid, Kernel, KernelDensity, MAX_GRID_POINTS,
};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::cluster::ClusterModel;
use crate::error::Result;
use crate::exec::Executor;

/// Distance assigned to documents that could not be scored.
pub const SENTINEL_DISTANCE: f64 = f64::INFINITY;

/// Nearest-centroid assignment of one scored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    /// In `[0, k)`.
    pub cluster: usize,
    /// Euclidean distance to the centroid, `>= 0`.
    pub distance: f64,
}

/// One row of an [`AnomalyReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: String,
    /// Scaled feature vector; `None` for degenerate documents.
    pub scaled: Option<Vec<f64>>,
    /// Nearest centroid; `None` for degenerate documents.
    pub cluster: Option<usize>,
    /// Euclidean distance to the centroid. Serialized as `null` for the sentinel.
    #[serde(with = "sentinel")]
    pub distance: f64,
}

impl AnomalyRecord {
    pub fn is_degenerate(&self) -> bool {
        self.cluster.is_none()
    }
}

/// JSON has no infinity; the sentinel round-trips through `null`.
mod sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &f64, s: S) -> Result<S::Ok, S::Error> {
        if d.is_finite() {
            s.serialize_some(d)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(super::SENTINEL_DISTANCE))
    }
}

fn rank(a: &AnomalyRecord, b: &AnomalyRecord) -> Ordering {
    b.distance
        .total_cmp(&a.distance)
        .then_with(|| a.id.cmp(&b.id))
}

/// Documents ranked by descending distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalyReport {
    records: Vec<AnomalyRecord>,
}

impl AnomalyReport {
    /// Sort `records` into report order.
    pub fn from_records(mut records: Vec<AnomalyRecord>) -> Self {
        records.sort_by(rank);
        Self { records }
    }

    pub fn records(&self) -> &[AnomalyRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AnomalyRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The `n` highest-ranked records.
    pub fn top(&self, n: usize) -> &[AnomalyRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Records with `distance >= min_distance` (sentinels included).
    pub fn threshold(&self, min_distance: f64) -> &[AnomalyRecord] {
        let end = self.records.partition_point(|r| r.distance >= min_distance);
        &self.records[..end]
    }

    pub fn get(&self, id: &str) -> Option<&AnomalyRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Finite distances in report order: the input to a density estimate.
    pub fn distances(&self) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.distance)
            .filter(|d| d.is_finite())
            .collect()
    }

    pub fn degenerate(&self) -> impl Iterator<Item = &AnomalyRecord> + '_ {
        self.records.iter().filter(|r| r.is_degenerate())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report written by [`to_json`](Self::to_json). Order is re-established.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<AnomalyRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }
}

/// Scores feature vectors against a fitted model.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyScorer<'a> {
    model: &'a ClusterModel,
}

impl<'a> AnomalyScorer<'a> {
    pub fn new(model: &'a ClusterModel) -> Self {
        Self { model }
    }

    /// Nearest centroid and distance of every feature vector, in input order.
    pub fn assign<E: Executor>(
        &self,
        exec: &E,
        features: &[(String, Vec<f64>)],
    ) -> Result<Vec<Assignment>> {
        exec.map(features, |(id, x)| {
            self.model.nearest(x).map(|(cluster, distance)| Assignment {
                id: id.clone(),
                cluster,
                distance,
            })
        })
        .into_iter()
        .collect()
    }

    /// Score `features` (`(id, scaled vector)` pairs) and merge in the
    /// `degenerate` ids with the sentinel distance.
    pub fn score<E: Executor>(
        &self,
        exec: &E,
        features: &[(String, Vec<f64>)],
        degenerate: &[String],
    ) -> Result<AnomalyReport> {
        let assignments = self.assign(exec, features)?;
        let mut records: Vec<AnomalyRecord> = assignments
            .into_iter()
            .zip(features)
            .map(|(a, (_, x))| AnomalyRecord {
                id: a.id,
                scaled: Some(x.clone()),
                cluster: Some(a.cluster),
                distance: a.distance,
            })
            .collect();
        records.extend(degenerate.iter().map(|id| AnomalyRecord {
            id: id.clone(),
            scaled: None,
            cluster: None,
            distance: SENTINEL_DISTANCE,
        }));

        tracing::info!(
            scored = features.len(),
            degenerate = degenerate.len(),
            "anomaly report"
        );
        Ok(AnomalyReport::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Parallel, Sequential};

    fn model() -> ClusterModel {
        ClusterModel::new(vec![vec![0.0, 0.0], vec![10.0, 0.0]]).unwrap()
    }

    fn features() -> Vec<(String, Vec<f64>)> {
        vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![10.0, 3.0]),
            ("c".to_string(), vec![5.0, 0.0]),
            ("d".to_string(), vec![0.0, 3.0]),
        ]
    }

    #[test]
    fn ranks_by_distance_then_id() {
        let m = model();
        let report = AnomalyScorer::new(&m)
            .score(&Sequential, &features(), &["z".to_string(), "y".to_string()])
            .unwrap();
        let ids: Vec<&str> = report.records().iter().map(|r| r.id.as_str()).collect();
        // y, z: sentinel; c: 5; b, d: 3 (tie on distance); a: 1.
        assert_eq!(ids, vec!["y", "z", "c", "b", "d", "a"]);
        assert_eq!(report.get("b").unwrap().cluster, Some(1));
        assert_eq!(report.get("c").unwrap().cluster, Some(0));
        assert!(report.get("y").unwrap().is_degenerate());
        assert_eq!(report.degenerate().count(), 2);
    }

    #[test]
    fn assignments_keep_input_order() {
        let m = model();
        let assigned = AnomalyScorer::new(&m).assign(&Sequential, &features()).unwrap();
        let ids: Vec<&str> = assigned.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(assigned[0].cluster, 0);
        assert!((assigned[0].distance - 1.0).abs() < 1e-12);
        assert_eq!(assigned[1].cluster, 1);
    }

    #[test]
    fn sentinels_outrank_every_real_distance() {
        let m = model();
        let far = vec![("far".to_string(), vec![1e100, 0.0])];
        let report = AnomalyScorer::new(&m)
            .score(&Sequential, &far, &["empty".to_string()])
            .unwrap();
        assert_eq!(report.records()[0].id, "empty");
        assert!(report.records()[0].distance > report.records()[1].distance);
    }

    #[test]
    fn top_and_threshold() {
        let m = model();
        let report = AnomalyScorer::new(&m)
            .score(&Sequential, &features(), &["z".to_string()])
            .unwrap();
        assert_eq!(report.top(2).len(), 2);
        assert_eq!(report.top(100).len(), 5);
        let over = report.threshold(3.0);
        assert_eq!(over.len(), 4);
        assert!(over.iter().all(|r| r.distance >= 3.0));
        assert_eq!(report.distances(), vec![5.0, 3.0, 3.0, 1.0]);
    }

    #[test]
    fn json_round_trip_keeps_sentinel() {
        let m = model();
        let report = AnomalyScorer::new(&m)
            .score(&Sequential, &features(), &["z".to_string()])
            .unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"distance\":null"));
        let back = AnomalyReport::from_json(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let m = model();
        let bad = vec![("x".to_string(), vec![1.0])];
        assert!(AnomalyScorer::new(&m).score(&Sequential, &bad, &[]).is_err());
    }

    #[test]
    fn executors_agree() {
        let m = model();
        let feats: Vec<(String, Vec<f64>)> = (0..500)
            .map(|i| (format!("doc{i:04}"), vec![(i % 13) as f64, (i % 7) as f64]))
            .collect();
        let a = AnomalyScorer::new(&m).score(&Sequential, &feats, &[]).unwrap();
        let b = AnomalyScorer::new(&m).score(&Parallel, &feats, &[]).unwrap();
        assert_eq!(a, b);
    }
}

use super::vectorizer::CountVector;

/// Documents split by whether their count vector has any nonzero entry.
#[derive(Debug, Clone)]
pub struct SparseSplit<K> {
    /// Documents with at least one in-vocabulary term, in input order.
    pub normal: Vec<(K, CountVector)>,
    /// Keys of all-zero documents, in input order.
    ///
    /// These bypass hashing and clustering and are reported as maximal anomalies.
    pub degenerate: Vec<K>,
}

/// Separate all-zero count vectors from the rest.
pub fn split_degenerate<K>(rows: Vec<(K, CountVector)>) -> SparseSplit<K> {
    let mut normal = Vec::with_capacity(rows.len());
    let mut degenerate = Vec::new();
    for (key, cv) in rows {
        if cv.is_zero() {
            degenerate.push(key);
        } else {
            normal.push((key, cv));
        }
    }
    SparseSplit { normal, degenerate }
}

//! Count vectorizer over a frozen vocabulary.
//!
//! Fitting is a map-then-reduce over the corpus: each document contributes its
//! own term counts, partial tables are merged, and the merged table is ranked by
//! document frequency. The resulting [`Vocabulary`] never changes afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stopwords::{StopWords, StopWordsConfig};
use super::tokenize::tokenize;
use crate::error::{Error, Result};
use crate::exec::Executor;

/// Minimum document frequency for a term to enter the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinDf {
    /// Term must appear in at least this many documents.
    Count(u64),
    /// Term must appear in at least this fraction of documents, in `(0, 1)`.
    Fraction(f64),
}

impl Default for MinDf {
    fn default() -> Self {
        MinDf::Count(2)
    }
}

impl MinDf {
    fn threshold(self, n_docs: usize) -> f64 {
        match self {
            MinDf::Count(c) => c as f64,
            MinDf::Fraction(f) => f * n_docs as f64,
        }
    }
}

/// Vectorizer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Maximum vocabulary size `V`; also the width of every [`CountVector`].
    pub vocab_size: usize,
    /// Minimum document frequency.
    pub min_df: MinDf,
    /// Per-document minimum count; rarer terms in a document are dropped at transform.
    pub min_tf: u32,
    /// Clamp every nonzero count to 1.
    pub binary: bool,
    /// Stop word set applied after tokenization.
    pub stop_words: StopWordsConfig,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 1000,
            min_df: MinDf::default(),
            min_tf: 1,
            binary: false,
            stop_words: StopWordsConfig::default(),
        }
    }
}

impl VectorizerConfig {
    /// Reject unusable parameter values.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(Error::InvalidParameter {
                name: "vocab_size",
                message: "must be at least 1",
            });
        }
        if let MinDf::Fraction(f) = self.min_df {
            if !(f > 0.0 && f < 1.0) {
                return Err(Error::InvalidParameter {
                    name: "min_df",
                    message: "fraction must be in (0, 1)",
                });
            }
        }
        if self.min_tf == 0 {
            return Err(Error::InvalidParameter {
                name: "min_tf",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Sparse term-count vector of fixed width `V`.
///
/// Only nonzero entries are stored, sorted by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountVector {
    dim: usize,
    entries: Vec<(usize, u32)>,
}

impl CountVector {
    /// The all-zero vector of width `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Build from `(index, count)` pairs. Zero counts are dropped, duplicate
    /// indices are summed.
    pub fn from_entries(
        dim: usize,
        entries: impl IntoIterator<Item = (usize, u32)>,
    ) -> Result<Self> {
        let mut acc: Vec<(usize, u32)> = Vec::new();
        for (i, c) in entries {
            if i >= dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: i + 1,
                });
            }
            if c > 0 {
                acc.push((i, c));
            }
        }
        acc.sort_unstable_by_key(|&(i, _)| i);
        let mut entries: Vec<(usize, u32)> = Vec::with_capacity(acc.len());
        for (i, c) in acc {
            if let Some(last) = entries.last_mut().filter(|l| l.0 == i) {
                last.1 = last.1.saturating_add(c);
            } else {
                entries.push((i, c));
            }
        }
        Ok(Self { dim, entries })
    }

    /// Width `V`.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of nonzero entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count at `index` (0 when absent or out of range).
    pub fn get(&self, index: usize) -> u32 {
        self.entries
            .binary_search_by_key(&index, |&(i, _)| i)
            .map_or(0, |pos| self.entries[pos].1)
    }

    /// Indices with a nonzero count, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(i, _)| i)
    }

    /// Nonzero `(index, count)` pairs, ascending by index.
    pub fn entries(&self) -> &[(usize, u32)] {
        &self.entries
    }

    pub fn to_dense(&self) -> Vec<u32> {
        let mut out = vec![0; self.dim];
        for &(i, c) in &self.entries {
            out[i] = c;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TermStats {
    doc_freq: u64,
    term_freq: u64,
}

type TermTable = HashMap<String, TermStats>;

/// Tokenizes, removes stop words, and fits vocabularies.
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    config: VectorizerConfig,
    stop_words: StopWords,
}

impl CountVectorizer {
    /// Create a vectorizer, validating its configuration.
    pub fn new(config: VectorizerConfig) -> Result<Self> {
        config.validate()?;
        let stop_words = config.stop_words.build();
        Ok(Self { config, stop_words })
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Tokenize `text` and drop stop words.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.stop_words.remove(tokenize(text))
    }

    /// Fit a frozen vocabulary over analyzed documents.
    ///
    /// Terms must reach the `min_df` threshold; the survivors are ranked by
    /// document frequency (descending), then total count (descending), then
    /// lexicographically, and the first `vocab_size` are kept.
    pub fn fit<E: Executor>(&self, exec: &E, corpus: &[Vec<String>]) -> Vocabulary {
        let table = exec.reduce(corpus, TermTable::new, count_document, merge_tables);
        let threshold = self.config.min_df.threshold(corpus.len());

        let mut ranked: Vec<(String, TermStats)> = table
            .into_iter()
            .filter(|(_, s)| s.doc_freq as f64 >= threshold)
            .collect();
        ranked.sort_by(|(ta, a), (tb, b)| {
            b.doc_freq
                .cmp(&a.doc_freq)
                .then(b.term_freq.cmp(&a.term_freq))
                .then_with(|| ta.cmp(tb))
        });
        ranked.truncate(self.config.vocab_size);

        let terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        tracing::debug!(
            documents = corpus.len(),
            terms = terms.len(),
            "fitted vocabulary"
        );
        Vocabulary::new(terms, self.config.vocab_size, self.config.min_tf, self.config.binary)
    }
}

fn count_document(mut acc: TermTable, tokens: &Vec<String>) -> TermTable {
    let mut local: HashMap<&str, u64> = HashMap::new();
    for t in tokens {
        *local.entry(t.as_str()).or_default() += 1;
    }
    for (term, count) in local {
        let stats = acc.entry(term.to_string()).or_default();
        stats.doc_freq += 1;
        stats.term_freq += count;
    }
    acc
}

fn merge_tables(a: TermTable, b: TermTable) -> TermTable {
    let (mut big, small) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    for (term, s) in small {
        let stats = big.entry(term).or_default();
        stats.doc_freq += s.doc_freq;
        stats.term_freq += s.term_freq;
    }
    big
}

/// Frozen term → index mapping.
///
/// Only the ordered terms are persisted; the lookup table is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "VocabularyRepr")]
pub struct Vocabulary {
    terms: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    dim: usize,
    min_tf: u32,
    binary: bool,
}

#[derive(Deserialize)]
struct VocabularyRepr {
    terms: Vec<String>,
    dim: usize,
    min_tf: u32,
    binary: bool,
}

impl TryFrom<VocabularyRepr> for Vocabulary {
    type Error = Error;

    fn try_from(repr: VocabularyRepr) -> Result<Self> {
        if repr.terms.len() > repr.dim {
            return Err(Error::InvalidParameter {
                name: "terms",
                message: "more terms than the vector width",
            });
        }
        let vocab = Self::new(repr.terms, repr.dim, repr.min_tf, repr.binary);
        if vocab.index.len() != vocab.terms.len() {
            return Err(Error::InvalidParameter {
                name: "terms",
                message: "duplicate term",
            });
        }
        Ok(vocab)
    }
}

impl Vocabulary {
    /// Build a vocabulary from already-ranked terms.
    ///
    /// `dim` is the fixed vector width; terms past it are ignored.
    pub fn new(mut terms: Vec<String>, dim: usize, min_tf: u32, binary: bool) -> Self {
        terms.truncate(dim);
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self {
            terms,
            index,
            dim,
            min_tf: min_tf.max(1),
            binary,
        }
    }

    /// Terms in index order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Index of `term`, if it is in the vocabulary.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Vector width `V` (may exceed the number of retained terms).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of retained terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when no term survived fitting.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Count the in-vocabulary tokens of one analyzed document.
    pub fn transform(&self, tokens: &[String]) -> CountVector {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for t in tokens {
            if let Some(i) = self.index_of(t) {
                *counts.entry(i).or_default() += 1;
            }
        }
        let mut entries: Vec<(usize, u32)> = counts
            .into_iter()
            .filter(|&(_, c)| c >= self.min_tf)
            .map(|(i, c)| (i, if self.binary { 1 } else { c }))
            .collect();
        entries.sort_unstable_by_key(|&(i, _)| i);
        CountVector {
            dim: self.dim,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{Parallel, Sequential};

    fn analyzed(v: &CountVectorizer, docs: &[&str]) -> Vec<Vec<String>> {
        docs.iter().map(|d| v.analyze(d)).collect()
    }

    #[test]
    fn min_df_drops_rare_terms() {
        let v = CountVectorizer::new(VectorizerConfig::default()).unwrap();
        let corpus = analyzed(&v, &["budget review friday", "budget meeting", "lunch order"]);
        let vocab = v.fit(&Sequential, &corpus);
        assert_eq!(vocab.terms(), &["budget".to_string()]);
        assert_eq!(vocab.dim(), 1000);
    }

    #[test]
    fn ranking_is_by_document_frequency_then_count_then_term() {
        let config = VectorizerConfig {
            min_df: MinDf::Count(1),
            ..Default::default()
        };
        let v = CountVectorizer::new(config).unwrap();
        let corpus = analyzed(
            &v,
            &["alpha beta beta beta", "alpha gamma", "alpha gamma delta"],
        );
        let vocab = v.fit(&Sequential, &corpus);
        // alpha df=3; gamma df=2; beta df=1 tf=3; delta df=1 tf=1.
        assert_eq!(vocab.terms(), &["alpha", "gamma", "beta", "delta"]);
    }

    #[test]
    fn vocab_size_truncates() {
        let config = VectorizerConfig {
            vocab_size: 2,
            min_df: MinDf::Count(1),
            ..Default::default()
        };
        let v = CountVectorizer::new(config).unwrap();
        let corpus = analyzed(&v, &["a1 b1 c1", "a1 b1", "a1"]);
        let vocab = v.fit(&Sequential, &corpus);
        assert_eq!(vocab.terms(), &["a1", "b1"]);
        let cv = vocab.transform(&v.analyze("c1 a1 a1"));
        assert_eq!(cv.dim(), 2);
        assert_eq!(cv.entries(), &[(0, 2)]);
    }

    #[test]
    fn fraction_min_df() {
        let config = VectorizerConfig {
            min_df: MinDf::Fraction(0.5),
            ..Default::default()
        };
        let v = CountVectorizer::new(config).unwrap();
        let corpus = analyzed(&v, &["x1 y1", "x1", "x1 z1", "w1"]);
        let vocab = v.fit(&Sequential, &corpus);
        assert_eq!(vocab.terms(), &["x1"]);
    }

    #[test]
    fn out_of_vocabulary_document_is_zero() {
        let v = CountVectorizer::new(VectorizerConfig::default()).unwrap();
        let corpus = analyzed(&v, &["invoice paid", "invoice late", "the of and"]);
        let vocab = v.fit(&Sequential, &corpus);
        assert!(vocab.transform(&corpus[2]).is_zero());
        assert!(vocab.transform(&v.analyze("")).is_zero());
        assert!(!vocab.transform(&corpus[0]).is_zero());
    }

    #[test]
    fn persisted_vocabulary_transforms_identically() {
        let config = VectorizerConfig {
            min_df: MinDf::Count(1),
            ..Default::default()
        };
        let v = CountVectorizer::new(config).unwrap();
        let corpus = analyzed(&v, &["budget review", "budget meeting"]);
        let vocab = v.fit(&Sequential, &corpus);

        let json = serde_json::to_string(&vocab).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.terms(), vocab.terms());
        assert_eq!(back.index_of("review"), vocab.index_of("review"));
        let before = vocab.transform(&corpus[0]);
        let after = back.transform(&corpus[0]);
        assert_eq!(after.nnz(), 2);
        assert_eq!(after, before);
    }

    #[test]
    fn malformed_vocabulary_is_rejected() {
        let too_many = r#"{"terms":["a","b","c"],"dim":2,"min_tf":1,"binary":false}"#;
        assert!(serde_json::from_str::<Vocabulary>(too_many).is_err());
        let duplicate = r#"{"terms":["a","a"],"dim":4,"min_tf":1,"binary":false}"#;
        assert!(serde_json::from_str::<Vocabulary>(duplicate).is_err());
    }

    #[test]
    fn parallel_fit_matches_sequential() {
        let config = VectorizerConfig {
            min_df: MinDf::Count(1),
            ..Default::default()
        };
        let v = CountVectorizer::new(config).unwrap();
        let docs: Vec<String> = (0..200)
            .map(|i| format!("term{} term{} shared word{}", i % 7, i % 13, i % 3))
            .collect();
        let corpus: Vec<Vec<String>> = docs.iter().map(|d| v.analyze(d)).collect();
        let a = v.fit(&Sequential, &corpus);
        let b = v.fit(&Parallel, &corpus);
        assert_eq!(a.terms(), b.terms());
    }

    #[test]
    fn binary_and_min_tf() {
        let vocab = Vocabulary::new(vec!["a1".into(), "b1".into()], 4, 2, false);
        let tokens: Vec<String> = ["a1", "a1", "a1", "b1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(vocab.transform(&tokens).entries(), &[(0, 3)]);

        let vocab = Vocabulary::new(vec!["a1".into(), "b1".into()], 4, 1, true);
        assert_eq!(vocab.transform(&tokens).entries(), &[(0, 1), (1, 1)]);
    }

    #[test]
    fn count_vector_accessors() {
        let cv = CountVector::from_entries(5, [(3, 2), (1, 1), (3, 1), (4, 0)]).unwrap();
        assert_eq!(cv.entries(), &[(1, 1), (3, 3)]);
        assert_eq!(cv.get(3), 3);
        assert_eq!(cv.get(0), 0);
        assert_eq!(cv.to_dense(), vec![0, 1, 0, 3, 0]);
        assert!(CountVector::from_entries(2, [(2, 1)]).is_err());
        assert!(CountVector::zeros(5).is_zero());
    }

    #[test]
    fn invalid_config_rejected() {
        let bad = VectorizerConfig {
            vocab_size: 0,
            ..Default::default()
        };
        assert!(CountVectorizer::new(bad).is_err());
        let bad = VectorizerConfig {
            min_df: MinDf::Fraction(1.5),
            ..Default::default()
        };
        assert!(CountVectorizer::new(bad).is_err());
    }
}

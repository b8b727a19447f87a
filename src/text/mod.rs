//! Text to sparse count vectors.
//!
//! `text → tokenize → remove stop words → count over a frozen vocabulary`.
//!
//! ```rust
//! use stray::exec::Sequential;
//! use stray::text::{CountVectorizer, MinDf, VectorizerConfig};
//!
//! let vectorizer = CountVectorizer::new(VectorizerConfig {
//!     vocab_size: 10,
//!     min_df: MinDf::Count(1),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let corpus: Vec<Vec<String>> = ["The budget is due", "budget approved"]
//!     .iter()
//!     .map(|t| vectorizer.analyze(t))
//!     .collect();
//! let vocab = vectorizer.fit(&Sequential, &corpus);
//!
//! let cv = vocab.transform(&corpus[0]);
//! assert_eq!(cv.dim(), 10);
//! assert_eq!(cv.get(vocab.index_of("budget").unwrap()), 1);
//! ```

mod filter;
mod stopwords;
mod tokenize;
mod vectorizer;

pub use filter::{split_degenerate, SparseSplit};
pub use stopwords::{StopWords, StopWordsConfig, ENGLISH_STOP_WORDS};
pub use tokenize::tokenize;
pub use vectorizer::{CountVector, CountVectorizer, MinDf, VectorizerConfig, Vocabulary};

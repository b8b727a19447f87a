use thiserror::Error;

/// Errors returned by this crate.
///
/// Only configuration-level errors are fatal to a whole run. Per-document
/// problems are collected by the pipeline instead of being returned, and
/// per-k failures in a model-order sweep are recorded in the sweep report.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Invalid inclusive range (e.g. the k sweep range).
    #[error("invalid range {name}: {start}..={end}")]
    InvalidRange {
        /// Parameter name.
        name: &'static str,
        /// Range start.
        start: usize,
        /// Range end (inclusive).
        end: usize,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} distinct items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of (distinct) items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// A raw document lacks a required field.
    #[error("document at position {position} is missing its {field}")]
    MissingField {
        /// Position of the document in the input batch.
        position: usize,
        /// Name of the missing field (`"id"` or `"text"`).
        field: &'static str,
    },

    /// Work was stopped through a [`CancelToken`](crate::exec::CancelToken).
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

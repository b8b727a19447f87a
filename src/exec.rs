//! Execution substrate for the per-document stages.
//!
//! Every stage of the pipeline is written against [`Executor`], a minimal
//! parallel-collection interface: `map`, `filter`, `sample`, and an associative
//! `reduce`. Two implementations are provided:
//!
//! - [`Sequential`]: plain iterators on the calling thread.
//! - [`Parallel`]: rayon's work-stealing pool.
//!
//! Both preserve input order in their outputs, and `sample` decides membership
//! per index rather than per partition, so swapping one executor for the other
//! never changes a result.
//!
//! ```rust
//! use stray::exec::{Executor, Parallel, Sequential};
//!
//! let xs: Vec<u64> = (0..1000).collect();
//! let a = Sequential.map(&xs, |x| x * 2);
//! let b = Parallel.map(&xs, |x| x * 2);
//! assert_eq!(a, b);
//!
//! let total = Parallel.reduce(&xs, || 0u64, |acc, x| acc + x, |a, b| a + b);
//! assert_eq!(total, 999 * 1000 / 2);
//! ```

use rand::prelude::*;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Items per partition in [`Executor::reduce`].
///
/// Both executors fold fixed-size chunks and combine the partials left to
/// right, so floating-point reductions are bit-identical between them.
pub const REDUCE_CHUNK: usize = 1024;

/// Abstract parallel-collection interface.
///
/// `reduce` requires `combine` to be associative and `identity` to be its
/// neutral element.
pub trait Executor: Sync {
    /// Apply `f` to every item, preserving order.
    fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync + Send;

    /// Keep the items matching `pred`, preserving order.
    fn filter<T, F>(&self, items: Vec<T>, pred: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&T) -> bool + Sync + Send;

    /// Fold every item into an accumulator and merge the partial accumulators.
    fn reduce<T, A, I, F, C>(&self, items: &[T], identity: I, fold: F, combine: C) -> A
    where
        T: Sync,
        A: Send,
        I: Fn() -> A + Sync + Send,
        F: Fn(A, &T) -> A + Sync + Send,
        C: Fn(A, A) -> A + Sync + Send;

    /// Bernoulli sample without replacement.
    ///
    /// Item `i` is kept iff a uniform draw seeded by `(seed, i)` falls below
    /// `fraction`, so membership is independent of how the work is split.
    fn sample<T>(&self, items: &[T], fraction: f64, seed: u64) -> Vec<T>
    where
        T: Clone + Send + Sync,
    {
        let indexed: Vec<(usize, &T)> = items.iter().enumerate().collect();
        let kept = self.filter(indexed, |(i, _)| index_draw(seed, *i) < fraction);
        kept.into_iter().map(|(_, item)| item.clone()).collect()
    }
}

/// Uniform draw in `[0, 1)` that depends only on `seed` and `index`.
pub(crate) fn index_draw(seed: u64, index: usize) -> f64 {
    let mixed = seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(mixed).random::<f64>()
}

/// Single-threaded executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Executor for Sequential {
    fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        items.iter().map(f).collect()
    }

    fn filter<T, F>(&self, items: Vec<T>, pred: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&T) -> bool + Sync + Send,
    {
        items.into_iter().filter(|x| pred(x)).collect()
    }

    fn reduce<T, A, I, F, C>(&self, items: &[T], identity: I, fold: F, combine: C) -> A
    where
        T: Sync,
        A: Send,
        I: Fn() -> A + Sync + Send,
        F: Fn(A, &T) -> A + Sync + Send,
        C: Fn(A, A) -> A + Sync + Send,
    {
        items
            .chunks(REDUCE_CHUNK)
            .map(|chunk| chunk.iter().fold(identity(), &fold))
            .reduce(&combine)
            .unwrap_or_else(&identity)
    }
}

/// Rayon-backed executor using the global thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parallel;

impl Executor for Parallel {
    fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        items.par_iter().map(f).collect()
    }

    fn filter<T, F>(&self, items: Vec<T>, pred: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&T) -> bool + Sync + Send,
    {
        items.into_par_iter().filter(|x| pred(x)).collect()
    }

    fn reduce<T, A, I, F, C>(&self, items: &[T], identity: I, fold: F, combine: C) -> A
    where
        T: Sync,
        A: Send,
        I: Fn() -> A + Sync + Send,
        F: Fn(A, &T) -> A + Sync + Send,
        C: Fn(A, A) -> A + Sync + Send,
    {
        let partials: Vec<A> = items
            .par_chunks(REDUCE_CHUNK)
            .map(|chunk| chunk.iter().fold(identity(), &fold))
            .collect();
        partials.into_iter().reduce(combine).unwrap_or_else(&identity)
    }
}

/// Cooperative cancellation flag shared between a caller and a long-running fit.
///
/// Clustering checks it at the top of every iteration and every sweep trial.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Error::Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

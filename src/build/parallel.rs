//! Order-preserving parallel execution of per-file work.
//!
//! Each source file is independent, so transforms and lint passes may run
//! on a thread pool. Results always come back in input order, which keeps
//! aggregate output and diagnostic reporting deterministic.

use rayon::prelude::*;

/// Map `f` over `items` using up to `jobs` threads.
///
/// The returned vector is in the same order as `items` regardless of
/// completion order. With one job (or one item) the work runs on the
/// calling thread.
pub fn run_ordered<T, R, F>(jobs: usize, items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if jobs <= 1 || items.len() <= 1 {
        return items.iter().map(f).collect();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool.install(|| items.par_iter().map(|item| f(item)).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "could not start thread pool, running sequentially");
            items.iter().map(f).collect()
        }
    }
}

//! Ordered, bounded fan-out over a dedicated rayon pool.

use rayon::prelude::*;
use rayon::{
    ThreadPool,
    ThreadPoolBuilder,
};

use crate::errors::{
    DataProcessingError,
    Result,
};

/// Number of cores left after keeping `reserved` of them free, at least 1.
pub fn available_workers(reserved: usize) -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(reserved)
        .max(1)
}

/// Clamps a requested worker count to `[1, cpu_count - reserved]`.
pub fn clamp_workers(requested: usize, reserved: usize) -> usize {
    requested.clamp(1, available_workers(reserved))
}

fn build_pool(num_workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .build()
        .map_err(|e| DataProcessingError::WorkerPool(e.to_string()).into())
}

/// Maps `f` over `items` with at most `max_workers` threads.
///
/// Output order always matches input order. `min_chunk` is the smallest
/// number of consecutive items handed to one worker at a time.
///
/// ```
/// use catalyst::utils::parallel::parallel_map;
///
/// let squares = parallel_map(&[1, 2, 3, 4], |x| x * x, 2, 1).unwrap();
/// assert_eq!(squares, vec![1, 4, 9, 16]);
/// ```
pub fn parallel_map<T, U, F>(items: &[T], f: F, max_workers: usize, min_chunk: usize) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    if max_workers <= 1 {
        return Ok(items.iter().map(f).collect());
    }
    let pool = build_pool(max_workers)?;
    Ok(pool.install(|| {
        items
            .par_iter()
            .with_min_len(min_chunk.max(1))
            .map(f)
            .collect()
    }))
}

/// Like [`parallel_map`] but the first error aborts the whole map.
pub fn try_parallel_map<T, U, F>(
    items: &[T],
    f: F,
    max_workers: usize,
    min_chunk: usize,
) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U> + Sync + Send,
{
    if max_workers <= 1 {
        return items.iter().map(f).collect();
    }
    let pool = build_pool(max_workers)?;
    pool.install(|| {
        items
            .par_iter()
            .with_min_len(min_chunk.max(1))
            .map(f)
            .collect()
    })
}

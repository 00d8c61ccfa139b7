//! Parallel processing utilities for sparse scatter/accumulate operations
//!
//! This module provides a fixed-size worker pool builder and a scatter-reduce
//! primitive: a slice of work items is partitioned across the pool, every
//! worker accumulates into its own zero-initialized buffer, and the partial
//! buffers are summed into the caller's output once all workers finish.
//!
//! Floating-point addition is not associative, so results computed with
//! different thread counts agree to rounding error, not bit for bit.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Build a dedicated rayon pool with exactly `num_threads` workers.
///
/// A request for zero threads is promoted to a single worker.
pub fn build_thread_pool(num_threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads.max(1))
        .thread_name(|idx| format!("scatter-{idx}"))
        .build()
}

/// Read a worker count from the first environment variable that holds one.
///
/// Variables are tried in order. A value counts only if it parses as a
/// positive integer; when none does the result is 1.
pub fn threads_from_env(vars: &[&str]) -> usize {
    vars.iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|value| parse_thread_count(&value))
        .unwrap_or(1)
}

fn parse_thread_count(value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => None,
    }
}

/// Scatter `items` into `out` in parallel and sum the per-worker results.
///
/// The items are cut into one contiguous partition per pool thread. Each
/// partition gets a private zero-filled buffer of `out.len()` values that
/// `scatter` accumulates into, so workers never write shared memory. The
/// partial buffers are then reduced and added onto `out`; nothing is written
/// to `out` until every partition has been accumulated.
///
/// # Arguments
/// * `pool` - Worker pool that runs the scatter
/// * `items` - Work items, each visited exactly once
/// * `out` - Accumulation target; existing contents are added to, not replaced
/// * `scatter` - Closure adding one item's contribution into a local buffer
pub fn scatter_reduce_into<T, F>(pool: &ThreadPool, items: &[T], out: &mut [f64], scatter: F)
where
    T: Sync,
    F: Fn(&mut [f64], &T) + Send + Sync,
{
    if items.is_empty() {
        return;
    }

    let len = out.len();
    let workers = pool.current_num_threads().max(1);
    let partition = items.len().div_ceil(workers);

    let reduced = pool.install(|| {
        items
            .par_chunks(partition)
            .map(|chunk| {
                let mut local = vec![0.0; len];
                for item in chunk {
                    scatter(&mut local, item);
                }
                local
            })
            .reduce(
                || vec![0.0; len],
                |mut acc, partial| {
                    acc.iter_mut().zip(partial).for_each(|(a, p)| *a += p);
                    acc
                },
            )
    });

    out.iter_mut().zip(reduced).for_each(|(o, r)| *o += r);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(pool: &ThreadPool, items: &[(usize, f64)], bins: usize) -> Vec<f64> {
        let mut out = vec![0.0; bins];
        scatter_reduce_into(pool, items, &mut out, |buf, &(bin, value)| {
            buf[bin] += value;
        });
        out
    }

    #[test]
    fn test_scatter_matches_serial_sum() {
        let items: Vec<(usize, f64)> = (0..10_000).map(|i| (i % 7, (i as f64) * 0.5)).collect();

        let mut expected = vec![0.0; 7];
        for &(bin, value) in &items {
            expected[bin] += value;
        }

        for threads in [1, 2, 3, 8] {
            let pool = build_thread_pool(threads).unwrap();
            let got = histogram(&pool, &items, 7);
            for (g, e) in got.iter().zip(&expected) {
                assert!((g - e).abs() <= 1e-9 * e.abs().max(1.0), "{threads} threads: {g} vs {e}");
            }
        }
    }

    #[test]
    fn test_scatter_adds_onto_existing_output() {
        let pool = build_thread_pool(2).unwrap();
        let mut out = vec![1.0, 2.0];
        scatter_reduce_into(&pool, &[(0usize, 3.0), (1, 4.0)], &mut out, |buf, &(bin, v)| {
            buf[bin] += v;
        });
        assert_eq!(out, vec![4.0, 6.0]);
    }

    #[test]
    fn test_empty_items_leave_output_untouched() {
        let pool = build_thread_pool(4).unwrap();
        let items: Vec<(usize, f64)> = Vec::new();
        let mut out = vec![0.25; 3];
        scatter_reduce_into(&pool, &items, &mut out, |buf, &(bin, v)| buf[bin] += v);
        assert_eq!(out, vec![0.25; 3]);
    }

    #[test]
    fn test_more_threads_than_items() {
        let pool = build_thread_pool(16).unwrap();
        let got = histogram(&pool, &[(0, 1.0), (1, 2.0), (0, 3.0)], 2);
        assert_eq!(got, vec![4.0, 2.0]);
    }

    #[test]
    fn test_zero_threads_promoted_to_one() {
        let pool = build_thread_pool(0).unwrap();
        assert_eq!(pool.current_num_threads(), 1);
    }

    #[test]
    fn test_parse_thread_count() {
        assert_eq!(parse_thread_count("4"), Some(4));
        assert_eq!(parse_thread_count(" 2 "), Some(2));
        assert_eq!(parse_thread_count("0"), None);
        assert_eq!(parse_thread_count("-3"), None);
        assert_eq!(parse_thread_count("many"), None);
        assert_eq!(parse_thread_count(""), None);
    }

    #[test]
    fn test_threads_from_env_defaults_to_one() {
        assert_eq!(threads_from_env(&["SHARED_TEST_THREADS_NEVER_SET_8F2A"]), 1);
        assert_eq!(threads_from_env(&[]), 1);
    }

    #[test]
    fn test_threads_from_env_first_usable_wins() {
        const FIRST: &str = "SHARED_TEST_THREADS_FIRST_3C71";
        const SECOND: &str = "SHARED_TEST_THREADS_SECOND_3C71";

        std::env::set_var(FIRST, "6");
        std::env::set_var(SECOND, "2");
        assert_eq!(threads_from_env(&[FIRST, SECOND]), 6);

        std::env::set_var(FIRST, "0");
        assert_eq!(threads_from_env(&[FIRST, SECOND]), 2);
        std::env::set_var(FIRST, "abc");
        assert_eq!(threads_from_env(&[FIRST, SECOND]), 2);

        std::env::set_var(SECOND, "-1");
        assert_eq!(threads_from_env(&[FIRST, SECOND]), 1);

        std::env::remove_var(FIRST);
        std::env::remove_var(SECOND);
    }
}

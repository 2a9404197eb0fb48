//! Bounded fan-out over independent requests.
//!
//! Pipelines process one request strictly sequentially, but independent
//! requests (or independent training invocations) are free to run in
//! parallel. [`map_unordered`] runs an operation over a batch on a bounded
//! worker pool and yields results as they complete, tagged with their
//! submission index; completion order carries no relationship to submission
//! order.

use std::sync::mpsc;

use crate::errors::{Error, Result};

/// Run `op` over every input on a pool of at most `max_workers` threads.
///
/// Returns `(submission_index, result)` pairs in completion order.
pub fn map_unordered<I, T, F>(inputs: Vec<I>, max_workers: usize, op: F) -> Result<Vec<(usize, T)>>
where
    I: Send,
    T: Send,
    F: Fn(I) -> T + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build()
        .map_err(|e| Error::configuration(format!("failed to build worker pool: {e}")))?;

    let (tx, rx) = mpsc::channel();
    pool.scope(|scope| {
        for (index, input) in inputs.into_iter().enumerate() {
            let tx = tx.clone();
            let op = &op;
            scope.spawn(move |_| {
                // A closed channel means the caller is gone; nothing to do.
                let _ = tx.send((index, op(input)));
            });
        }
        drop(tx);
    });

    Ok(rx.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_input_produces_a_tagged_result() {
        let inputs: Vec<usize> = (0..32).collect();
        let mut results = map_unordered(inputs, 4, |n| n * 2).unwrap();

        results.sort_by_key(|(i, _)| *i);
        assert_eq!(results.len(), 32);
        for (i, value) in results {
            assert_eq!(value, i * 2);
        }
    }

    #[test]
    fn test_empty_batch() {
        let results = map_unordered(Vec::<u32>::new(), 4, |n| n).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_single_worker_still_completes_batch() {
        let results = map_unordered(vec!["a", "bb", "ccc"], 1, str::len).unwrap();
        let mut lengths: Vec<usize> = results.iter().map(|(_, l)| *l).collect();
        lengths.sort_unstable();
        assert_eq!(lengths, vec![1, 2, 3]);
    }

    #[test]
    fn test_slow_task_does_not_block_other_results() {
        let results = map_unordered(vec![30u64, 0, 0, 0], 4, |ms| {
            std::thread::sleep(std::time::Duration::from_millis(ms));
            ms
        })
        .unwrap();
        assert_eq!(results.len(), 4);
        // The slow task is present regardless of where it finished.
        assert!(results.iter().any(|&(i, ms)| i == 0 && ms == 30));
    }
}

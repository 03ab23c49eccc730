//! Pipeline execution.
//!
//! Tasks run strictly one after another; a task never starts before the
//! previous task's output is fully materialized. Inside a task, work is
//! either reduced directly (parallelism 1) or striped over a bounded worker
//! pool.

use eyre::{Result, WrapErr};
use log::debug;
use rayon::prelude::*;

use crate::{Pipeline, Task};

/// Number of workers the host offers.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Partition `items` into `slices` round-robin slices.
///
/// Slice `k` holds every `slices`-th item starting at offset `k`, so
/// `stripe([0, 1, 2, 3, 4], 2)` yields `[[0, 2, 4], [1, 3]]`.
pub fn stripe<T>(items: Vec<T>, slices: usize) -> Vec<Vec<T>> {
    let slices = slices.max(1);
    let mut output: Vec<Vec<T>> = (0..slices)
        .map(|_| Vec::with_capacity(items.len() / slices + 1))
        .collect();

    for (index, item) in items.into_iter().enumerate() {
        output[index % slices].push(item);
    }
    output
}

impl<T, C> Pipeline<T, C> {
    /// Run the pipeline over `items`.
    ///
    /// Each task resolves its parallelism as its own tag, else `max_jobs`,
    /// else [`host_parallelism`]. With one job the task is reduced directly.
    /// With `N > 1` jobs the input is striped into `N` slices, each reduced
    /// on a worker of a pool bounded to `N` threads, and the slice outputs
    /// are concatenated in slot order (slice 0 first). Item order is
    /// therefore not preserved across a parallel task.
    ///
    /// # Errors
    ///
    /// The first error raised by any step aborts the whole run. In a parallel
    /// task the sibling slices are allowed to finish first.
    pub fn run(&self, items: Vec<T>, ctx: &C, max_jobs: Option<usize>) -> Result<Vec<T>>
    where
        T: Send + Sync,
        C: Sync,
    {
        let mut output = items;

        for task in self.tasks() {
            if output.is_empty() {
                break;
            }
            if task.is_empty() {
                continue;
            }

            let jobs = task
                .max_jobs()
                .or(max_jobs)
                .unwrap_or_else(host_parallelism)
                .max(1);

            output = if jobs == 1 {
                task.reduce(output, ctx)?
            } else {
                run_parallel(task, output, ctx, jobs)?
            };
        }

        Ok(output)
    }

    /// Run every task directly, ignoring parallelism tags.
    pub(crate) fn run_sequential(&self, items: Vec<T>, ctx: &C) -> Result<Vec<T>> {
        let mut output = items;
        for task in self.tasks() {
            if output.is_empty() {
                break;
            }
            output = task.reduce(output, ctx)?;
        }
        Ok(output)
    }
}

fn run_parallel<T, C>(task: &Task<T, C>, items: Vec<T>, ctx: &C, jobs: usize) -> Result<Vec<T>>
where
    T: Send + Sync,
    C: Sync,
{
    debug!("Running `{}` with {} jobs", task, jobs);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|index| format!("weft-worker-{}", index))
        .build()
        .wrap_err("failed to start worker pool")?;

    let slices = stripe(items, jobs);
    let results: Vec<Result<Vec<T>>> = pool.install(|| {
        slices
            .into_par_iter()
            .map(|slice| task.reduce(slice, ctx))
            .collect()
    });

    let mut output = Vec::new();
    for (slot, result) in results.into_iter().enumerate() {
        let chunk = result.wrap_err_with(|| format!("worker slot {} failed", slot))?;
        output.extend(chunk);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::Step;

    fn odd() -> Step<i64> {
        Step::filter("odd", |n: &i64| n % 2 != 0)
    }

    fn square() -> Step<i64> {
        Step::map("square", |n: i64| Ok(n * n))
    }

    fn identity() -> Step<i64> {
        Step::map("identity", Ok)
    }

    #[test]
    fn test_stripe() {
        assert_eq!(stripe(vec![0, 1, 2, 3, 4], 2), vec![vec![0, 2, 4], vec![1, 3]]);
        assert_eq!(stripe(vec![1, 2], 3), vec![vec![1], vec![2], vec![]]);
        assert_eq!(stripe(Vec::<i64>::new(), 2), vec![Vec::<i64>::new(), Vec::new()]);
        assert_eq!(stripe(vec![1, 2], 0), vec![vec![1, 2]]);
    }

    #[test]
    fn test_sequential_composition() {
        let pipeline = Pipeline::new().then(odd()).then(square());

        let output = pipeline.run((0..10).collect(), &(), Some(1)).unwrap();
        assert_eq!(output, vec![1, 9, 25, 49, 81]);
    }

    #[test]
    fn test_striped_partition_reorders() {
        let pipeline = Pipeline::new().then(identity());

        let output = pipeline.run((0..10).collect(), &(), Some(2)).unwrap();
        assert_eq!(output, vec![0, 2, 4, 6, 8, 1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_task_tag_overrides_caller_jobs() {
        let pipeline = Pipeline::new().then(identity().jobs(1));

        let output = pipeline.run((0..10).collect(), &(), Some(4)).unwrap();
        assert_eq!(output, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_parallel_then_aggregate() {
        let sort = Step::aggregate("sort", |mut items: Vec<i64>| {
            items.sort();
            Ok(items)
        });
        let pipeline = Pipeline::new().then(square().jobs(3)).then(sort);

        let output = pipeline.run((0..6).collect(), &(), None).unwrap();
        assert_eq!(output, vec![0, 1, 4, 9, 16, 25]);
    }

    #[test]
    fn test_empty_input_skips_tasks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let count = Step::aggregate("count", move |items: Vec<i64>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(items)
        });

        let pipeline = Pipeline::new().then(count);
        let output = pipeline.run(Vec::new(), &(), Some(1)).unwrap();

        assert!(output.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_filtered_out_items_stop_pipeline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let count = Step::aggregate("count", move |items: Vec<i64>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(items)
        });

        let pipeline = Pipeline::new()
            .then(Step::filter("none", |_: &i64| false))
            .then(count);
        let output = pipeline.run((0..4).collect(), &(), Some(1)).unwrap();

        assert!(output.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_aborts_run() {
        let fail = Step::map("fail", |n: i64| {
            if n == 7 {
                Err(eyre::eyre!("cannot handle {}", n))
            } else {
                Ok(n)
            }
        });
        let after = Arc::new(AtomicUsize::new(0));
        let counter = after.clone();
        let tail = Step::aggregate("tail", move |items: Vec<i64>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(items)
        });

        let pipeline = Pipeline::new().then(fail).then(tail);

        let sequential = pipeline.run((0..10).collect(), &(), Some(1));
        assert!(format!("{:?}", sequential.unwrap_err()).contains("cannot handle 7"));

        let parallel = pipeline.run((0..10).collect(), &(), Some(3));
        assert!(format!("{:?}", parallel.unwrap_err()).contains("cannot handle 7"));

        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_context_reaches_workers() {
        struct Offset(i64);

        let shift = Step::<i64, Offset>::method("shift", |ctx, items| {
            Box::new(items.map(move |item| item.map(|n| n + ctx.0)))
        });
        let pipeline = Pipeline::new().then(shift.jobs(2));

        let output = pipeline.run(vec![1, 2, 3, 4], &Offset(10), None).unwrap();
        assert_eq!(output, vec![11, 13, 12, 14]);
    }

    #[test]
    fn test_nested_pipeline_runs_inline() {
        let inner = Pipeline::with_items(vec![100]).then(square());
        let pipeline = Pipeline::new().then(odd()).then_pipeline(inner);

        let output = pipeline.run((0..6).collect(), &(), Some(2)).unwrap();
        // the striped odd task keeps [1, 3, 5], the nested pipeline squares it
        assert_eq!(output, vec![1, 9, 25]);
    }
}

//! Tasks: fused groups of steps.

use std::fmt;

use eyre::Result;

use crate::{Step, Stream};

/// An ordered group of steps sharing one degree of parallelism.
///
/// All steps of a task run against the same partition of the task input,
/// fused into one lazy reduction that is materialized at the end.
pub struct Task<T, C = ()> {
    steps: Vec<Step<T, C>>,
    max_jobs: Option<usize>,
}

impl<T, C> Clone for Task<T, C> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            max_jobs: self.max_jobs,
        }
    }
}

impl<T, C> Task<T, C> {
    /// Create an empty task with an optional parallelism tag.
    pub fn new(max_jobs: Option<usize>) -> Self {
        Self {
            steps: Vec::new(),
            max_jobs,
        }
    }

    /// The parallelism tag of this task.
    pub fn max_jobs(&self) -> Option<usize> {
        self.max_jobs
    }

    pub(crate) fn set_max_jobs(&mut self, max_jobs: Option<usize>) {
        self.max_jobs = max_jobs;
    }

    /// Steps of this task in execution order.
    pub fn steps(&self) -> &[Step<T, C>] {
        &self.steps
    }

    /// Check if the task has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn push(&mut self, step: Step<T, C>) {
        self.steps.push(step);
    }

    /// Run every step over `items` and materialize the result.
    ///
    /// Computes `step_n(...step_1(items)...)`. The first error aborts the
    /// reduction.
    pub fn reduce(&self, items: Vec<T>, ctx: &C) -> Result<Vec<T>> {
        if items.is_empty() {
            return Ok(items);
        }

        let mut stream: Stream<'_, T> = Box::new(items.into_iter().map(Ok));
        for step in &self.steps {
            stream = step.apply(ctx, stream);
        }
        stream.collect()
    }
}

impl<T, C> fmt::Display for Task<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        write!(f, "{}", names.join(" >> "))
    }
}

impl<T, C> fmt::Debug for Task<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("steps", &self.steps)
            .field("max_jobs", &self.max_jobs)
            .finish()
    }
}

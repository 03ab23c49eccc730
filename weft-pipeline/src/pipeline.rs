//! Pipeline composition.

use std::fmt;

use eyre::Result;

use crate::{Step, Task};

/// An ordered list of [`Task`]s plus an optional pre-bound input.
///
/// Steps are composed with [`Pipeline::then`]; a step opens a new trailing
/// task when it is an aggregate step or when its parallelism tag differs
/// from the trailing task's. Otherwise it is fused into the trailing task.
///
/// # Example
///
/// ```ignore
/// let pipeline: Pipeline<i64> = Pipeline::new()
///     .then(Step::filter("odd", |n: &i64| n % 2 != 0))
///     .then(Step::aggregate("sort", |mut items| { items.sort(); Ok(items) }));
///
/// assert_eq!(pipeline.tasks().len(), 2);
/// ```
pub struct Pipeline<T, C = ()> {
    tasks: Vec<Task<T, C>>,
    items: Option<Vec<T>>,
}

impl<T, C> Pipeline<T, C> {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            tasks: vec![Task::new(None)],
            items: None,
        }
    }

    /// Create an empty pipeline bound to an initial item collection.
    pub fn with_items(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            tasks: vec![Task::new(None)],
            items: Some(items.into_iter().collect()),
        }
    }

    /// Tasks of this pipeline in execution order.
    pub fn tasks(&self) -> &[Task<T, C>] {
        &self.tasks
    }

    /// The pre-bound item collection, if any.
    pub fn items(&self) -> Option<&[T]> {
        self.items.as_deref()
    }

    /// Check if the pipeline has no steps at all.
    pub fn is_empty(&self) -> bool {
        self.tasks.iter().all(Task::is_empty)
    }

    /// Total number of steps across all tasks.
    pub fn step_count(&self) -> usize {
        self.tasks.iter().map(|task| task.steps().len()).sum()
    }

    /// Compose a step into this pipeline.
    pub fn then(mut self, step: Step<T, C>) -> Self {
        let trailing = self.trailing_mut();

        if trailing.is_empty() {
            // an empty trailing task simply adopts the step's tag
            trailing.set_max_jobs(step.max_jobs());
        } else if step.is_aggregate() || step.max_jobs() != trailing.max_jobs() {
            self.tasks.push(Task::new(step.max_jobs()));
        }

        self.trailing_mut().push(step);
        self
    }

    /// Compose another pipeline into this one.
    ///
    /// The inner pipeline's tasks are spliced into this pipeline. When the
    /// trailing task already holds steps, the inner pipeline's first task is
    /// merged into it step by step (opening boundaries where composition
    /// requires one) and the remaining tasks are appended. A pipeline with a
    /// pre-bound item collection is never flattened; it becomes one opaque
    /// step instead.
    pub fn then_pipeline(self, inner: Pipeline<T, C>) -> Self
    where
        T: 'static,
        C: 'static,
    {
        if inner.items.is_some() {
            let name = format!("({})", inner.describe_tasks());
            return self.then(Step::pipeline(name, inner));
        }

        let mut inner_tasks = inner.tasks.into_iter().filter(|task| !task.is_empty());
        let mut this = self;

        if this.trailing_mut().is_empty() {
            this.tasks.pop();
            this.tasks.extend(inner_tasks);
            if this.tasks.is_empty() {
                this.tasks.push(Task::new(None));
            }
            return this;
        }

        if let Some(first) = inner_tasks.next() {
            let tag = first.max_jobs();
            for step in first.steps().iter().cloned() {
                // keep the merged task's own tag on its steps
                let step = match tag {
                    Some(jobs) if step.max_jobs() != tag => step.jobs(jobs),
                    _ => step,
                };
                this = this.then(step);
            }
        }
        this.tasks.extend(inner_tasks);
        this
    }

    /// Wrap this pipeline as a single opaque step.
    pub fn into_step(self, name: impl Into<String>) -> Step<T, C>
    where
        T: 'static,
        C: 'static,
    {
        Step::pipeline(name, self)
    }

    /// Run the pipeline over its pre-bound items, sequentially.
    pub fn collect(&self, ctx: &C) -> Result<Vec<T>>
    where
        T: Clone,
    {
        let items = self
            .items
            .clone()
            .ok_or_else(|| eyre::eyre!("pipeline has no initial items"))?;
        self.run_sequential(items, ctx)
    }

    fn trailing_mut(&mut self) -> &mut Task<T, C> {
        if self.tasks.is_empty() {
            self.tasks.push(Task::new(None));
        }
        let last = self.tasks.len() - 1;
        &mut self.tasks[last]
    }

    fn describe_tasks(&self) -> String {
        self.tasks
            .iter()
            .filter(|task| !task.is_empty())
            .map(|task| {
                let jobs = task
                    .max_jobs()
                    .map(|jobs| jobs.to_string())
                    .unwrap_or_else(|| "*".to_string());
                format!("{}>> {}", jobs, task)
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl<T, C> Default for Pipeline<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, C> Clone for Pipeline<T, C> {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            items: self.items.clone(),
        }
    }
}

impl<T, C> fmt::Display for Pipeline<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.items {
            Some(items) => write!(f, "[{} items] ", items.len())?,
            None => write!(f, "[object] ")?,
        }
        write!(f, "{}", self.describe_tasks())
    }
}

impl<T, C> fmt::Debug for Pipeline<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("tasks", &self.tasks)
            .field("items", &self.items.as_ref().map(Vec::len))
            .finish()
    }
}

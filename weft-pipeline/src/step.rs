//! Pipeline steps.

use std::{fmt, sync::Arc};

use eyre::Result;

use crate::Pipeline;

/// A lazy stream of items flowing between steps.
///
/// Errors travel inside the stream; the first one aborts the task when the
/// stream is materialized.
pub type Stream<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

type StreamFn<T, C> = dyn for<'a> Fn(&'a C, Stream<'a, T>) -> Stream<'a, T> + Send + Sync;
type AggregateFn<T, C> = dyn Fn(&C, Vec<T>) -> Result<Vec<T>> + Send + Sync;

/// How a step relates to the context object a pipeline runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Free function, never receives the context.
    Free,
    /// Member of the context object, called with it as receiver.
    Context,
}

enum Action<T, C> {
    Stream(Arc<StreamFn<T, C>>),
    Aggregate(Arc<AggregateFn<T, C>>),
    Nested(Arc<Pipeline<T, C>>),
}

impl<T, C> Clone for Action<T, C> {
    fn clone(&self) -> Self {
        match self {
            Action::Stream(f) => Action::Stream(f.clone()),
            Action::Aggregate(f) => Action::Aggregate(f.clone()),
            Action::Nested(p) => Action::Nested(p.clone()),
        }
    }
}

/// A single unit of work in a [`Pipeline`].
///
/// Steps declare up front whether they need the owning context
/// ([`Binding::Context`]) and whether they consume the whole materialized
/// input of their task (aggregate steps) or a per-item stream.
pub struct Step<T, C = ()> {
    name: String,
    binding: Binding,
    max_jobs: Option<usize>,
    action: Action<T, C>,
}

impl<T, C> Clone for Step<T, C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            binding: self.binding,
            max_jobs: self.max_jobs,
            action: self.action.clone(),
        }
    }
}

fn stream_fn<T, C, F>(f: F) -> Arc<StreamFn<T, C>>
where
    F: for<'a> Fn(&'a C, Stream<'a, T>) -> Stream<'a, T> + Send + Sync + 'static,
{
    Arc::new(f)
}

impl<T: 'static, C: 'static> Step<T, C> {
    /// Create a free streaming step.
    pub fn func<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(Stream<'a, T>) -> Stream<'a, T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            binding: Binding::Free,
            max_jobs: None,
            action: Action::Stream(stream_fn(move |_, items| f(items))),
        }
    }

    /// Create a streaming step bound to the pipeline's context.
    pub fn method<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a C, Stream<'a, T>) -> Stream<'a, T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            binding: Binding::Context,
            max_jobs: None,
            action: Action::Stream(stream_fn(f)),
        }
    }

    /// Create a free aggregate step receiving the whole task input.
    ///
    /// Aggregate steps default to a parallelism of 1.
    pub fn aggregate<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<T>) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            binding: Binding::Free,
            max_jobs: Some(1),
            action: Action::Aggregate(Arc::new(move |_: &C, items: Vec<T>| f(items))),
        }
    }

    /// Create an aggregate step bound to the pipeline's context.
    pub fn aggregate_method<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&C, Vec<T>) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            binding: Binding::Context,
            max_jobs: Some(1),
            action: Action::Aggregate(Arc::new(f)),
        }
    }

    /// Create a free step transforming every item.
    pub fn map<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(T) -> Result<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::func(name, move |items| {
            let f = f.clone();
            Box::new(items.map(move |item| item.and_then(|value| (*f)(value))))
        })
    }

    /// Create a free step keeping the items matching `predicate`.
    pub fn filter<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Self::func(name, move |items| {
            let predicate = predicate.clone();
            Box::new(items.filter(move |item| match item {
                Ok(value) => (*predicate)(value),
                Err(_) => true,
            }))
        })
    }

    /// Wrap a pipeline as one opaque step.
    ///
    /// The wrapped pipeline runs its own tasks sequentially over the
    /// materialized input of the step.
    pub fn pipeline(name: impl Into<String>, pipeline: Pipeline<T, C>) -> Self {
        Self {
            name: name.into(),
            binding: Binding::Free,
            max_jobs: Some(1),
            action: Action::Nested(Arc::new(pipeline)),
        }
    }
}

impl<T, C> Step<T, C> {
    /// Tag this step with an explicit maximum parallelism.
    pub fn jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = Some(max_jobs.max(1));
        self
    }

    /// The step name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the step is bound to the context.
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// The explicit parallelism tag, if any.
    pub fn max_jobs(&self) -> Option<usize> {
        self.max_jobs
    }

    /// Check if this step needs its task's whole input materialized.
    pub fn is_aggregate(&self) -> bool {
        matches!(self.action, Action::Aggregate(_) | Action::Nested(_))
    }

    /// Apply this step to a stream.
    pub fn apply<'a>(&'a self, ctx: &'a C, input: Stream<'a, T>) -> Stream<'a, T>
    where
        T: 'a,
    {
        match &self.action {
            Action::Stream(f) => f(ctx, input),
            Action::Aggregate(f) => {
                let output = input.collect::<Result<Vec<T>>>().and_then(|items| f(ctx, items));
                into_stream(output)
            }
            Action::Nested(pipeline) => {
                let output = input
                    .collect::<Result<Vec<T>>>()
                    .and_then(|items| pipeline.run_sequential(items, ctx));
                into_stream(output)
            }
        }
    }
}

fn into_stream<'a, T: 'a>(output: Result<Vec<T>>) -> Stream<'a, T> {
    match output {
        Ok(items) => Box::new(items.into_iter().map(Ok)),
        Err(err) => Box::new(std::iter::once(Err(err))),
    }
}

impl<T, C> fmt::Display for Step<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.binding {
            Binding::Free => write!(f, "{}", self.name),
            Binding::Context => write!(f, "self.{}", self.name),
        }
    }
}

impl<T, C> fmt::Debug for Step<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .field("max_jobs", &self.max_jobs)
            .field("aggregate", &self.is_aggregate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(items: Vec<i64>) -> Stream<'static, i64> {
        Box::new(items.into_iter().map(Ok))
    }

    #[test]
    fn test_map_and_filter() {
        let odd = Step::<i64>::filter("odd", |n| n % 2 != 0);
        let square = Step::<i64>::map("square", |n| Ok(n * n));

        let stream = odd.apply(&(), source((0..10).collect()));
        let output: Vec<i64> = square.apply(&(), stream).collect::<Result<_>>().unwrap();

        assert_eq!(output, vec![1, 9, 25, 49, 81]);
    }

    #[test]
    fn test_aggregate_defaults_to_one_job() {
        let sort = Step::<i64>::aggregate("sort", |mut items| {
            items.sort();
            Ok(items)
        });

        assert!(sort.is_aggregate());
        assert_eq!(sort.max_jobs(), Some(1));
        assert_eq!(sort.clone().jobs(4).max_jobs(), Some(4));

        let output: Vec<i64> = sort
            .apply(&(), source(vec![3, 1, 2]))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(output, vec![1, 2, 3]);
    }

    #[test]
    fn test_errors_travel_in_stream() {
        let fail = Step::<i64>::map("fail", |n| {
            if n == 2 {
                Err(eyre::eyre!("boom at {}", n))
            } else {
                Ok(n)
            }
        });

        let result = fail.apply(&(), source(vec![1, 2, 3])).collect::<Result<Vec<_>>>();
        assert!(result.unwrap_err().to_string().contains("boom at 2"));
    }

    #[test]
    fn test_binding() {
        struct Factor(i64);

        let scale = Step::<i64, Factor>::method("scale", |ctx, items| {
            Box::new(items.map(move |item| item.map(|n| n * ctx.0)))
        });
        let free = Step::<i64, Factor>::map("identity", Ok);

        assert_eq!(scale.binding(), Binding::Context);
        assert_eq!(free.binding(), Binding::Free);
        assert_eq!(scale.to_string(), "self.scale");
        assert_eq!(free.to_string(), "identity");

        let output: Vec<i64> = scale
            .apply(&Factor(3), source(vec![1, 2]))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(output, vec![3, 6]);
    }
}

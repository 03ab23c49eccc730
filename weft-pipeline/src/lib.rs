//! Composable processing pipelines.
//!
//! This crate provides the [`Pipeline`] model used by weft extensions and the
//! scheduler that runs it:
//!
//! - [`Step`]s are units of work over a stream of items
//! - [`Task`]s group steps that share one degree of parallelism
//! - a [`Pipeline`] is an ordered list of tasks, run one after another
//!
//! Task boundaries are inferred while composing: an aggregate step, or a
//! step whose parallelism tag differs from the trailing task's, always opens
//! a new task.
//!
//! # Example
//!
//! ```ignore
//! use weft_pipeline::{Pipeline, Step};
//!
//! let pipeline: Pipeline<i64> = Pipeline::new()
//!     .then(Step::filter("odd", |n: &i64| n % 2 != 0))
//!     .then(Step::map("square", |n: i64| Ok(n * n)));
//!
//! let output = pipeline.run((0..10).collect(), &(), Some(1))?;
//! assert_eq!(output, vec![1, 9, 25, 49, 81]);
//! ```

mod pipeline;
mod scheduler;
mod step;
mod task;

pub use pipeline::Pipeline;
pub use scheduler::{host_parallelism, stripe};
pub use step::{Binding, Step, Stream};
pub use task::Task;

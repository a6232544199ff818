//! Bounded task execution with ordered results
//!
//! [`BoundedExecutor`] drives an ordered list of tasks with at most
//! `concurrency` of them in flight at once. Tasks are spawned onto the
//! runtime, so the limit bounds true parallelism rather than interleaving.
//! Completion order is free; result order is not: the outcome list always
//! lines up with the input list.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::cancel::AbortSignal;

/// The result of one item's task. Exactly one per input item, in input
/// order.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The subgraph produced a result (freshly computed or from cache)
    Success(Value),
    /// The abort latch was tripped before the task started; no work done
    Skipped,
    /// The subgraph invocation failed
    Failed {
        index: usize,
        item: Value,
        message: String,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskOutcome::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }
}

/// A boxed unit of work producing one [`TaskOutcome`]
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskOutcome> + Send + 'static>>;

/// Fixed-size worker pool over an ordered task list.
#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    concurrency: usize,
}

impl BoundedExecutor {
    /// Create an executor; a zero limit is clamped to one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// The effective concurrency limit.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every task and return their outcomes in input order.
    ///
    /// Once `signal` trips, tasks that have not started short-circuit to
    /// [`TaskOutcome::Skipped`]; tasks already in flight finish naturally.
    /// The call returns only after every task has produced an outcome, so
    /// cancellation changes what a task does, never whether it is awaited.
    /// A panicking task is recovered into a [`TaskOutcome::Failed`] and
    /// trips the latch like any other failure.
    pub async fn run(&self, tasks: Vec<TaskFuture>, signal: &AbortSignal) -> Vec<TaskOutcome> {
        let total = tasks.len();
        tracing::debug!(total, concurrency = self.concurrency, "Dispatching tasks");

        let mut outcomes: Vec<Option<TaskOutcome>> = Vec::with_capacity(total);
        outcomes.resize_with(total, || None);

        let indexed = tasks.into_iter().enumerate().map(|(index, task)| {
            let signal = signal.clone();
            async move {
                if signal.is_aborted() {
                    tracing::debug!(index, "Skipping task, abort latched");
                    return (index, TaskOutcome::Skipped);
                }
                match tokio::spawn(task).await {
                    Ok(outcome) => (index, outcome),
                    Err(e) => {
                        tracing::warn!(index, error = %e, "Task panicked");
                        signal.abort();
                        (
                            index,
                            TaskOutcome::Failed {
                                index,
                                item: Value::Null,
                                message: format!("task panicked: {e}"),
                            },
                        )
                    }
                }
            }
        });

        let mut running = stream::iter(indexed).buffer_unordered(self.concurrency);
        while let Some((index, outcome)) = running.next().await {
            outcomes[index] = Some(outcome);
        }

        // Every index yields exactly one outcome above.
        outcomes.into_iter().flatten().collect()
    }
}

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// A task that panicked (or was cancelled) instead of producing a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("worker task {index} panicked: {message}")]
pub struct WorkerPanic {
    pub index: usize,
    pub message: String,
}

/// Bounded fan-out over tokio tasks.
///
/// At most `size` tasks run at once. Each task owns its input and output;
/// results are collected by input index, so the returned order never depends
/// on completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// Pool with `size` concurrent slots (at least one).
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    /// Available parallelism minus one, leaving a core for the runtime.
    pub fn from_available_parallelism() -> Self {
        let cores = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(cores.saturating_sub(1))
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// Runs `task` once per input and returns one result per input, in input
    /// order. A panicking task is reported as [`WorkerPanic`] for its own
    /// slot and does not disturb the others.
    ///
    /// Dropping the returned future aborts every task still queued or running.
    pub async fn run<I, O, F, Fut>(&self, inputs: Vec<I>, task: F) -> Vec<Result<O, WorkerPanic>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let task = Arc::new(task);
        let permits = Arc::new(Semaphore::new(self.size));
        let mut slots: Vec<Option<Result<O, WorkerPanic>>> =
            std::iter::repeat_with(|| None).take(inputs.len()).collect();
        let mut join_set = JoinSet::new();
        let mut indices = HashMap::with_capacity(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            let task = Arc::clone(&task);
            let permits = Arc::clone(&permits);
            let handle = join_set.spawn(async move {
                // The semaphore is never closed, so acquisition only fails on shutdown.
                let _permit = permits.acquire_owned().await.ok();
                task(input).await
            });
            indices.insert(handle.id(), index);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, value)) => (id, Ok(value)),
                Err(error) => {
                    let id = error.id();
                    let message = if error.is_panic() {
                        panic_message(error.into_panic())
                    } else {
                        "task was cancelled".to_owned()
                    };
                    (id, Err(message))
                }
            };
            let Some(&index) = indices.get(&id) else {
                warn!(task_id = %id, "worker task finished without a slot");
                continue;
            };
            slots[index] = Some(outcome.map_err(|message| WorkerPanic { index, message }));
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(WorkerPanic {
                        index,
                        message: "task produced no result".to_owned(),
                    })
                })
            })
            .collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::from_available_parallelism()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

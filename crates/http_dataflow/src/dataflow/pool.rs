//! src/dataflow/pool.rs
//!
//! Fixed-size worker pool for the OS-thread fetch stage.
//!
//! Workers pull tasks from a shared bounded channel and push results into a
//! bounded output channel; both ends block when full, which is what gives the
//! pipelined strategy its backpressure. A shutdown flag plus channel
//! disconnection stops everything when the pool is dropped, so abandoning an
//! iterator mid-pass releases the workers without leaking threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::{DataflowError, SampleError};

/// A pool of fetch workers communicating over bounded channels.
///
/// # Type parameters
/// - `Task`: work items dispatched to workers
/// - `Output`: results collected from workers
pub(crate) struct WorkerPool<Task, Output> {
    workers: Vec<thread::JoinHandle<()>>,
    task_tx: Option<Sender<Task>>,
    output_rx: Receiver<Output>,
    shutdown: Arc<AtomicBool>,
}

impl<Task, Output> WorkerPool<Task, Output>
where
    Task: Send + 'static,
    Output: Send + 'static,
{
    /// Spawns `num_workers` threads running `worker_fn` over a shared task
    /// channel of capacity `task_capacity` and an output channel of capacity
    /// `output_capacity`.
    pub(crate) fn new<F>(
        num_workers: usize,
        task_capacity: usize,
        output_capacity: usize,
        worker_fn: F,
    ) -> Result<Self, DataflowError>
    where
        F: Fn(Receiver<Task>, Sender<Output>, Arc<AtomicBool>) + Send + Sync + 'static,
    {
        if num_workers == 0 {
            return Err(DataflowError::Config(
                "cannot create a worker pool with 0 workers".into(),
            ));
        }
        if task_capacity == 0 || output_capacity == 0 {
            return Err(DataflowError::Config(
                "worker pool channel capacities must be > 0".into(),
            ));
        }

        let (task_tx, task_rx) = bounded(task_capacity);
        let (output_tx, output_rx) = bounded(output_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_fn = Arc::new(worker_fn);
        let mut workers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let task_rx: Receiver<Task> = task_rx.clone();
            let output_tx = output_tx.clone();
            let shutdown = shutdown.clone();
            let worker_fn = worker_fn.clone();

            let handle = thread::Builder::new()
                .name(format!("dataflow-worker-{worker_id}"))
                .spawn(move || worker_fn(task_rx, output_tx, shutdown))
                .map_err(|source| DataflowError::Spawn { worker_id, source })?;
            workers.push(handle);
        }

        Ok(Self {
            workers,
            task_tx: Some(task_tx),
            output_rx,
            shutdown,
        })
    }

    /// Sends a task to the pool, blocking if the task channel is full.
    pub(crate) fn dispatch(&self, task: Task) -> Result<(), SampleError> {
        match &self.task_tx {
            Some(tx) => tx.send(task).map_err(|_| SampleError::PoolDisconnected),
            None => Err(SampleError::PoolDisconnected),
        }
    }

    /// Receives the next completed result, blocking until one is available.
    pub(crate) fn recv(&self) -> Result<Output, SampleError> {
        self.output_rx
            .recv()
            .map_err(|_| SampleError::PoolDisconnected)
    }
}

impl<Task, Output> Drop for WorkerPool<Task, Output> {
    fn drop(&mut self) {
        // Stop new dispatch, disconnect both channels, then join. Workers
        // observing either the flag or a disconnect exit promptly; an
        // in-flight fetch may still complete and its result is discarded.
        self.shutdown.store(true, Ordering::Relaxed);
        self.task_tx.take();
        // Disconnecting the output side unblocks any worker mid-send.
        self.output_rx = crossbeam_channel::never();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

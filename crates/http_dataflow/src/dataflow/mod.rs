//! src/dataflow/mod.rs
//!
//! The pipeline engine: turns an ordered reference store into a lazy
//! sequence of decoded image samples.
//!
//! # Architecture
//!
//! ```text
//!   ReferenceStore ──► Sampler (order) ──► engine ──► lazy output sequence
//!                                           │
//!                            Fetcher ───────┤  (per index: fetch, gate,
//!                            Decoder ───────┘   decode, yield)
//! ```
//!
//! A `Dataflow` is built once from a store and a config; every call to
//! `iter()` starts a fresh pass — a new shuffle draw when enabled — and
//! returns an iterator that owns all pass state. The concurrency strategy is
//! fixed at construction and dispatched internally; the external contract
//! (lazy sequence, per-item failure semantics) is the same for all three.
//!
//! # Module structure
//!
//! ```text
//! src/dataflow/
//! ├── mod.rs        # Dataflow: construction, validation, pass startup
//! ├── config.rs     # DataflowConfig, builder, Strategy
//! ├── iterator.rs   # DataflowIter and the per-strategy iteration logic
//! └── pool.rs       # WorkerPool on bounded crossbeam channels
//! ```

mod config;
mod iterator;
mod pool;

pub use config::{DataflowConfig, DataflowConfigBuilder, Strategy};
pub use iterator::DataflowIter;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::error::DataflowError;
use crate::fetcher::{AsyncFetcher, Fetcher};
use crate::sampler::{Sampler, SequentialSampler, ShuffledSampler};
use crate::store::ReferenceStore;
use iterator::{run_fetch_worker, IterImpl};
use pool::WorkerPool;

/// A restartable fetch/decode pipeline over a reference store.
///
/// `Dataflow` is `Send + Sync`; iterators are not and stay on the thread
/// that pulls from them.
#[derive(Debug)]
pub struct Dataflow<L> {
    store: ReferenceStore<L>,
    config: DataflowConfig,
    base_seed: u64,
    epoch: AtomicUsize,
}

impl<L> Dataflow<L>
where
    L: Clone + Send + Sync + 'static,
{
    /// Creates a pipeline over `store`.
    ///
    /// The effective shuffle seed is fixed here: with `config.seed` set, two
    /// instances built from the same seed draw identical per-pass orders.
    ///
    /// # Errors
    /// `DataflowError::Config` when a pooled strategy is configured with
    /// `num_threads == 0`, or the ThreadPool strategy with `buffer_size == 0`.
    pub fn new(store: ReferenceStore<L>, config: DataflowConfig) -> Result<Self, DataflowError> {
        match config.strategy {
            Strategy::Sequential => {}
            Strategy::ThreadPool => {
                if config.num_threads == 0 {
                    return Err(DataflowError::Config(
                        "ThreadPool strategy requires num_threads > 0".into(),
                    ));
                }
                if config.buffer_size == 0 {
                    return Err(DataflowError::Config(
                        "ThreadPool strategy requires buffer_size > 0".into(),
                    ));
                }
            }
            Strategy::CoroutinePool => {
                if config.num_threads == 0 {
                    return Err(DataflowError::Config(
                        "CoroutinePool strategy requires num_threads > 0".into(),
                    ));
                }
            }
        }

        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        Ok(Self {
            store,
            config,
            base_seed,
            epoch: AtomicUsize::new(0),
        })
    }

    pub fn store(&self) -> &ReferenceStore<L> {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Starts a fresh pass and returns its lazy output sequence.
    ///
    /// Each call bumps the pass counter, so with shuffling enabled every
    /// pass draws a new permutation. Abandoning the returned iterator early
    /// stops dispatch and releases all workers.
    ///
    /// # Errors
    /// Propagates HTTP-client, worker-spawn, or runtime startup failures.
    /// Item-level fetch/decode failures are *not* errors here; they surface
    /// through the iterator.
    pub fn iter(&self) -> Result<DataflowIter<L>, DataflowError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst);
        let order: Vec<usize> = if self.config.shuffle {
            ShuffledSampler::new(self.store.len(), self.base_seed)
                .iter(epoch)
                .collect()
        } else {
            SequentialSampler::new(self.store.len()).iter(epoch).collect()
        };

        let inner = match self.config.strategy {
            Strategy::Sequential => IterImpl::Sequential {
                order: order.into_iter(),
                store: self.store.clone(),
                fetcher: Fetcher::new(self.config.fetch.clone())?,
            },

            Strategy::ThreadPool => {
                let fetcher = Fetcher::new(self.config.fetch.clone())?;
                let buffer_size = self.config.buffer_size;
                let pool = WorkerPool::new(
                    self.config.num_threads,
                    buffer_size,
                    buffer_size,
                    move |task_rx, output_tx, shutdown| {
                        run_fetch_worker(fetcher.clone(), task_rx, output_tx, shutdown)
                    },
                )?;
                IterImpl::Pooled {
                    pool,
                    order: order.into_iter(),
                    store: self.store.clone(),
                    max_trials: self.config.fetch.max_trials,
                    buffer_size,
                    strict: self.config.strict,
                    in_flight: 0,
                    dispatch_seq: 0,
                    consume_seq: 0,
                }
            }

            Strategy::CoroutinePool => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(DataflowError::Runtime)?;
                IterImpl::Batched {
                    runtime,
                    fetcher: AsyncFetcher::new(self.config.fetch.clone())?,
                    order: order.into_iter(),
                    store: self.store.clone(),
                    batch_width: self.config.num_threads,
                    ready: VecDeque::with_capacity(self.config.num_threads),
                }
            }
        };

        Ok(DataflowIter { inner })
    }
}

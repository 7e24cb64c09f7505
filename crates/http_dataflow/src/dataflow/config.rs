//! src/dataflow/config.rs
//!
//! Configuration for the pipeline engine.
//!
//! Example:
//! ```ignore
//! let config = DataflowConfig::builder()
//!     .shuffle(true)
//!     .seed(42)
//!     .strategy(Strategy::ThreadPool)
//!     .num_threads(16)
//!     .buffer_size(200)
//!     .build();
//! ```

use crate::fetcher::FetchConfig;

/// How the engine overlaps fetch work within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No concurrency: fetch, decode, yield, one index at a time, in order.
    /// The correctness baseline.
    Sequential,
    /// A fixed pool of OS threads fetches ahead of the consumer through a
    /// bounded buffer. Highest throughput; output order is unspecified
    /// unless `strict` is set.
    ThreadPool,
    /// Batch-synchronous cooperative concurrency: `num_threads` async
    /// fetches are awaited together, the whole batch is yielded, then the
    /// next batch is dispatched. Simpler backpressure reasoning than the
    /// pipelined pool; batches are emitted in order.
    CoroutinePool,
}

/// Configuration for a [`Dataflow`](super::Dataflow).
#[derive(Debug, Clone)]
pub struct DataflowConfig {
    /// Draw a fresh random iteration order at the start of every pass.
    pub shuffle: bool,
    /// Base RNG seed for shuffling. Random when unset; fixed at dataflow
    /// construction so every pass of the instance is reproducible.
    pub seed: Option<u64>,
    /// Concurrency strategy, chosen once at setup.
    pub strategy: Strategy,
    /// Worker count (ThreadPool) or batch width (CoroutinePool).
    pub num_threads: usize,
    /// Bounded-buffer capacity for the ThreadPool strategy: the maximum
    /// number of fetched-but-unconsumed payloads held at once.
    pub buffer_size: usize,
    /// Treat out-of-order completion under the ThreadPool strategy as a
    /// per-item error instead of tolerating the reorder.
    pub strict: bool,
    /// Retry and timeout settings for every fetch.
    pub fetch: FetchConfig,
}

impl Default for DataflowConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            seed: None,
            strategy: Strategy::Sequential,
            num_threads: 8,
            buffer_size: 200,
            strict: false,
            fetch: FetchConfig::default(),
        }
    }
}

impl DataflowConfig {
    pub fn builder() -> DataflowConfigBuilder {
        DataflowConfigBuilder::default()
    }
}

/// Builder for [`DataflowConfig`] with method chaining.
#[derive(Default)]
pub struct DataflowConfigBuilder {
    config: DataflowConfig,
}

impl DataflowConfigBuilder {
    /// Enable or disable per-pass shuffling.
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    /// Set the base seed for reproducible shuffling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Select the concurrency strategy.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the worker count / batch width (must be > 0 for pooled strategies).
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.config.num_threads = num_threads;
        self
    }

    /// Set the bounded-buffer capacity for the ThreadPool strategy.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    /// Raise an ordering violation on out-of-order completion.
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Override the fetch retry/timeout settings.
    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    pub fn build(self) -> DataflowConfig {
        self.config
    }
}

//! src/error.rs
//!
//! Error taxonomy for the dataflow.
//!
//! Two tiers, deliberately kept apart:
//! - `DataflowError`: configuration and engine failures. Fatal, raised at
//!   construction or pass startup, never retried.
//! - `SampleError`: per-item failures (an exhausted fetch, undecodable bytes,
//!   a strict-mode ordering violation). These are data, not engine failures:
//!   the pass keeps going and the consumer decides skip-vs-abort.

use thiserror::Error;

/// Fatal configuration or engine errors.
#[derive(Debug, Error)]
pub enum DataflowError {
    /// Raised before any selection occurs when a shard descriptor is invalid.
    #[error("shard_index (={shard_index}) must be smaller than total_shards (={total_shards})")]
    InvalidPartition {
        total_shards: usize,
        shard_index: usize,
    },

    /// Invalid pipeline configuration (e.g., a pooled strategy with zero workers).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The async runtime backing the coroutine-pool strategy could not start.
    #[error("failed to start async runtime")]
    Runtime(#[source] std::io::Error),

    /// A fetch worker thread could not be spawned.
    #[error("failed to spawn worker thread {worker_id}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },

    /// An external reference source failed while building the index.
    #[error("reference source failed")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Per-item failures surfaced through the output stream.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Every fetch attempt for this locator failed; the payload is absent.
    #[error("fetch failed for {url} after {trials} trials")]
    FetchExhausted { url: String, trials: usize },

    /// The payload was fetched but could not be decoded as an image.
    #[error("could not decode image fetched from {url}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    /// Only possible with `strict = true`: a worker completed out of dispatch
    /// order. Positions are counted in iteration order within the pass.
    #[error("out-of-order completion in strict mode: expected position {expected}, got {actual}")]
    OrderingViolation { expected: usize, actual: usize },

    /// The worker pool hung up before the pass was drained. Workers only exit
    /// early when their thread panics, so this should not happen in practice.
    #[error("worker pool disconnected before the pass completed")]
    PoolDisconnected,
}

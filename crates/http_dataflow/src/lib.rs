//! Streams decoded image samples fetched over HTTP into a training loop.
//!
//! A [`ReferenceStore`] names remote images and their labels; a
//! [`Dataflow`] fetches and decodes them lazily with bounded concurrency,
//! per-request retry, deterministic shuffling, and shard partitioning for
//! multi-consumer training. Downloaded bytes are never persisted.
//!
//! ```ignore
//! let store = ReferenceStore::new(references).partition(total_shards, shard_index)?;
//! let config = DataflowConfig::builder()
//!     .shuffle(true)
//!     .seed(42)
//!     .strategy(Strategy::ThreadPool)
//!     .num_threads(16)
//!     .build();
//! let flow = Dataflow::new(store, config)?;
//!
//! for sample in flow.iter()? {
//!     match sample {
//!         Ok(sample) => train_on(sample.image, sample.labels),
//!         Err(err) => tracing::warn!(error = %err, "skipping sample"),
//!     }
//! }
//! ```

pub mod dataflow;
pub mod decoder;
pub mod error;
pub mod fetcher;
pub mod sample;
pub mod sampler;
pub mod store;

pub use dataflow::{Dataflow, DataflowConfig, DataflowConfigBuilder, DataflowIter, Strategy};
pub use error::{DataflowError, SampleError};
pub use fetcher::{AsyncFetcher, FetchConfig, Fetcher};
pub use sample::{DecodedSample, SampleReference};
pub use store::{ReferenceSource, ReferenceStore};

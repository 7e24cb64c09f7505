//! src/store.rs
//!
//! The reference store: an ordered, immutable index of remote samples.
//!
//! The store is the only input the pipeline needs. How it is built (an
//! ImageNet mapping loader, a manifest file, a hard-coded list in a test) is
//! a caller concern, expressed through the `ReferenceSource` capability
//! rather than by subclassing a dataset type.
//!
//! References are held in an `Arc<[_]>` so cloning the store is cheap and
//! sharing it across worker threads is zero-copy.

use std::sync::Arc;

use crate::error::DataflowError;
use crate::sample::SampleReference;

/// A capability that produces an ordered sequence of sample references.
///
/// Implemented by dataset-index builders outside this crate; the pipeline
/// only ever consumes the finished store.
pub trait ReferenceSource<L> {
    fn references(&self) -> Result<Vec<SampleReference<L>>, DataflowError>;
}

/// An ordered, indexable, immutable sequence of sample references.
#[derive(Debug, Clone)]
pub struct ReferenceStore<L> {
    references: Arc<[SampleReference<L>]>,
}

impl<L: Clone> ReferenceStore<L> {
    /// Creates a store from an already-ordered list of references.
    pub fn new(references: Vec<SampleReference<L>>) -> Self {
        Self {
            references: references.into(),
        }
    }

    /// Builds a store by running an external reference source.
    pub fn from_source(source: &dyn ReferenceSource<L>) -> Result<Self, DataflowError> {
        Ok(Self::new(source.references()?))
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SampleReference<L>> {
        self.references.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleReference<L>> {
        self.references.iter()
    }

    /// Restricts the store to the subset owned by one shard of
    /// `total_shards`, selecting positions `shard_index, shard_index +
    /// total_shards, shard_index + 2 * total_shards, ...`.
    ///
    /// Every shard's subset is disjoint from the others and their union is
    /// the full store; labels are preserved verbatim. The original store is
    /// untouched; a new restricted view is returned.
    ///
    /// Partitioning an already-partitioned store strides over the strided
    /// sequence. That is almost never what a caller wants; partition the
    /// original store exactly once per consumer.
    ///
    /// # Errors
    /// `DataflowError::InvalidPartition` when `shard_index >= total_shards`,
    /// raised before any selection occurs.
    pub fn partition(
        &self,
        total_shards: usize,
        shard_index: usize,
    ) -> Result<Self, DataflowError> {
        if shard_index >= total_shards {
            return Err(DataflowError::InvalidPartition {
                total_shards,
                shard_index,
            });
        }

        let selected: Vec<_> = self
            .references
            .iter()
            .skip(shard_index)
            .step_by(total_shards)
            .cloned()
            .collect();
        Ok(Self::new(selected))
    }
}

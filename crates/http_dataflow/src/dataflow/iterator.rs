//! src/dataflow/iterator.rs
//!
//! The lazy output sequence of a pass.
//!
//! `DataflowIter` is what `Dataflow::iter()` returns: a pull-driven iterator
//! of decoded samples with one internal variant per concurrency strategy.
//! Each variant owns everything it needs for the pass, so dropping the
//! iterator mid-pass tears the whole pass down.
//!
//! In every variant the engine, not the decoder, gates absent payloads: a
//! fetch that exhausted its retries surfaces as `SampleError::FetchExhausted`
//! and the decoder only ever sees bytes that were actually retrieved.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use futures::future::join_all;

use super::pool::WorkerPool;
use crate::decoder::decode_image;
use crate::error::SampleError;
use crate::fetcher::{AsyncFetcher, Fetcher};
use crate::sample::{DecodedSample, SampleReference};
use crate::store::ReferenceStore;

/// Dispatch-position plus reference, sent to fetch workers.
pub(crate) type FetchTask<L> = (usize, SampleReference<L>);
/// Completed fetch: dispatch position, reference, payload (absent on failure).
pub(crate) type FetchOutput<L> = (usize, SampleReference<L>, Option<Bytes>);

/// Iterator over the decoded samples of one pass.
///
/// Created by [`Dataflow::iter`](super::Dataflow::iter). Item-level failures
/// come through as `Err` values; the pass itself keeps going.
pub struct DataflowIter<L> {
    pub(crate) inner: IterImpl<L>,
}

pub(crate) enum IterImpl<L> {
    /// Fetch, decode, yield, one index at a time, in input order.
    Sequential {
        order: std::vec::IntoIter<usize>,
        store: ReferenceStore<L>,
        fetcher: Fetcher,
    },

    /// Pipelined OS-thread pool with a bounded buffer.
    ///
    /// Dispatch is consumer-driven: `next()` tops the pool up to
    /// `buffer_size` outstanding tasks before pulling one result, so
    /// completed-but-unconsumed payloads never exceed the buffer and at most
    /// `num_threads` requests run at once. Decode happens here, on the
    /// consumer thread, at pull time.
    Pooled {
        pool: WorkerPool<FetchTask<L>, FetchOutput<L>>,
        order: std::vec::IntoIter<usize>,
        store: ReferenceStore<L>,
        max_trials: usize,
        buffer_size: usize,
        strict: bool,
        in_flight: usize,
        dispatch_seq: usize,
        consume_seq: usize,
    },

    /// Batch-synchronous coroutine pool on a current-thread async runtime.
    ///
    /// Up to `batch_width` fetches are awaited together; the batch's results
    /// are buffered in `ready` and drained before the next batch is
    /// dispatched. Suspension happens only at network and backoff waits.
    Batched {
        runtime: tokio::runtime::Runtime,
        fetcher: AsyncFetcher,
        order: std::vec::IntoIter<usize>,
        store: ReferenceStore<L>,
        batch_width: usize,
        ready: VecDeque<(SampleReference<L>, Option<Bytes>)>,
    },
}

/// Applies the absent-payload gate, then decodes.
fn gate_and_decode<L>(
    reference: SampleReference<L>,
    payload: Option<Bytes>,
    max_trials: usize,
) -> Result<DecodedSample<L>, SampleError> {
    let SampleReference { url, labels } = reference;
    let payload = payload.ok_or_else(|| SampleError::FetchExhausted {
        url: url.clone(),
        trials: max_trials,
    })?;
    let image = decode_image(&payload).map_err(|source| SampleError::Decode { url, source })?;
    Ok(DecodedSample::new(image, labels))
}

impl<L> Iterator for DataflowIter<L>
where
    L: Clone + Send + Sync + 'static,
{
    type Item = Result<DecodedSample<L>, SampleError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterImpl::Sequential {
                order,
                store,
                fetcher,
            } => loop {
                let index = order.next()?;
                let Some(reference) = store.get(index).cloned() else {
                    continue;
                };
                let payload = fetcher.fetch(&reference.url);
                return Some(gate_and_decode(reference, payload, fetcher.max_trials()));
            },

            IterImpl::Pooled {
                pool,
                order,
                store,
                max_trials,
                buffer_size,
                strict,
                in_flight,
                dispatch_seq,
                consume_seq,
            } => {
                // Keep the pool topped up to the buffer bound.
                while *in_flight < *buffer_size {
                    let Some(index) = order.next() else { break };
                    let Some(reference) = store.get(index).cloned() else {
                        continue;
                    };
                    if let Err(e) = pool.dispatch((*dispatch_seq, reference)) {
                        return Some(Err(e));
                    }
                    *dispatch_seq += 1;
                    *in_flight += 1;
                }

                if *in_flight == 0 {
                    return None; // pass exhausted and drained
                }

                let (seq, reference, payload) = match pool.recv() {
                    Ok(output) => output,
                    Err(e) => return Some(Err(e)),
                };
                *in_flight -= 1;

                let expected = *consume_seq;
                *consume_seq += 1;
                if *strict && seq != expected {
                    return Some(Err(SampleError::OrderingViolation {
                        expected,
                        actual: seq,
                    }));
                }

                Some(gate_and_decode(reference, payload, *max_trials))
            }

            IterImpl::Batched {
                runtime,
                fetcher,
                order,
                store,
                batch_width,
                ready,
            } => {
                if ready.is_empty() {
                    let mut batch: Vec<SampleReference<L>> = Vec::with_capacity(*batch_width);
                    while batch.len() < *batch_width {
                        let Some(index) = order.next() else { break };
                        if let Some(reference) = store.get(index).cloned() {
                            batch.push(reference);
                        }
                    }
                    if batch.is_empty() {
                        return None;
                    }

                    let payloads: Vec<Option<Bytes>> = runtime.block_on(async {
                        join_all(batch.iter().map(|reference| fetcher.fetch(&reference.url)))
                            .await
                    });
                    ready.extend(batch.into_iter().zip(payloads));
                }

                let (reference, payload) = ready.pop_front()?;
                Some(gate_and_decode(reference, payload, fetcher.max_trials()))
            }
        }
    }
}

/// Fetch-stage worker body for the pooled strategy. Runs until the task
/// channel disconnects, shutdown is flagged, or the consumer goes away.
pub(crate) fn run_fetch_worker<L>(
    fetcher: Fetcher,
    task_rx: crossbeam_channel::Receiver<FetchTask<L>>,
    output_tx: crossbeam_channel::Sender<FetchOutput<L>>,
    shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>,
) where
    L: Clone + Send + Sync + 'static,
{
    while !shutdown.load(Ordering::Relaxed) {
        let (seq, reference) = match task_rx.recv() {
            Ok(task) => task,
            Err(_) => break,
        };
        let payload = fetcher.fetch(&reference.url);
        if output_tx.send((seq, reference, payload)).is_err() {
            break;
        }
    }
}

//! End-to-end passes under the pipelined thread-pool strategy.

mod common;

use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use common::{png_references, quick_fetch, tiny_png, Reply, TestServer};
use http_dataflow::{Dataflow, DataflowConfig, ReferenceStore, SampleError, Strategy};

fn threaded_config(num_threads: usize, buffer_size: usize) -> DataflowConfig {
    DataflowConfig::builder()
        .strategy(Strategy::ThreadPool)
        .num_threads(num_threads)
        .buffer_size(buffer_size)
        .fetch(quick_fetch(3))
        .build()
}

#[test]
fn delivers_every_sample_exactly_once() {
    let server = TestServer::start();
    let refs = png_references(&server, 12);
    let flow = Dataflow::new(ReferenceStore::new(refs), threaded_config(4, 8)).unwrap();

    let labels: BTreeSet<u8> = flow
        .iter()
        .unwrap()
        .map(|item| item.unwrap().labels[0])
        .collect();

    assert_eq!(labels, (0..12).collect());
    assert_eq!(server.request_count(), 12);
}

#[test]
fn strict_mode_with_one_worker_stays_in_order() {
    let server = TestServer::start();
    let refs = png_references(&server, 6);
    let config = DataflowConfig::builder()
        .strategy(Strategy::ThreadPool)
        .num_threads(1)
        .buffer_size(4)
        .strict(true)
        .fetch(quick_fetch(3))
        .build();
    let flow = Dataflow::new(ReferenceStore::new(refs), config).unwrap();

    let labels: Vec<u8> = flow
        .iter()
        .unwrap()
        .map(|item| item.expect("single worker cannot reorder"))
        .map(|sample| sample.labels[0])
        .collect();

    assert_eq!(labels, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn strict_mode_flags_out_of_order_completion() {
    let server = TestServer::start();
    let mut refs = png_references(&server, 4);
    // The first dispatched fetch finishes long after the other three.
    server.route(
        "/stall.png",
        vec![Reply::Delayed(Duration::from_millis(300), tiny_png(0))],
    );
    refs[0].url = server.url("/stall.png");

    let config = DataflowConfig::builder()
        .strategy(Strategy::ThreadPool)
        .num_threads(4)
        .buffer_size(4)
        .strict(true)
        .fetch(quick_fetch(3))
        .build();
    let flow = Dataflow::new(ReferenceStore::new(refs), config).unwrap();

    let results: Vec<_> = flow.iter().unwrap().collect();
    assert_eq!(results.len(), 4);
    assert!(
        results
            .iter()
            .any(|item| matches!(item, Err(SampleError::OrderingViolation { .. }))),
        "a 300ms stall on the first task should complete out of order"
    );
}

#[test]
fn dispatch_never_runs_ahead_of_the_buffer_bound() {
    let server = TestServer::start();
    let refs = png_references(&server, 30);
    let buffer_size = 4;
    let flow =
        Dataflow::new(ReferenceStore::new(refs), threaded_config(2, buffer_size)).unwrap();

    let mut iter = flow.iter().unwrap();
    let consumed = 3;
    for _ in 0..consumed {
        iter.next().unwrap().unwrap();
    }
    // Give idle workers time to run ahead if dispatch were unbounded.
    thread::sleep(Duration::from_millis(200));

    assert!(
        server.request_count() <= consumed + buffer_size,
        "served {} requests with only {consumed} consumed and a buffer of {buffer_size}",
        server.request_count()
    );

    let remaining = iter.map(|item| item.unwrap()).count();
    assert_eq!(consumed + remaining, 30);
}

#[test]
fn abandoning_the_iterator_releases_the_pool() {
    let server = TestServer::start();
    let refs = png_references(&server, 20);
    let flow = Dataflow::new(ReferenceStore::new(refs), threaded_config(4, 8)).unwrap();

    let mut iter = flow.iter().unwrap();
    iter.next().unwrap().unwrap();
    drop(iter);

    // A fresh pass over the same store still works after the teardown.
    let full: Vec<_> = flow.iter().unwrap().collect();
    assert_eq!(full.len(), 20);
    assert!(full.iter().all(|item| item.is_ok()));
}

#[test]
fn failed_items_do_not_poison_the_pass() {
    let server = TestServer::start();
    let mut refs = png_references(&server, 8);
    server.route("/dead.png", vec![Reply::Status(500)]);
    refs[3].url = server.url("/dead.png");

    let flow = Dataflow::new(ReferenceStore::new(refs), threaded_config(3, 4)).unwrap();
    let results: Vec<_> = flow.iter().unwrap().collect();

    assert_eq!(results.len(), 8);
    let failures = results
        .iter()
        .filter(|item| matches!(item, Err(SampleError::FetchExhausted { .. })))
        .count();
    assert_eq!(failures, 1);
    assert_eq!(results.iter().filter(|item| item.is_ok()).count(), 7);
}

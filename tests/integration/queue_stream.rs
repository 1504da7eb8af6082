//! Blocking-queue sequence tests.
//!
//! These tests verify:
//! - FIFO delivery order is preserved across a producer/consumer handoff
//! - Cancellation of the wait surfaces as `Interrupted`, never as silence
//! - The sequence refuses to split
//! - The decode adapter composes with the queue sequence

#![allow(missing_docs)]

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use corriente::{Decoded, IsolationPolicy, QueueStream, StreamError};
use proptest::prelude::*;
use serde::Deserialize;
use serde_json::json;

#[test]
fn elements_pushed_before_consumption_arrive_in_push_order() {
    let (tx, rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        for n in 0..100u32 {
            tx.send(n).expect("send");
        }
    });
    producer.join().expect("producer");

    let pulled: Vec<u32> = QueueStream::new(rx)
        .take(100)
        .map(|item| item.expect("element"))
        .collect();
    assert_eq!(pulled, (0..100).collect::<Vec<u32>>());
}

#[test]
fn consumer_blocked_on_next_gets_interrupted_on_disconnect() {
    let (tx, rx) = mpsc::channel::<u8>();
    let consumer = thread::spawn(move || QueueStream::new(rx).next());

    // Give the consumer time to actually block on the take.
    thread::sleep(Duration::from_millis(50));
    drop(tx);

    match consumer.join().expect("join") {
        Some(Err(StreamError::Interrupted)) => {}
        other => panic!("expected Interrupted, got {other:?}"),
    }
}

#[test]
fn interleaved_producer_and_consumer_preserve_order() {
    let (tx, rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        for n in 0..50i64 {
            tx.send(n).expect("send");
            if n % 7 == 0 {
                thread::yield_now();
            }
        }
    });

    let pulled: Vec<i64> = QueueStream::new(rx)
        .take(50)
        .map(|item| item.expect("element"))
        .collect();
    producer.join().expect("producer");
    assert_eq!(pulled, (0..50).collect::<Vec<i64>>());
}

#[test]
fn split_requests_are_refused() {
    let (_tx, rx) = mpsc::channel::<u8>();
    let mut stream = QueueStream::new(rx);
    assert!(stream.try_split().is_none());
    assert_eq!(stream.size_hint(), (0, None));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Event {
    kind: String,
}

#[test]
fn decode_adapter_composes_with_the_queue_sequence() {
    let (tx, rx) = mpsc::channel();
    tx.send(json!({"kind": "started"})).expect("send");
    tx.send(json!({"kind": 17})).expect("send");
    tx.send(json!({"kind": "stopped"})).expect("send");
    drop(tx);

    let decoded: Decoded<_, Event> = Decoded::new(QueueStream::new(rx), IsolationPolicy::Lenient);
    let kinds: Vec<String> = decoded
        .take_while(|item| !matches!(item, Err(StreamError::Interrupted)))
        .map(|item| item.expect("decoded").kind)
        .collect();
    assert_eq!(kinds, vec!["started".to_owned(), "stopped".to_owned()]);
}

proptest! {
    #[test]
    fn any_prefix_pushed_by_a_producer_is_pulled_in_order(items in prop::collection::vec(any::<i32>(), 0..64)) {
        let (tx, rx) = mpsc::channel();
        let to_send = items.clone();
        let producer = thread::spawn(move || {
            for item in to_send {
                tx.send(item).expect("send");
            }
        });
        producer.join().expect("producer");

        let pulled: Vec<i32> = QueueStream::new(rx)
            .take(items.len())
            .map(|item| item.expect("element"))
            .collect();
        prop_assert_eq!(pulled, items);
    }
}

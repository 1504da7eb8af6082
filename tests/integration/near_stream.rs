//! Near-query sequence tests.
//!
//! These tests verify:
//! - Ascending distance order with distances in the requested metric
//! - Range and filter restriction of candidates
//! - Decode isolation on the geo path
//! - The close-once guarantee when a geo stream is abandoned

#![allow(missing_docs)]

use std::sync::Arc;

use corriente::{
    Distance, DiscardSink, DocumentSource, GeoPoint, MemoryStore, Metric, NearQuery, Record,
    SourceOptions, StreamError,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct Cafe {
    name: String,
}

#[derive(Default)]
struct CountingSink {
    discarded: Mutex<usize>,
}

impl DiscardSink for CountingSink {
    fn record_discarded(&self, _record: &Record, _cause: &StreamError) {
        *self.discarded.lock() += 1;
    }
}

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_all(
        "cafes",
        [
            json!({"name": "espresso", "open": true, "location": [0.02, 0.0]}),
            json!({"name": "drip", "open": true, "location": [0.005, 0.0]}),
            json!({"name": "roastery", "open": false, "location": [0.01, 0.0]}),
            json!({"name": "antipodal", "open": true, "location": [179.0, 0.0]}),
        ],
    );
    store
}

fn around_origin(max: Distance) -> NearQuery {
    NearQuery::new(GeoPoint::new(0.0, 0.0), max)
}

#[test]
fn yields_ascending_distances_in_the_requested_metric() {
    let source = DocumentSource::new(seeded());
    let near = around_origin(Distance::new(10.0, Metric::Kilometers));

    let results: Vec<(String, Distance)> = source
        .stream_near::<Cafe>("cafes", &near)
        .expect("open")
        .map(|pair| {
            let pair = pair.expect("pair");
            (pair.record.name, pair.distance)
        })
        .collect();

    let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["drip", "roastery", "espresso"]);

    for window in results.windows(2) {
        assert!(window[0].1.value <= window[1].1.value, "ascending order");
    }
    assert!(results
        .iter()
        .all(|(_, distance)| distance.metric == Metric::Kilometers));
    // 0.02 degrees of longitude on the equator is roughly 2.2 km.
    let farthest = &results[2].1;
    assert!(farthest.value > 2.0 && farthest.value < 2.5);
}

#[test]
fn filter_restricts_candidates() {
    let source = DocumentSource::new(seeded());
    let near = around_origin(Distance::new(10.0, Metric::Kilometers))
        .filtered(json!({"open": true}));

    let names: Vec<String> = source
        .stream_near::<Cafe>("cafes", &near)
        .expect("open")
        .map(|pair| pair.expect("pair").record.name)
        .collect();
    assert_eq!(names, vec!["drip".to_owned(), "espresso".to_owned()]);
}

#[test]
fn lenient_mode_drops_undecodable_candidates() {
    let store = MemoryStore::new();
    store.insert_all(
        "cafes",
        [
            json!({"name": "good", "location": [0.001, 0.0]}),
            json!({"name": 42, "location": [0.002, 0.0]}),
            json!({"name": "also good", "location": [0.003, 0.0]}),
        ],
    );
    let sink = Arc::new(CountingSink::default());
    let source = DocumentSource::with_options(
        store,
        SourceOptions::lenient().with_sink(sink.clone()),
    );
    let near = around_origin(Distance::new(1.0, Metric::Kilometers));

    let names: Vec<String> = source
        .stream_near::<Cafe>("cafes", &near)
        .expect("open")
        .map(|pair| pair.expect("pair").record.name)
        .collect();
    assert_eq!(names, vec!["good".to_owned(), "also good".to_owned()]);
    assert_eq!(*sink.discarded.lock(), 1);
}

#[test]
fn strict_mode_fails_on_an_undecodable_candidate() {
    let store = MemoryStore::new();
    store.insert_all(
        "cafes",
        [
            json!({"name": "good", "location": [0.001, 0.0]}),
            json!({"name": 42, "location": [0.002, 0.0]}),
        ],
    );
    let stats = store.stats();
    let source = DocumentSource::new(store);
    let near = around_origin(Distance::new(1.0, Metric::Kilometers));

    let mut stream = source.stream_near::<Cafe>("cafes", &near).expect("open");
    assert!(stream.try_next().expect("first").is_some());
    let err = stream.try_next().expect_err("second fails");
    assert!(err.is_conversion());
    assert_eq!(stats.closes(), 1, "failure released the cursor");
}

#[test]
fn abandoning_a_geo_stream_closes_exactly_once() {
    let store = seeded();
    let stats = store.stats();
    let source = DocumentSource::new(store);
    let near = around_origin(Distance::new(10.0, Metric::Kilometers));
    {
        let mut stream = source.stream_near::<Cafe>("cafes", &near).expect("open");
        assert!(stream.try_next().expect("one pull").is_some());
    }
    assert_eq!(stats.closes(), 1);
}

#[test]
fn pulls_after_geo_exhaustion_fail_with_illegal_state() {
    let source = DocumentSource::new(seeded());
    let near = around_origin(Distance::new(10.0, Metric::Kilometers));
    let mut stream = source.stream_near::<Cafe>("cafes", &near).expect("open");
    while stream.try_next().expect("drain").is_some() {}

    let err = stream.try_next().expect_err("past the end");
    assert!(matches!(err, StreamError::IllegalState("exhausted")));
}

//! Instrumented in-memory implementation of the store traits.
//!
//! Backs the integration tests and doubles as a reference for what a real
//! driver binding must provide. Filters are matched by field equality, sort
//! runs before skip and limit regardless of the order the modifiers were
//! applied in (server semantics), and every fork and close is counted.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use geo::{Distance as _, Haversine, Point};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Result, StreamError};
use crate::geo::{Distance, NearQuery};
use crate::query::{Filter, Query, SortDirection};
use crate::store::{NearCursor, RawCursor, Record, RecordStore};

/// Counters and journal shared by all cursors of one [`MemoryStore`].
#[derive(Debug, Default)]
pub struct StoreStats {
    forks: AtomicUsize,
    closes: AtomicUsize,
    journal: Mutex<Vec<String>>,
}

impl StoreStats {
    /// Number of `fork` calls across all cursors.
    pub fn forks(&self) -> usize {
        self.forks.load(AtomicOrdering::Relaxed)
    }

    /// Number of `close` calls across all cursors.
    pub fn closes(&self) -> usize {
        self.closes.load(AtomicOrdering::Relaxed)
    }

    /// Every cursor operation, in call order.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    fn log(&self, op: String) {
        self.journal.lock().push(op);
    }
}

/// In-memory record store with per-cursor instrumentation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Vec<Record>>>,
    fail_fetch: Mutex<BTreeMap<String, (usize, String)>>,
    stats: Arc<StoreStats>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record to `collection`, creating it if needed.
    pub fn insert(&self, collection: &str, record: Record) {
        self.collections
            .lock()
            .entry(collection.to_owned())
            .or_default()
            .push(record);
    }

    /// Appends several records to `collection` in iteration order.
    pub fn insert_all<I>(&self, collection: &str, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        let mut collections = self.collections.lock();
        let entry = collections.entry(collection.to_owned()).or_default();
        entry.extend(records);
    }

    /// Makes cursors over `collection` fail when fetching record `at`
    /// (0-indexed, counted after modifiers).
    pub fn inject_fetch_failure(&self, collection: &str, at: usize, message: &str) {
        self.fail_fetch
            .lock()
            .insert(collection.to_owned(), (at, message.to_owned()));
    }

    /// Shared instrumentation handle; stays valid after cursors are consumed.
    pub fn stats(&self) -> Arc<StoreStats> {
        Arc::clone(&self.stats)
    }
}

impl RecordStore for MemoryStore {
    type Cursor = MemoryCursor;
    type Near = MemoryNearCursor;

    fn find(&self, collection: &str, query: &Query) -> Result<MemoryCursor> {
        let records = self.snapshot(collection, Some(query.filter()));
        let fail_at = self.fail_fetch.lock().get(collection).cloned();
        Ok(MemoryCursor {
            records,
            skip: 0,
            limit: None,
            sort: Vec::new(),
            projection: Vec::new(),
            fail_at,
            pos: 0,
            prepared: false,
            closed: false,
            stats: Arc::clone(&self.stats),
        })
    }

    fn find_near(&self, collection: &str, near: &NearQuery) -> Result<MemoryNearCursor> {
        let metric = near.metric();
        let center = Point::new(near.center().lng, near.center().lat);
        let max_meters = near.max_distance().in_meters();

        let mut pairs: Vec<(Record, f64)> = self
            .snapshot(collection, near.filter())
            .into_iter()
            .filter_map(|record| {
                let point = record_point(&record)?;
                let meters = Haversine.distance(center, point);
                (meters <= max_meters).then_some((record, meters))
            })
            .collect();
        pairs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        Ok(MemoryNearCursor {
            pairs: pairs
                .into_iter()
                .map(|(record, meters)| (record, Distance::from_meters(meters, metric)))
                .collect(),
            pos: 0,
            closed: false,
            stats: Arc::clone(&self.stats),
        })
    }
}

impl MemoryStore {
    fn snapshot(&self, collection: &str, filter: Option<&Filter>) -> Vec<Record> {
        let collections = self.collections.lock();
        let records = collections.get(collection).cloned().unwrap_or_default();
        match filter {
            None => records,
            Some(filter) => records
                .into_iter()
                .filter(|record| matches(filter, record))
                .collect(),
        }
    }
}

/// Field-equality filter matching.
///
/// `null` or an empty object matches everything; an object matches records
/// carrying every listed field with an equal value; any other filter shape
/// matches nothing.
fn matches(filter: &Filter, record: &Record) -> bool {
    match filter {
        Value::Null => true,
        Value::Object(fields) => fields
            .iter()
            .all(|(key, expected)| record.get(key) == Some(expected)),
        _ => false,
    }
}

fn record_point(record: &Record) -> Option<Point<f64>> {
    let coords = record.get("location")?.as_array()?;
    match coords.as_slice() {
        [lng, lat] => Some(Point::new(lng.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

/// Total order over JSON values for sort specifications.
///
/// Null < booleans < numbers < strings; other shapes compare equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Cursor over one collection snapshot.
///
/// Modifiers accumulate until the first fetch, at which point the snapshot is
/// materialised with server semantics: sort first, then skip, then limit,
/// then projection.
#[derive(Debug)]
pub struct MemoryCursor {
    records: Vec<Record>,
    skip: u64,
    limit: Option<u64>,
    sort: Vec<(String, SortDirection)>,
    projection: Vec<String>,
    fail_at: Option<(usize, String)>,
    pos: usize,
    prepared: bool,
    closed: bool,
    stats: Arc<StoreStats>,
}

impl MemoryCursor {
    fn materialize(&mut self) {
        if self.prepared {
            return;
        }
        if !self.sort.is_empty() {
            let spec = self.sort.clone();
            self.records.sort_by(|a, b| {
                for (field, direction) in &spec {
                    let left = a.get(field).unwrap_or(&Value::Null);
                    let right = b.get(field).unwrap_or(&Value::Null);
                    let ordering = match direction {
                        SortDirection::Ascending => compare_values(left, right),
                        SortDirection::Descending => compare_values(right, left),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        if skip > 0 {
            self.records.drain(..skip.min(self.records.len()));
        }
        if let Some(limit) = self.limit {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            self.records.truncate(limit);
        }
        if !self.projection.is_empty() {
            let projection = self.projection.clone();
            for record in &mut self.records {
                if let Value::Object(fields) = record {
                    fields.retain(|key, _| projection.iter().any(|f| f == key));
                }
            }
        }
        self.prepared = true;
    }
}

impl RawCursor for MemoryCursor {
    fn fetch_next(&mut self) -> Result<Option<Record>> {
        if self.closed {
            return Err(StreamError::Resource("fetch on closed cursor".to_owned()));
        }
        self.materialize();
        if let Some((at, message)) = &self.fail_at {
            if self.pos == *at {
                return Err(StreamError::Resource(message.clone()));
            }
        }
        if self.pos >= self.records.len() {
            return Ok(None);
        }
        let record = self.records[self.pos].clone();
        self.pos += 1;
        Ok(Some(record))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.stats.closes.fetch_add(1, AtomicOrdering::Relaxed);
        self.stats.log("close".to_owned());
        Ok(())
    }

    fn fork(&self) -> Result<Self> {
        self.stats.forks.fetch_add(1, AtomicOrdering::Relaxed);
        self.stats.log("fork".to_owned());
        Ok(Self {
            records: self.records.clone(),
            skip: self.skip,
            limit: self.limit,
            sort: self.sort.clone(),
            projection: self.projection.clone(),
            fail_at: self.fail_at.clone(),
            pos: 0,
            prepared: false,
            closed: false,
            stats: Arc::clone(&self.stats),
        })
    }

    fn apply_skip(mut self, skip: u64) -> Result<Self> {
        self.stats.log(format!("skip({skip})"));
        self.skip = skip;
        Ok(self)
    }

    fn apply_limit(mut self, limit: u64) -> Result<Self> {
        self.stats.log(format!("limit({limit})"));
        self.limit = Some(limit);
        Ok(self)
    }

    fn apply_sort(mut self, sort: &[(String, SortDirection)]) -> Result<Self> {
        let spec: Vec<String> = sort
            .iter()
            .map(|(field, direction)| {
                let tag = match direction {
                    SortDirection::Ascending => "asc",
                    SortDirection::Descending => "desc",
                };
                format!("{field} {tag}")
            })
            .collect();
        self.stats.log(format!("sort({})", spec.join(", ")));
        self.sort = sort.to_vec();
        Ok(self)
    }

    fn apply_hint(self, hint: &str) -> Result<Self> {
        self.stats.log(format!("hint({hint})"));
        Ok(self)
    }

    fn apply_meta(self, key: &str, value: &Value) -> Result<Self> {
        self.stats.log(format!("meta({key}={value})"));
        Ok(self)
    }

    fn apply_projection(mut self, fields: &[String]) -> Result<Self> {
        self.stats.log(format!("projection({})", fields.join(", ")));
        self.projection = fields.to_vec();
        Ok(self)
    }
}

/// Distance-ordered cursor produced by [`MemoryStore::find_near`].
#[derive(Debug)]
pub struct MemoryNearCursor {
    pairs: Vec<(Record, Distance)>,
    pos: usize,
    closed: bool,
    stats: Arc<StoreStats>,
}

impl NearCursor for MemoryNearCursor {
    fn fetch_next(&mut self) -> Result<Option<(Record, Distance)>> {
        if self.closed {
            return Err(StreamError::Resource("fetch on closed cursor".to_owned()));
        }
        if self.pos >= self.pairs.len() {
            return Ok(None);
        }
        let pair = self.pairs[self.pos].clone();
        self.pos += 1;
        Ok(Some(pair))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.stats.closes.fetch_add(1, AtomicOrdering::Relaxed);
        self.stats.log("close".to_owned());
        Ok(())
    }
}

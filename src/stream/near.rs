//! Distance-ordered sequence over a near-query cursor.
//!
//! Same ownership and close-once lifecycle as the plain cursor stream, but
//! elements arrive paired with their distance from the reference point, in
//! ascending distance order. No modifiers are applied on this path.

use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Result, StreamError};
use crate::geo::Distance;
use crate::store::NearCursor;
use crate::stream::convert::{self, DiscardSink, IsolationPolicy};
use crate::stream::Lifecycle;

/// One element of a near stream: the decoded record and its distance from
/// the query's reference point.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoRecord<T> {
    /// The decoded record.
    pub record: T,
    /// Distance from the reference point, in the query's metric.
    pub distance: Distance,
}

/// Lazy sequence of [`GeoRecord`]s in ascending distance order.
pub struct NearStream<G: NearCursor, T> {
    state: Lifecycle<G>,
    policy: IsolationPolicy,
    sink: Arc<dyn DiscardSink>,
    _marker: PhantomData<fn() -> T>,
}

impl<G: NearCursor, T: DeserializeOwned> NearStream<G, T> {
    pub(crate) fn open(cursor: G, policy: IsolationPolicy, sink: Arc<dyn DiscardSink>) -> Self {
        Self {
            state: Lifecycle::Active(cursor),
            policy,
            sink,
            _marker: PhantomData,
        }
    }

    /// Pulls the next record/distance pair.
    ///
    /// Behaves like [`CursorStream::try_next`](crate::stream::CursorStream::try_next):
    /// `Ok(None)` once at exhaustion, `IllegalState` afterwards, and the
    /// cursor is released on every terminal transition.
    pub fn try_next(&mut self) -> Result<Option<GeoRecord<T>>> {
        loop {
            let cursor = match &mut self.state {
                Lifecycle::Active(cursor) => cursor,
                terminal => return Err(StreamError::IllegalState(terminal.terminal_name())),
            };
            match cursor.fetch_next() {
                Ok(Some((record, distance))) => {
                    match convert::resolve(&record, self.policy, &*self.sink) {
                        Ok(Some(value)) => {
                            return Ok(Some(GeoRecord {
                                record: value,
                                distance,
                            }))
                        }
                        Ok(None) => continue,
                        Err(err) => {
                            self.finish(Lifecycle::Failed);
                            return Err(err);
                        }
                    }
                }
                Ok(None) => {
                    self.finish(Lifecycle::Exhausted);
                    return Ok(None);
                }
                Err(err) => {
                    self.finish(Lifecycle::Failed);
                    return Err(err);
                }
            }
        }
    }
}

impl<G: NearCursor, T> NearStream<G, T> {
    /// Releases the cursor early. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if matches!(self.state, Lifecycle::Active(_)) {
            self.finish(Lifecycle::Closed);
        }
        Ok(())
    }

    fn finish(&mut self, next: Lifecycle<G>) {
        if let Lifecycle::Active(mut cursor) = mem::replace(&mut self.state, next) {
            if let Err(err) = cursor.close() {
                warn!(error = %err, "stream.near.close_failed");
            }
        }
    }
}

impl<G: NearCursor, T: DeserializeOwned> Iterator for NearStream<G, T> {
    type Item = Result<GeoRecord<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

impl<G: NearCursor, T> Drop for NearStream<G, T> {
    fn drop(&mut self) {
        self.finish(Lifecycle::Closed);
    }
}

//! Server-side cursor as a lazy, bounded sequence.
//!
//! The stream owns its cursor exclusively from creation to close. Modifiers
//! are applied exactly once, before the first pull, and only when at least
//! one is set; the close happens exactly once on every exit path — natural
//! exhaustion, early abandonment, fatal failure, or drop.

use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Result, StreamError};
use crate::query::Query;
use crate::store::RawCursor;
use crate::stream::convert::{self, DiscardSink, IsolationPolicy};
use crate::stream::Lifecycle;

/// Applies the query's modifiers to a fresh cursor handle.
///
/// An unmodified query uses the handle as-is. Otherwise a private fork is
/// mutated, in the fixed order skip, limit, sort, hint, meta, projection:
/// some engines reject a hint once a sort is set, and skip/limit must be
/// established before sort to avoid a re-scan.
fn prepare<C: RawCursor>(cursor: C, query: &Query) -> Result<C> {
    if !query.has_modifiers() {
        return Ok(cursor);
    }
    debug!(
        skip = query.skip_count(),
        limit = ?query.limit_count(),
        sorted = !query.sort_spec().is_empty(),
        "stream.cursor.prepare"
    );
    let mut prepared = cursor.fork()?;
    if query.skip_count() > 0 {
        prepared = prepared.apply_skip(query.skip_count())?;
    }
    if let Some(limit) = query.limit_count() {
        prepared = prepared.apply_limit(limit)?;
    }
    if !query.sort_spec().is_empty() {
        prepared = prepared.apply_sort(query.sort_spec())?;
    }
    if let Some(hint) = query.hint_name() {
        prepared = prepared.apply_hint(hint)?;
    }
    for (key, value) in query.meta_entries() {
        prepared = prepared.apply_meta(key, value)?;
    }
    if !query.projection().is_empty() {
        prepared = prepared.apply_projection(query.projection())?;
    }
    Ok(prepared)
}

/// Lazy sequence of typed records over a server-side cursor.
///
/// The primary pull API is [`try_next`](CursorStream::try_next); the
/// `Iterator` impl delegates to it. Natural exhaustion yields one `None`
/// (`Ok(None)` from `try_next`), after which any further pull fails with
/// [`StreamError::IllegalState`] instead of silently yielding nothing.
pub struct CursorStream<C: RawCursor, T> {
    state: Lifecycle<C>,
    policy: IsolationPolicy,
    sink: Arc<dyn DiscardSink>,
    _marker: PhantomData<fn() -> T>,
}

impl<C: RawCursor, T: DeserializeOwned> CursorStream<C, T> {
    pub(crate) fn open(
        cursor: C,
        query: &Query,
        policy: IsolationPolicy,
        sink: Arc<dyn DiscardSink>,
    ) -> Result<Self> {
        let cursor = prepare(cursor, query)?;
        Ok(Self {
            state: Lifecycle::Active(cursor),
            policy,
            sink,
            _marker: PhantomData,
        })
    }

    /// Pulls the next record.
    ///
    /// `Ok(None)` signals natural exhaustion and releases the cursor; after
    /// that, and after [`close`](CursorStream::close), every call fails with
    /// `IllegalState`. A fatal failure also releases the cursor before
    /// propagating.
    pub fn try_next(&mut self) -> Result<Option<T>> {
        loop {
            let cursor = match &mut self.state {
                Lifecycle::Active(cursor) => cursor,
                terminal => return Err(StreamError::IllegalState(terminal.terminal_name())),
            };
            match cursor.fetch_next() {
                Ok(Some(record)) => {
                    match convert::resolve(&record, self.policy, &*self.sink) {
                        Ok(Some(value)) => return Ok(Some(value)),
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

impl<C: RawCursor, T> CursorStream<C, T> {
    /// Releases the cursor early. Idempotent; pulls after this fail with
    /// `IllegalState`.
    pub fn close(&mut self) -> Result<()> {
        if matches!(self.state, Lifecycle::Active(_)) {
            self.finish(Lifecycle::Closed);
        }
        Ok(())
    }

    /// Whether the sequence has reached a terminal state.
    pub fn is_terminated(&self) -> bool {
        !matches!(self.state, Lifecycle::Active(_))
    }

    /// Moves into `next` and closes the cursor if it was still open.
    ///
    /// This is the single close point; the state transition makes a second
    /// close impossible.
    fn finish(&mut self, next: Lifecycle<C>) {
        if let Lifecycle::Active(mut cursor) = mem::replace(&mut self.state, next) {
            if let Err(err) = cursor.close() {
                warn!(error = %err, "stream.cursor.close_failed");
            }
        }
    }
}

impl<C: RawCursor, T: DeserializeOwned> Iterator for CursorStream<C, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }

    /// Bounded but of unknown size.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

impl<C: RawCursor, T> Drop for CursorStream<C, T> {
    fn drop(&mut self) {
        self.finish(Lifecycle::Closed);
    }
}

/// Cloneable handle for consuming one cursor sequence from several threads.
///
/// Pulls serialize through a mutex, so every record is delivered exactly
/// once and the close-once guarantee is unchanged. The store client remains
/// responsible for the thread-safety of the cursor itself.
pub struct SharedCursorStream<C: RawCursor, T> {
    inner: Arc<Mutex<CursorStream<C, T>>>,
}

impl<C: RawCursor, T> Clone for SharedCursorStream<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: RawCursor, T: DeserializeOwned> SharedCursorStream<C, T> {
    pub(crate) fn new(stream: CursorStream<C, T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
        }
    }

    /// Pulls the next record; see [`CursorStream::try_next`].
    pub fn try_next(&self) -> Result<Option<T>> {
        self.inner.lock().try_next()
    }

    /// Releases the cursor early; see [`CursorStream::close`].
    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }
}

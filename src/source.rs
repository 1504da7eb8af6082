//! Entry point tying a store client to the streaming adapters.
//!
//! Everything the adapters need — the client handle, the isolation policy,
//! the discard sink — is passed at construction. There are no process-wide
//! defaults to mutate.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::Result;
use crate::geo::NearQuery;
use crate::query::Query;
use crate::store::RecordStore;
use crate::stream::convert::{DiscardSink, IsolationPolicy, TracingSink};
use crate::stream::cursor::{CursorStream, SharedCursorStream};
use crate::stream::near::NearStream;

/// Construction-time configuration for a [`DocumentSource`].
#[derive(Clone)]
pub struct SourceOptions {
    /// What a per-record decode failure does to a sequence.
    pub policy: IsolationPolicy,
    /// Observer for leniently discarded records.
    pub sink: Arc<dyn DiscardSink>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            policy: IsolationPolicy::Strict,
            sink: Arc::new(TracingSink),
        }
    }
}

impl fmt::Debug for SourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceOptions")
            .field("policy", &self.policy)
            .finish()
    }
}

impl SourceOptions {
    /// Options with the lenient policy and the default tracing sink.
    pub fn lenient() -> Self {
        Self {
            policy: IsolationPolicy::Lenient,
            ..Self::default()
        }
    }

    /// Replaces the discard sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiscardSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// Opens lazy record streams over one data-store client.
pub struct DocumentSource<S: RecordStore> {
    store: S,
    options: SourceOptions,
}

impl<S: RecordStore> DocumentSource<S> {
    /// Wraps `store` with the default (strict) options.
    pub fn new(store: S) -> Self {
        Self::with_options(store, SourceOptions::default())
    }

    /// Wraps `store` with explicit options.
    pub fn with_options(store: S, options: SourceOptions) -> Self {
        info!(policy = ?options.policy, "source.initialized");
        Self { store, options }
    }

    /// The wrapped store client.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Opens a sequential stream of `T` over records matching `query`.
    pub fn stream<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<CursorStream<S::Cursor, T>> {
        let cursor = self.store.find(collection, query)?;
        CursorStream::open(
            cursor,
            query,
            self.options.policy,
            Arc::clone(&self.options.sink),
        )
    }

    /// Opens a stream shareable across threads; pulls are serialized and
    /// each record is delivered exactly once.
    pub fn stream_shared<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<SharedCursorStream<S::Cursor, T>> {
        Ok(SharedCursorStream::new(self.stream(collection, query)?))
    }

    /// Opens a distance-ordered stream around the near query's center.
    pub fn stream_near<T: DeserializeOwned>(
        &self,
        collection: &str,
        near: &NearQuery,
    ) -> Result<NearStream<S::Near, T>> {
        let cursor = self.store.find_near(collection, near)?;
        Ok(NearStream::open(
            cursor,
            self.options.policy,
            Arc::clone(&self.options.sink),
        ))
    }
}

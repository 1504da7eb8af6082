//! Typed decoding of raw records, with explicit failure isolation.
//!
//! Silently dropping undecodable data is a policy decision, so it must be
//! opted into: the default policy is strict, surfacing corruption instead of
//! hiding it. The lenient policy reproduces the legacy behaviour of logging
//! the failure and filtering the record out.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Result, StreamError};
use crate::store::Record;

/// What a per-record decode failure does to the sequence.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IsolationPolicy {
    /// The failure propagates and terminates iteration.
    #[default]
    Strict,
    /// The failure is reported to the discard sink and the record is
    /// skipped; iteration continues.
    Lenient,
}

/// Observer for records discarded under the lenient policy.
pub trait DiscardSink: Send + Sync {
    /// Called once per discarded record, with the decode failure.
    fn record_discarded(&self, record: &Record, cause: &StreamError);
}

/// Default sink: one warning event per discarded record.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiscardSink for TracingSink {
    fn record_discarded(&self, record: &Record, cause: &StreamError) {
        warn!(error = %cause, record = %record, "stream.decode.discarded");
    }
}

/// Decodes one record into `T`.
pub fn decode<T: DeserializeOwned>(record: &Record) -> Result<T> {
    T::deserialize(record).map_err(|source| StreamError::Conversion {
        target: std::any::type_name::<T>(),
        source,
    })
}

/// Decodes under `policy`: `Ok(Some)` on success, `Ok(None)` when the record
/// was discarded leniently, `Err` when the failure is fatal.
pub(crate) fn resolve<T: DeserializeOwned>(
    record: &Record,
    policy: IsolationPolicy,
    sink: &dyn DiscardSink,
) -> Result<Option<T>> {
    match decode(record) {
        Ok(value) => Ok(Some(value)),
        Err(err) => match policy {
            IsolationPolicy::Strict => Err(err),
            IsolationPolicy::Lenient => {
                sink.record_discarded(record, &err);
                Ok(None)
            }
        },
    }
}

/// Iterator adapter applying the decode step to any raw-record sequence.
///
/// Composes with [`QueueStream`](crate::stream::QueueStream) or any other
/// `Iterator<Item = Result<Record>>`. Upstream errors pass through untouched.
pub struct Decoded<I, T> {
    inner: I,
    policy: IsolationPolicy,
    sink: Arc<dyn DiscardSink>,
    _marker: PhantomData<fn() -> T>,
}

impl<I, T> Decoded<I, T> {
    /// Wraps `inner` with the given policy and the default tracing sink.
    pub fn new(inner: I, policy: IsolationPolicy) -> Self {
        Self::with_sink(inner, policy, Arc::new(TracingSink))
    }

    /// Wraps `inner` with an explicit discard sink.
    pub fn with_sink(inner: I, policy: IsolationPolicy, sink: Arc<dyn DiscardSink>) -> Self {
        Self {
            inner,
            policy,
            sink,
            _marker: PhantomData,
        }
    }
}

impl<I, T> Iterator for Decoded<I, T>
where
    I: Iterator<Item = Result<Record>>,
    T: DeserializeOwned,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.inner.next()? {
                Ok(record) => record,
                Err(err) => return Some(Err(err)),
            };
            match resolve(&record, self.policy, &*self.sink) {
                Ok(Some(value)) => return Some(Ok(value)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

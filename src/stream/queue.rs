//! Blocking queue as a lazy, unbounded sequence.
//!
//! Creation has zero side effects; the first element leaves the queue on the
//! first pull. The sequence is ordered (FIFO delivery order) and must not be
//! split for concurrent consumption, because taking the next element has an
//! observable side effect on the shared queue.

use std::sync::mpsc;

use crate::error::{Result, StreamError};

/// A thread-safe FIFO exposing a blocking take.
///
/// `take` suspends the calling thread until an element is available or the
/// wait is cancelled, in which case it fails with
/// [`StreamError::Interrupted`] rather than fabricating an element.
pub trait BlockingSource {
    /// Element type delivered by the queue.
    type Item;

    /// Blocks until the next element arrives.
    fn take(&self) -> Result<Self::Item>;
}

/// Cancellation is disconnection: once every sender is gone, a blocked or
/// subsequent `take` fails with `Interrupted`.
impl<T> BlockingSource for mpsc::Receiver<T> {
    type Item = T;

    fn take(&self) -> Result<T> {
        self.recv().map_err(|_| StreamError::Interrupted)
    }
}

/// Lazy sequence over a [`BlockingSource`].
///
/// The sequence is logically infinite: `next` never returns `None` while the
/// source is alive, and a cancelled wait yields `Some(Err(Interrupted))`.
/// After that error the iterator is fused and ends.
pub struct QueueStream<S> {
    source: S,
    done: bool,
}

impl<S: BlockingSource> QueueStream<S> {
    /// Wraps `source` without dequeuing anything.
    pub fn new(source: S) -> Self {
        Self {
            source,
            done: false,
        }
    }

    /// Always `None`: the sequence cannot be partitioned for parallel
    /// consumption.
    pub fn try_split(&mut self) -> Option<Self> {
        None
    }
}

impl<S: BlockingSource> Iterator for QueueStream<S> {
    type Item = Result<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.take() {
            Ok(item) => Some(Ok(item)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }

    /// Unknown and unbounded; consumers must not preallocate from this.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

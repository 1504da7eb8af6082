//! Lazy, pull-driven sequences over blocking and cursor-backed sources.
//!
//! Everything here executes on the calling thread; there is no internal
//! thread pool. The queue adapter suspends the caller until an element
//! arrives, the cursor adapters suspend inside the collaborator's fetch.

/// Per-record decoding with a configurable isolation policy.
pub mod convert;

/// Cursor-backed sequences with modifier application and scoped close.
pub mod cursor;

/// Distance-ordered sequences over near-query cursors.
pub mod near;

/// Blocking-FIFO-backed unbounded sequences.
pub mod queue;

pub use convert::{Decoded, DiscardSink, IsolationPolicy, TracingSink};
pub use cursor::{CursorStream, SharedCursorStream};
pub use near::{GeoRecord, NearStream};
pub use queue::{BlockingSource, QueueStream};

/// Where a cursor-backed sequence is in its life.
///
/// All terminal states release the underlying cursor exactly once; a pull in
/// a terminal state is an error, never a silent empty result.
pub(crate) enum Lifecycle<C> {
    /// Cursor open, pulls allowed.
    Active(C),
    /// Cursor ran out of records and was released.
    Exhausted,
    /// Closed early by the consumer and released.
    Closed,
    /// A fatal error terminated iteration; cursor released.
    Failed,
}

impl<C> Lifecycle<C> {
    /// Name of the terminal state, for `IllegalState` messages.
    pub(crate) fn terminal_name(&self) -> &'static str {
        match self {
            Lifecycle::Active(_) => "active",
            Lifecycle::Exhausted => "exhausted",
            Lifecycle::Closed => "closed",
            Lifecycle::Failed => "failed",
        }
    }
}

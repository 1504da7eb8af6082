//! Seam between the streaming adapters and the data-store client.
//!
//! The adapters never talk to a concrete database. They consume these traits:
//! [`RecordStore`] opens cursors, [`RawCursor`] is a positioned server-side
//! result set with builder-style modifier application, and [`NearCursor`] is
//! its distance-ordered counterpart. A cursor handle is exclusively owned by
//! the stream that wraps it from creation until close.

use serde_json::Value;

use crate::error::Result;
use crate::geo::{Distance, NearQuery};
use crate::query::{Query, SortDirection};

/// In-memory reference implementation of the store traits.
///
/// Instrumented with fork/close counters and a per-cursor operation journal
/// so the adapter's no-copy and close-once invariants are observable.
pub mod memory;

/// A raw record as returned by the data-store collaborator.
pub type Record = Value;

/// A server-side cursor: a positioned, in-progress query result set.
///
/// A freshly opened cursor is lazy; no server-side resource exists until the
/// first `fetch_next`. Modifier application consumes and returns the handle,
/// mirroring driver cursors whose setters return the cursor itself.
pub trait RawCursor: Sized {
    /// Pulls the next record, or `None` once the cursor is exhausted.
    fn fetch_next(&mut self) -> Result<Option<Record>>;

    /// Releases the cursor.
    fn close(&mut self) -> Result<()>;

    /// An independently positioned private copy of this cursor.
    ///
    /// Forking happens before the first pull, so this is a client-side copy;
    /// the source handle may be discarded without a close.
    fn fork(&self) -> Result<Self>;

    /// Skips the first `skip` records.
    fn apply_skip(self, skip: u64) -> Result<Self>;

    /// Caps the result set at `limit` records.
    fn apply_limit(self, limit: u64) -> Result<Self>;

    /// Declares the sort order for the whole cursor.
    fn apply_sort(self, sort: &[(String, SortDirection)]) -> Result<Self>;

    /// Names the index the engine should use.
    fn apply_hint(self, hint: &str) -> Result<Self>;

    /// Attaches one driver-specific execution hint.
    fn apply_meta(self, key: &str, value: &Value) -> Result<Self>;

    /// Restricts returned records to the named fields.
    fn apply_projection(self, fields: &[String]) -> Result<Self>;
}

/// A cursor over (record, distance) pairs in ascending distance order.
///
/// Near cursors accept no modifiers; distance order is implicit and
/// pagination on this path is unsupported.
pub trait NearCursor {
    /// Pulls the next pair, or `None` once the cursor is exhausted.
    fn fetch_next(&mut self) -> Result<Option<(Record, Distance)>>;

    /// Releases the cursor.
    fn close(&mut self) -> Result<()>;
}

/// The data-store client the adapters stream from.
pub trait RecordStore {
    /// Cursor type produced by [`RecordStore::find`].
    type Cursor: RawCursor;
    /// Cursor type produced by [`RecordStore::find_near`].
    type Near: NearCursor;

    /// Opens a cursor over records matching `query` in `collection`.
    ///
    /// Only the filter participates here; modifiers are applied by the
    /// adapter, on the handle, before the first pull.
    fn find(&self, collection: &str, query: &Query) -> Result<Self::Cursor>;

    /// Opens a distance-ordered cursor around the near query's center.
    fn find_near(&self, collection: &str, near: &NearQuery) -> Result<Self::Near>;
}

pub use memory::MemoryStore;

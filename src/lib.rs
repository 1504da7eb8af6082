//! Lazy record streams over blocking and cursor-backed data sources.
//!
//! Two structurally similar adapters form the core: one turns a thread-safe
//! blocking queue into an unbounded pull-driven sequence, the other turns a
//! server-side query cursor into a bounded one, applying skip/limit/sort/
//! hint/metadata modifiers exactly once before the first pull and releasing
//! the cursor on every exit path. A configurable per-record decode step sits
//! between raw records and typed elements; dropping undecodable records is
//! an explicit, opt-in policy rather than a hidden default.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod geo;
pub mod query;
pub mod source;
pub mod store;
pub mod stream;

pub use error::{Result, StreamError};
pub use geo::{Distance, GeoPoint, Metric, NearQuery};
pub use query::{Filter, Query, SortDirection};
pub use source::{DocumentSource, SourceOptions};
pub use store::{MemoryStore, NearCursor, RawCursor, Record, RecordStore};
pub use stream::{
    BlockingSource, CursorStream, Decoded, DiscardSink, GeoRecord, IsolationPolicy, NearStream,
    QueueStream, SharedCursorStream, TracingSink,
};

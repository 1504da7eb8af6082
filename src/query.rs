//! Query descriptor handed to the data-store collaborator.
//!
//! The filter itself is opaque to this layer; only the modifiers (skip,
//! limit, sort, hint, metadata, projection) are interpreted, and only to
//! decide whether and how a cursor must be prepared before iteration.

use std::collections::BTreeMap;

use serde_json::Value;

/// Opaque filter document, in whatever shape the collaborator expects.
pub type Filter = Value;

/// Direction of one sort key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    /// Smallest values first.
    Ascending,
    /// Largest values first.
    Descending,
}

/// A filter plus the optional cursor modifiers.
///
/// Built fluently:
///
/// ```
/// use corriente::{Query, SortDirection};
/// use serde_json::json;
///
/// let query = Query::filtered(json!({"kind": "sensor"}))
///     .skip(20)
///     .limit(10)
///     .sort("name", SortDirection::Ascending);
/// assert!(query.has_modifiers());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    filter: Filter,
    skip: u64,
    limit: Option<u64>,
    sort: Vec<(String, SortDirection)>,
    hint: Option<String>,
    meta: BTreeMap<String, Value>,
    fields: Vec<String>,
}

impl Query {
    /// A match-all query with no modifiers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A query restricted to records matching `filter`.
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Skips the first `skip` records.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Caps the result set at `limit` records.
    ///
    /// A limit of zero or below means "no limit", matching the descriptor
    /// contract rather than rejecting the value.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = u64::try_from(limit).ok().filter(|n| *n > 0);
        self
    }

    /// Appends one key to the sort specification.
    ///
    /// The whole specification is applied to the cursor once, before the
    /// first pull; it is never re-evaluated per batch.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    /// Names the index the engine should use.
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attaches one driver-specific execution hint (max scan, comment, ...).
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Restricts returned records to the named fields.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// The opaque filter document.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Number of records to skip.
    pub fn skip_count(&self) -> u64 {
        self.skip
    }

    /// Result-set cap, if one applies.
    pub fn limit_count(&self) -> Option<u64> {
        self.limit
    }

    /// Ordered sort specification.
    pub fn sort_spec(&self) -> &[(String, SortDirection)] {
        &self.sort
    }

    /// Index hint, if set.
    pub fn hint_name(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Driver metadata entries, in key order.
    pub fn meta_entries(&self) -> &BTreeMap<String, Value> {
        &self.meta
    }

    /// Field projection; empty means "all fields".
    pub fn projection(&self) -> &[String] {
        &self.fields
    }

    /// Whether any modifier is set.
    ///
    /// When this is false the cursor from `find` is used as-is; no defensive
    /// copy is made.
    pub fn has_modifiers(&self) -> bool {
        self.skip > 0
            || self.limit.is_some()
            || !self.sort.is_empty()
            || self.hint.is_some()
            || !self.meta.is_empty()
            || !self.fields.is_empty()
    }
}

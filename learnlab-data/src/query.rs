//! Pagination and filtering protocol shared by every repository
//!
//! [`QueryOptions`] is the caller-facing request shape for list operations;
//! [`PaginationMeta`] and [`PaginatedResult`] form the response envelope.
//! Backends translate the options into their native clauses, so callers
//! describe windows and sort order without writing query syntax.
//!
//! Paging is offset-based. `has_more` is derived purely from the window
//! arithmetic (`offset + limit < total`), never from the number of rows that
//! happened to come back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::RepositoryError;

/// Page size applied when the caller does not specify a limit.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Sort direction for [`QueryOptions::order_by`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// SQL keyword for this direction.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Options accepted by every list-shaped repository operation.
///
/// All fields are optional; missing values fall back to the documented
/// defaults when a page is actually produced ([`DEFAULT_PAGE_LIMIT`], offset
/// `0`, backend-native ordering).
///
/// `order_by` and `filters` keys are written in camelCase, matching the
/// serialized entity shape. Backends convert them to column names and reject
/// anything that does not survive the safety check in
/// [`crate::mapping::is_safe_identifier`].
///
/// # Example
///
/// ```
/// use learnlab_data::query::{OrderDirection, QueryOptions};
///
/// let options = QueryOptions::new()
///     .with_limit(25)
///     .with_order("createdAt", OrderDirection::Desc)
///     .with_filter("isPublished", true);
///
/// assert_eq!(options.effective_limit(), 25);
/// assert_eq!(options.effective_offset(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// Maximum number of rows to return.
    pub limit: Option<u32>,
    /// Number of rows to skip before the page starts.
    pub offset: Option<u32>,
    /// camelCase field to sort by.
    pub order_by: Option<String>,
    /// Direction for `order_by`; ascending when unset.
    pub order_direction: Option<OrderDirection>,
    /// Equality and membership filters keyed by camelCase field name.
    pub filters: Option<BTreeMap<String, Value>>,
}

impl QueryOptions {
    /// Options with every field unset. Useful as a `const` sentinel where an
    /// owned default cannot be allocated.
    pub const DEFAULT: Self = Self {
        limit: None,
        offset: None,
        order_by: None,
        order_direction: None,
        filters: None,
    };

    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Window for a 1-indexed page of `page_size` rows.
    pub fn page(page: u32, page_size: u32) -> Self {
        Self::new()
            .with_limit(page_size)
            .with_offset(page.saturating_sub(1).saturating_mul(page_size))
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the sort field and direction.
    #[must_use]
    pub fn with_order(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some(field.into());
        self.order_direction = Some(direction);
        self
    }

    /// Adds an equality (or, for array values, membership) filter.
    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), value.into());
        self
    }

    /// The limit that will actually be applied to a page.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    /// The offset that will actually be applied to a page.
    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// Window arithmetic describing the page that was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Total rows matching the query across all pages.
    pub total: u64,
    /// Limit that was applied (the default when the caller omitted one).
    pub limit: u32,
    /// Offset that was applied.
    pub offset: u32,
    /// Whether rows exist beyond this window.
    pub has_more: bool,
}

impl PaginationMeta {
    /// Derives metadata from a total row count and the caller's options.
    ///
    /// ```
    /// use learnlab_data::query::{PaginationMeta, QueryOptions};
    ///
    /// let meta = PaginationMeta::compute(23, None);
    /// assert_eq!((meta.limit, meta.offset, meta.has_more), (10, 0, true));
    ///
    /// let last_page = QueryOptions::new().with_limit(10).with_offset(20);
    /// let meta = PaginationMeta::compute(23, Some(&last_page));
    /// assert!(!meta.has_more);
    /// ```
    pub fn compute(total: u64, options: Option<&QueryOptions>) -> Self {
        let limit = options.map_or(DEFAULT_PAGE_LIMIT, QueryOptions::effective_limit);
        let offset = options.map_or(0, QueryOptions::effective_offset);
        Self {
            total,
            limit,
            offset,
            has_more: u64::from(offset) + u64::from(limit) < total,
        }
    }
}

/// One page of entities plus the window arithmetic that produced it.
///
/// Invariant: `data.len() <= meta.limit as usize`. List operations always
/// apply the effective limit, so a page can never exceed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> PaginatedResult<T> {
    /// Wraps a page of rows with its metadata.
    pub fn new(data: Vec<T>, meta: PaginationMeta) -> Self {
        Self { data, meta }
    }

    /// An empty page for queries that matched nothing.
    pub fn empty(options: Option<&QueryOptions>) -> Self {
        Self {
            data: Vec::new(),
            meta: PaginationMeta::compute(0, options),
        }
    }

    /// Number of rows in this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether this page contains no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Maps the page contents while keeping the metadata intact.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// A single failed entry from a batch update.
#[derive(Debug)]
pub struct BatchUpdateFailure {
    /// Identifier of the entity whose update failed.
    pub id: Uuid,
    /// Why it failed.
    pub error: RepositoryError,
}

/// Outcome of a batch update: successes and failures accumulated per entry.
///
/// Batch updates never abort on the first failure; each entry is attempted
/// and lands in exactly one of the two buckets.
#[derive(Debug)]
pub struct BatchUpdateOutcome<T> {
    /// Entities whose updates were applied, in input order.
    pub updated: Vec<T>,
    /// Entries that failed, with the per-entry error.
    pub failed: Vec<BatchUpdateFailure>,
}

impl<T> Default for BatchUpdateOutcome<T> {
    fn default() -> Self {
        Self {
            updated: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchUpdateOutcome<T> {
    /// Records a successful update.
    pub fn push_updated(&mut self, entity: T) {
        self.updated.push(entity);
    }

    /// Records a failed update.
    pub fn push_failed(&mut self, id: Uuid, error: RepositoryError) {
        self.failed.push(BatchUpdateFailure { id, error });
    }

    /// Whether every entry in the batch succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::RepositoryOperation;

    #[test]
    fn compute_applies_documented_defaults() {
        let meta = PaginationMeta::compute(100, None);
        assert_eq!(meta.total, 100);
        assert_eq!(meta.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(meta.offset, 0);
        assert!(meta.has_more);

        let empty_options = QueryOptions::new();
        let meta = PaginationMeta::compute(100, Some(&empty_options));
        assert_eq!(meta.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(meta.offset, 0);
    }

    #[test]
    fn has_more_is_window_arithmetic_not_row_count() {
        let options = QueryOptions::new().with_limit(10).with_offset(10);
        assert!(PaginationMeta::compute(21, Some(&options)).has_more);
        // offset + limit == total: the window ends exactly at the last row.
        assert!(!PaginationMeta::compute(20, Some(&options)).has_more);
        assert!(!PaginationMeta::compute(15, Some(&options)).has_more);
        assert!(!PaginationMeta::compute(0, Some(&options)).has_more);
    }

    #[test]
    fn has_more_survives_large_offsets() {
        let options = QueryOptions::new()
            .with_limit(u32::MAX)
            .with_offset(u32::MAX);
        assert!(!PaginationMeta::compute(u64::from(u32::MAX), Some(&options)).has_more);
    }

    #[test]
    fn page_translates_to_offset_windows() {
        let first = QueryOptions::page(1, 25);
        assert_eq!((first.effective_limit(), first.effective_offset()), (25, 0));

        let third = QueryOptions::page(3, 25);
        assert_eq!((third.effective_limit(), third.effective_offset()), (25, 50));

        // Page 0 is clamped to the first page rather than underflowing.
        let zeroth = QueryOptions::page(0, 25);
        assert_eq!(zeroth.effective_offset(), 0);
    }

    #[test]
    fn builders_accumulate_filters() {
        let options = QueryOptions::new()
            .with_filter("isPublished", true)
            .with_filter("categoryId", "c7a7d3d2-1b2e-4a5f-8c9d-0e1f2a3b4c5d");

        let filters = options.filters.as_ref().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters["isPublished"], json!(true));
    }

    #[test]
    fn serialized_keys_are_camel_case() {
        let options = QueryOptions::new()
            .with_limit(5)
            .with_order("createdAt", OrderDirection::Desc);
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["orderBy"], json!("createdAt"));
        assert_eq!(value["orderDirection"], json!("desc"));

        let meta = PaginationMeta::compute(3, None);
        let value = serde_json::to_value(meta).unwrap();
        assert!(value.get("hasMore").is_some());
        assert!(value.get("has_more").is_none());
    }

    #[test]
    fn options_deserialize_from_partial_json() {
        let options: QueryOptions = serde_json::from_str(r#"{"limit": 5}"#).unwrap();
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.offset, None);
        assert_eq!(options.effective_offset(), 0);
    }

    #[test]
    fn empty_page_reports_zero_total() {
        let options = QueryOptions::new().with_limit(50).with_offset(100);
        let page: PaginatedResult<String> = PaginatedResult::empty(Some(&options));
        assert!(page.is_empty());
        assert_eq!(page.meta.total, 0);
        assert_eq!(page.meta.limit, 50);
        assert!(!page.meta.has_more);
    }

    #[test]
    fn map_preserves_meta() {
        let meta = PaginationMeta::compute(2, None);
        let page = PaginatedResult::new(vec![1, 2], meta);
        let mapped = page.map(|n| n.to_string());
        assert_eq!(mapped.data, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(mapped.meta, meta);
    }

    #[test]
    fn batch_outcome_separates_successes_from_failures() {
        let mut outcome = BatchUpdateOutcome::default();
        outcome.push_updated("first");
        assert!(outcome.is_complete());

        outcome.push_failed(
            Uuid::nil(),
            crate::error::RepositoryError::not_found(
                RepositoryOperation::UpdateBatch,
                "entity vanished",
            ),
        );
        assert!(!outcome.is_complete());
        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].error.is_not_found());
    }
}

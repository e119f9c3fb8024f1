//! Read-side query parameters: date windows, free-text search, pagination.
//!
//! Filters never take part in balance computation. They select rows out of an
//! already fully replayed history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{DomainError, DomainResult};

/// Page size used when a request names none.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Half-open time window `[start, end)`; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> DomainResult<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(DomainError::invalid_range(format!(
                    "end {e} is before start {s}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| s <= at) && self.end.is_none_or(|e| at < e)
    }

    /// Narrowest window contained in both. May be empty.
    pub fn intersect(&self, other: &DateRange) -> DateRange {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        DateRange { start, end }
    }
}

/// Case-insensitive substring match of `search` against any of `fields`.
///
/// An absent or empty search matches everything.
pub fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    let Some(needle) = search.filter(|s| !s.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Page selection over a newest-first result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Zero-based page index.
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Validate raw request values; negative indexes and empty pages are rejected.
    pub fn new(page: i64, page_size: i64) -> DomainResult<Self> {
        if page < 0 {
            return Err(DomainError::invalid_range(format!(
                "page must be non-negative, got {page}"
            )));
        }
        if page_size <= 0 {
            return Err(DomainError::invalid_range(format!(
                "page size must be positive, got {page_size}"
            )));
        }
        let page = u32::try_from(page)
            .map_err(|_| DomainError::invalid_range(format!("page {page} is too large")))?;
        let page_size = u32::try_from(page_size).unwrap_or(u32::MAX);
        Ok(Self { page, page_size })
    }

    /// Clamp the page size to `max`.
    pub fn capped(self, max: u32) -> Self {
        Self {
            page: self.page,
            page_size: self.page_size.min(max.max(1)),
        }
    }

    /// Number of pages needed for `total` rows.
    pub fn page_count(&self, total: usize) -> u64 {
        let size = self.page_size.max(1) as u64;
        (total as u64).div_ceil(size)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let size = self.page_size as usize;
        let start = (self.page as usize).saturating_mul(size).min(items.len());
        let end = start.saturating_add(size).min(items.len());
        &items[start..end]
    }
}

/// Parameters of a single-account change listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeQuery {
    pub range: DateRange,
    pub search: Option<String>,
    pub pagination: Pagination,
}

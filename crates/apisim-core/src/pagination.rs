//! Cursor pagination shared by every list operation.
//!
//! Cursors are the sort key of the last item on the previous page (a channel
//! id, user id or message timestamp). Queries fetch one row more than the
//! limit; the extra row only signals that another page exists.

use serde::Serialize;

use crate::config::PaginationConfig;

/// A validated page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Key of the last item already seen; `None` starts from the beginning.
    pub cursor: Option<String>,
    /// Maximum number of items to return.
    pub limit: usize,
}

impl PageRequest {
    /// Build a request from raw query arguments.
    ///
    /// A missing or zero limit falls back to the configured default; larger
    /// limits are clamped to the configured maximum. Empty cursors are ignored.
    #[must_use]
    pub fn new(cursor: Option<&str>, limit: Option<u64>, config: &PaginationConfig) -> Self {
        let limit = match limit {
            None | Some(0) => config.default_limit,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX).min(config.max_limit),
        };
        Self {
            cursor: cursor
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            limit: limit.max(1),
        }
    }

    /// First page with the given limit.
    #[must_use]
    pub fn first(limit: usize) -> Self {
        Self {
            cursor: None,
            limit: limit.max(1),
        }
    }

    /// Continue after `cursor`.
    #[must_use]
    pub fn after(cursor: impl Into<String>, limit: usize) -> Self {
        Self {
            cursor: Some(cursor.into()),
            limit: limit.max(1),
        }
    }

    /// Number of rows a query should fetch: one more than the limit.
    pub(crate) fn fetch_limit(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX - 1) + 1
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Whether more items follow.
    pub has_more: bool,
    /// Cursor for the next page, set iff `has_more`.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Trim an over-fetched result set down to `limit` items.
    pub(crate) fn from_overfetch(mut rows: Vec<T>, limit: usize, key: impl Fn(&T) -> String) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_more { rows.last().map(key) } else { None };
        Self {
            items: rows,
            has_more,
            next_cursor,
        }
    }

    /// Transform every item, keeping the paging state.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
            next_cursor: self.next_cursor,
        }
    }

    /// Cursor string for Slack's `response_metadata.next_cursor` (empty when done).
    #[must_use]
    pub fn next_cursor_or_empty(&self) -> String {
        self.next_cursor.clone().unwrap_or_default()
    }
}

//! Page-number pagination for list endpoints.

use foodgram_common::{AppError, AppResult, PaginationConfig};
use foodgram_core::Page;
use serde::{Deserialize, Serialize};

/// `?page=<n>&limit=<n>` query parameters.
///
/// Kept as strings so malformed numbers surface as field errors rather
/// than generic query rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<String>,
    /// Requested page size.
    pub limit: Option<String>,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
}

impl PageRequest {
    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl PageParams {
    /// Validate against the configured bounds.
    pub fn resolve(&self, config: &PaginationConfig) -> AppResult<PageRequest> {
        let page = match self.page.as_deref() {
            None => 1,
            Some(raw) => parse_positive("page", raw)?,
        };
        let limit = match self.limit.as_deref() {
            None => config.default_limit,
            Some(raw) => parse_positive("limit", raw)?.min(config.max_limit),
        };
        Ok(PageRequest { page, limit })
    }
}

fn parse_positive(field: &str, raw: &str) -> AppResult<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::field(field, "must be a positive integer"))
}

/// Paginated response body.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// Total number of matches.
    pub count: u64,
    /// Next page number, if any.
    pub next: Option<u64>,
    /// Previous page number, if any.
    pub previous: Option<u64>,
    /// Items on this page.
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Wrap a page of results. A page past the end (other than the first)
    /// is not found.
    pub fn new(page: Page<T>, request: PageRequest) -> AppResult<Self> {
        if request.page > 1 && request.offset() >= page.count {
            return Err(AppError::NotFound("Invalid page.".to_string()));
        }

        let has_next = request.offset().saturating_add(request.limit) < page.count;
        Ok(Self {
            count: page.count,
            next: has_next.then(|| request.page + 1),
            previous: (request.page > 1).then(|| request.page - 1),
            results: page.items,
        })
    }
}

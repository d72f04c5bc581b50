//! Shared pagination types for list endpoints.
//!
//! Provides `PageQuery` for standardized request parameters and
//! `PagedResponse<T>` for the consistent list response format
//! (`entries`, `page`, `totalPages`, `total`).

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Server-side cap on the page size, regardless of the client-requested
/// value.
pub const MAX_PAGE_SIZE: i64 = 50;

/// Default page for paginated list queries.
pub fn default_page() -> i64 {
    1
}

/// Default page size for paginated list queries.
pub fn default_page_size() -> i64 {
    MAX_PAGE_SIZE
}

/// Shared pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// Page number, 1-based (default: 1)
    #[serde(default = "default_page")]
    pub page: i64,
    /// Items per page (default and maximum: 50)
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: default_page(), page_size: default_page_size() }
    }
}

impl PageQuery {
    /// Clamp pagination parameters to safe bounds: page >= 1 and
    /// page size in [1, MAX_PAGE_SIZE].
    pub fn clamp(&self) -> (i64, i64) {
        (self.page.max(1), self.page_size.clamp(1, MAX_PAGE_SIZE))
    }

    /// Offset of the first item of the (clamped) requested page.
    pub fn offset(&self) -> i64 {
        let (page, page_size) = self.clamp();
        (page - 1) * page_size
    }
}

/// Standardized paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    /// The entries for the current page
    pub entries: Vec<T>,
    /// The (clamped) requested page
    pub page: i64,
    /// Total number of pages for the applied page size
    pub total_pages: i64,
    /// Total number of entries matching the query (across all pages)
    pub total: i64,
}

impl<T> PagedResponse<T> {
    /// Create a new paginated response.
    pub fn new(entries: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + page_size - 1) / page_size };
        Self { entries, page, total_pages, total }
    }
}

//! Page requests and paginated envelopes shared by every list endpoint

use serde::Serialize;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated, 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Build a page request from optional query parameters.
    ///
    /// Missing values fall back to page 1 and [`DEFAULT_PAGE_SIZE`]; a page of
    /// zero or a size outside `1..=MAX_PAGE_SIZE` is rejected.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Result<Self, String> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err("page must be a positive integer".to_string());
        }

        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(format!("pageSize must be between 1 and {}", MAX_PAGE_SIZE));
        }

        Ok(Self { page, page_size })
    }

    /// The first `n` rows.
    pub fn first(n: u32) -> Self {
        Self {
            page: 1,
            page_size: n.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    /// Rows to take
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination block of a list response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

/// A page of rows plus its pagination block
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let page_size = request.page_size() as u64;
        Self {
            data,
            pagination: Pagination {
                page: request.page(),
                page_size: request.page_size(),
                total_items,
                total_pages: total_items.div_ceil(page_size),
            },
        }
    }

    /// Convert every row while keeping the pagination block.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

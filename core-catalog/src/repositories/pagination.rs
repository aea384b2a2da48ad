//! Pagination types shared by every catalog reader.

use serde::{Deserialize, Serialize};

/// Pagination request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, 0-indexed.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// SQL OFFSET value.
    pub fn offset(&self) -> u32 {
        self.page * self.page_size
    }

    /// SQL LIMIT value.
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 50,
        }
    }
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching items across all pages, as of this query. Grows
    /// while indexing is still running.
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = if request.page_size == 0 {
            0
        } else {
            total.div_ceil(request.page_size as u64) as u32
        };
        Self {
            items,
            total,
            page: request.page,
            total_pages,
            page_size: request.page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let request = PageRequest::new(3, 25);
        assert_eq!(request.offset(), 75);
        assert_eq!(request.limit(), 25);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(vec![1, 2, 3], 101, PageRequest::new(0, 25));
        assert_eq!(page.total_pages, 5);
        assert!(page.has_next());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page: Page<i32> = Page::new(vec![], 101, PageRequest::new(4, 25));
        assert!(!page.has_next());
    }

    #[test]
    fn test_zero_page_size() {
        let page: Page<i32> = Page::new(vec![], 10, PageRequest::new(0, 0));
        assert_eq!(page.total_pages, 0);
    }
}

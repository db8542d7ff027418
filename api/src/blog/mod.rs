pub mod comment;
pub mod models;
pub mod post;
pub mod routes;

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Zero based page selection shared by the listing endpoints
#[derive(Deserialize, Debug, Default, Clone, Copy)]
pub struct Page {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Page {
    pub fn size(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn number(&self) -> i64 {
        self.page.unwrap_or(0).max(0)
    }

    pub fn offset(&self) -> i64 {
        self.number().saturating_mul(self.size())
    }

    /// Number of rows from the first page up to and including this one
    pub fn accumulated_limit(&self) -> i64 {
        self.number()
            .saturating_add(1)
            .saturating_mul(self.size())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page.size(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);
        assert_eq!(page.accumulated_limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_page_clamps() {
        let page = Page {
            page: Some(-3),
            page_size: Some(1_000),
        };
        assert_eq!(page.size(), MAX_PAGE_SIZE);
        assert_eq!(page.number(), 0);

        let page = Page {
            page: Some(2),
            page_size: Some(0),
        };
        assert_eq!(page.size(), 1);
        assert_eq!(page.offset(), 2);
    }

    #[test]
    fn test_accumulated_limit_covers_previous_pages() {
        let page = Page {
            page: Some(2),
            page_size: Some(20),
        };
        assert_eq!(page.offset(), 40);
        assert_eq!(page.accumulated_limit(), 60);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let page = Page {
            page: Some(i64::MAX),
            page_size: Some(MAX_PAGE_SIZE),
        };
        assert_eq!(page.accumulated_limit(), i64::MAX);
    }
}

//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may ask for. Larger sizes are clamped.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// A validated request for one page of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The one-based page number.
    pub page: u64,
    /// The maximum number of items on the page.
    pub page_size: u64,
}

impl PageRequest {
    /// The number of items before the first item on this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// Relative links to the neighbouring pages, absent at either end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationLinks {
    /// The next page, if there is one.
    pub next: Option<String>,
    /// The previous page, if there is one.
    pub prev: Option<String>,
}

/// Describes where a page sits in the full result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// The number of items matching the query across all pages.
    pub total: u64,
    /// The number of items on this page.
    pub count: u64,
    /// The requested page size.
    pub per_page: u64,
    /// The one-based number of this page.
    pub current_page: u64,
    /// The number of pages needed for every matching item.
    pub total_pages: u64,
    /// Links to the neighbouring pages.
    pub links: PaginationLinks,
}

impl PaginationMeta {
    /// Compute the page metadata for `request`.
    ///
    /// `link_to` renders the link for a page number, it is only called for
    /// pages that exist next to the current page.
    pub fn new(
        request: PageRequest,
        total: u64,
        count: u64,
        link_to: impl Fn(u64) -> String,
    ) -> Self {
        let total_pages = total.div_ceil(request.page_size.max(1));

        let next = (request.page < total_pages).then(|| link_to(request.page + 1));
        let prev = (request.page > 1).then(|| link_to(request.page - 1));

        Self {
            total,
            count,
            per_page: request.page_size,
            current_page: request.page,
            total_pages,
            links: PaginationLinks { next, prev },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pagination::{PageRequest, PaginationMeta};

    fn link_to(page: u64) -> String {
        format!("?page={page}&page_size=5")
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(PageRequest { page: 1, page_size: 10 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, page_size: 10 }.offset(), 20);
    }

    #[test]
    fn first_page_has_next_link_only() {
        let got = PaginationMeta::new(PageRequest { page: 1, page_size: 5 }, 15, 5, link_to);

        assert_eq!(got.total_pages, 3);
        assert_eq!(got.links.next.as_deref(), Some("?page=2&page_size=5"));
        assert_eq!(got.links.prev, None);
    }

    #[test]
    fn middle_page_has_both_links() {
        let got = PaginationMeta::new(PageRequest { page: 2, page_size: 5 }, 15, 5, link_to);

        assert_eq!(got.links.next.as_deref(), Some("?page=3&page_size=5"));
        assert_eq!(got.links.prev.as_deref(), Some("?page=1&page_size=5"));
    }

    #[test]
    fn last_page_has_prev_link_only() {
        let got = PaginationMeta::new(PageRequest { page: 3, page_size: 5 }, 15, 5, link_to);

        assert_eq!(got.links.next, None);
        assert_eq!(got.links.prev.as_deref(), Some("?page=2&page_size=5"));
    }

    #[test]
    fn partial_last_page_rounds_up() {
        let got = PaginationMeta::new(PageRequest { page: 1, page_size: 5 }, 16, 5, link_to);

        assert_eq!(got.total_pages, 4);
    }

    #[test]
    fn empty_result_has_no_pages_or_links() {
        let got = PaginationMeta::new(PageRequest { page: 1, page_size: 10 }, 0, 0, link_to);

        assert_eq!(got.total_pages, 0);
        assert_eq!(got.links.next, None);
        assert_eq!(got.links.prev, None);
    }

    #[test]
    fn page_past_the_end_links_back() {
        let got = PaginationMeta::new(PageRequest { page: 7, page_size: 5 }, 15, 0, link_to);

        assert_eq!(got.links.next, None);
        assert_eq!(got.links.prev.as_deref(), Some("?page=6&page_size=5"));
    }
}

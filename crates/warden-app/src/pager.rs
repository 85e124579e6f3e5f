//! Pager state driven by a collection's page state.
//!
//! Pages are one-based. Navigation writes `page` (and on size changes
//! `size`) into the caller's [`QueryParams`] so the next `fetch_all` asks
//! for the right window.

use warden_client::QueryParams;
use warden_core::PageState;

/// Query parameter carrying the one-based page number.
pub const PAGE_PARAM: &str = "page";

/// Query parameter carrying the page size.
pub const SIZE_PARAM: &str = "size";

/// Page sizes offered by default.
pub const DEFAULT_PAGE_SIZES: [u64; 4] = [10, 20, 50, 100];

/// Pager for one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pager {
    page: u64,
    size: u64,
    total_pages: u64,
    page_sizes: Vec<u64>,
}

impl Pager {
    /// Pager on page 1 with `size` rows per page.
    pub fn new(size: u64) -> Self {
        Self {
            page: 1,
            size: size.max(1),
            total_pages: 0,
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
        }
    }

    /// Pager positioned by existing params (missing values keep defaults).
    pub fn from_params(params: &QueryParams, default_size: u64) -> Self {
        let mut pager = Self::new(params.get_u64(SIZE_PARAM).unwrap_or(default_size));
        pager.page = params.get_u64(PAGE_PARAM).unwrap_or(1).max(1);
        pager
    }

    /// Offer different page sizes.
    #[must_use]
    pub fn with_page_sizes(mut self, sizes: Vec<u64>) -> Self {
        self.page_sizes = sizes;
        self
    }

    /// Current page.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Rows per page.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Known page count.
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Offered page sizes.
    pub fn page_sizes(&self) -> &[u64] {
        &self.page_sizes
    }

    /// Adopt the page count of a freshly fetched page. A ranged backend's
    /// zero-based `number` also moves the current page.
    pub fn sync(&mut self, page_state: &PageState) {
        self.total_pages = page_state.total_pages;
        if let Some(number) = page_state.number {
            self.page = number + 1;
        }
    }

    /// Whether there is an earlier page.
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether there is a later page.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Move to `page` (clamped to the known range). Returns `true` when the
    /// page changed and `params` were updated.
    pub fn go_to(&mut self, page: u64, params: &mut QueryParams) -> bool {
        let last = self.total_pages.max(1);
        let page = page.clamp(1, last);
        if page == self.page {
            return false;
        }
        self.page = page;
        params.set(PAGE_PARAM, page);
        true
    }

    /// Next page.
    pub fn next(&mut self, params: &mut QueryParams) -> bool {
        self.go_to(self.page + 1, params)
    }

    /// Previous page.
    pub fn previous(&mut self, params: &mut QueryParams) -> bool {
        self.go_to(self.page.saturating_sub(1), params)
    }

    /// Change the page size. Always returns to page 1 and writes both the
    /// size and the reset page into `params`.
    pub fn set_size(&mut self, size: u64, params: &mut QueryParams) {
        self.size = size.max(1);
        self.page = 1;
        params.set(PAGE_PARAM, self.page);
        params.set(SIZE_PARAM, self.size);
    }

    /// Zero-based index of the first row on the current page.
    pub fn start_index(&self) -> u64 {
        (self.page - 1) * self.size
    }

    /// Up to `width` page numbers centred on the current page.
    pub fn window(&self, width: u64) -> Vec<u64> {
        let total = self.total_pages;
        if total == 0 || width == 0 {
            return Vec::new();
        }
        let width = width.min(total);
        let half = width / 2;
        let start = self
            .page
            .saturating_sub(half)
            .max(1)
            .min(total - width + 1);
        (start..start + width).collect()
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZES[1])
    }
}

// ============================================================================
// Pagination
// ============================================================================
//
// Fixed page size of 10 rows, one-based pages, and always at least one page
// even over an empty list. The renderer shows the current page plus its
// successor, with first/prev/next/last motions.
//
// ============================================================================

pub const ORDERS_PER_PAGE: usize = 10;

/// Number of pages needed for `count` items; never less than one.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size).max(1)
}

/// Clamps a requested page into `[1, total_pages]`.
pub fn clamp_page(page: usize, count: usize, page_size: usize) -> usize {
    page.clamp(1, total_pages(count, page_size))
}

/// The slice `[(page-1)*page_size, page*page_size)`, empty when the page
/// starts past the end.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1) * page_size;
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// Page numbers rendered in the pager: the current page and the next one
/// when it exists.
pub fn visible_pages(current: usize, total: usize) -> Vec<usize> {
    [current, current + 1]
        .into_iter()
        .filter(|page| *page <= total)
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

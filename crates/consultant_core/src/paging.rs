//! Offset/limit pagination arithmetic for the job history view.

/// Number of pages needed for `total_items` at `page_size` per page.
/// An empty collection still renders one (empty) page.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 || total_items == 0 {
        return 1;
    }
    total_items.div_ceil(page_size)
}

/// Clamps a 1-indexed page request into the valid range.
pub fn clamp_page(page: usize, total_items: usize, page_size: usize) -> usize {
    page.clamp(1, total_pages(total_items, page_size))
}

/// Offset query parameter for a 1-indexed page.
pub fn page_offset(page: usize, page_size: usize) -> usize {
    page.saturating_sub(1) * page_size
}

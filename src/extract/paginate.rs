use anyhow::Result;

use crate::models::JobMap;

/// Number of pages implied by a declared total and a fixed page size.
pub fn page_count(total: u64, page_size: u64) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size) as usize
}

/// Fetch and merge pages `2..=min(declared_pages, cap)` on top of the
/// already-extracted first page. The closure returns `Ok(None)` when the
/// vendor answers a page request with an empty body; that stops pagination
/// and keeps whatever has been accumulated. Id collisions across pages are
/// last-write-wins.
pub fn drive_pages<F>(
    mut merged: JobMap,
    declared_pages: usize,
    cap: usize,
    mut next: F,
) -> Result<JobMap>
where
    F: FnMut(usize) -> Result<Option<JobMap>>,
{
    let last = declared_pages.min(cap);
    for page in 2..=last {
        match next(page)? {
            Some(jobs) => merged.extend(jobs),
            None => break,
        }
    }
    Ok(merged)
}

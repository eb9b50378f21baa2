//! Shared constants for retrieval and presentation
//!
//! Thresholds and defaults used across the retrieval controller and the
//! virtualized viewer. All of these are overridable where they matter
//! (page size via CLI, heights via [`crate::virt::HeightConfig`]).

use std::time::Duration;

/// Number of events requested per page; a shorter page signals exhaustion
pub const PAGE_SIZE: usize = 50;

/// Window within which rapid filter edits collapse into one request
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Skeleton placeholder rows shown during the first page load
pub const SKELETON_ROWS: usize = 5;

/// How close (in rendered rows) the viewport must get to the end of the
/// accumulated list before the next page is requested
pub const LOAD_MORE_PROXIMITY: usize = 4;

/// How close (in rendered rows) to the bottom the viewport must be for an
/// append to keep auto-scrolling to the newest entry
pub const FOLLOW_THRESHOLD: usize = 2;

/// How long a status-line notice stays visible
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert!(PAGE_SIZE > 0);
        assert!(SKELETON_ROWS > 0);
        assert!(DEBOUNCE_WINDOW < Duration::from_secs(1));
        assert!(FOLLOW_THRESHOLD <= LOAD_MORE_PROXIMITY);
    }
}

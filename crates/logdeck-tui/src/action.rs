//! Actions for the logdeck TUI
//!
//! Actions represent events that can modify application state. Components
//! return them from key handlers; the [`crate::App`] executes the ones that
//! need the fetch machinery.

use logdeck_core::filter::FilterOptions;

/// Actions that can be dispatched in the application
#[derive(Debug, Clone)]
pub enum Action {
    // Navigation
    Quit,

    // UI state
    Tick,
    Resize(u16, u16),

    /// The user edited the filter predicate; goes through the debouncer
    FiltersEdited(FilterOptions),
    /// The scroll sentinel reached the viewport tail
    LoadMore,
    /// Backoff retry of the last failed fetch
    Retry,
    /// Immediate one-click refetch from the stale banner
    Reconnect,
}

//! Query cache and filter-edit debouncing
//!
//! Memoizes page fetches keyed by `(source id, filters, page)` so that an
//! identical query issued again before invalidation reuses the last result
//! rather than re-querying. Also owns the debounce of rapid filter edits:
//! a burst of edits within the window collapses to one outbound request,
//! and only the latest value survives.

use crate::event::LogEvent;
use crate::filter::FilterOptions;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cache key: one page of one filtered stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub source_id: String,
    pub filters: FilterOptions,
    pub page: u32,
}

impl QueryKey {
    pub fn new(source_id: impl Into<String>, filters: FilterOptions, page: u32) -> Self {
        Self {
            source_id: source_id.into(),
            filters,
            page,
        }
    }
}

/// State of one cached query
///
/// The shape mirrors what callers need for presentation: data, loading flag,
/// and the last error. A failed refetch preserves the previous data so the
/// view can keep rendering it.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    data: Option<Vec<LogEvent>>,
    loading: bool,
    error: Option<String>,
}

impl QueryState {
    pub fn data(&self) -> Option<&[LogEvent]> {
        self.data.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Warm means a completed, non-superseded result is available
    pub fn is_warm(&self) -> bool {
        self.data.is_some() && !self.loading && self.error.is_none()
    }
}

/// Memoization layer over page fetches
///
/// # Examples
///
/// ```
/// use logdeck_core::query::{QueryCache, QueryKey};
/// use logdeck_core::filter::FilterOptions;
///
/// let mut cache = QueryCache::new();
/// let key = QueryKey::new("job-1", FilterOptions::default(), 1);
///
/// assert!(cache.cached(&key).is_none());
/// cache.begin(&key);
/// cache.complete(&key, Vec::new());
/// assert!(cache.cached(&key).is_some());
/// ```
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, QueryState>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed result for the key, if still valid
    pub fn cached(&self, key: &QueryKey) -> Option<&[LogEvent]> {
        self.entries.get(key).filter(|s| s.is_warm()).and_then(QueryState::data)
    }

    /// Full state for the key, if any fetch was ever started
    pub fn state(&self, key: &QueryKey) -> Option<&QueryState> {
        self.entries.get(key)
    }

    /// Whether a fetch for the key is currently in flight
    pub fn in_flight(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(QueryState::is_loading)
    }

    /// Mark a fetch as started
    ///
    /// Returns false when the key is already warm or already loading, in
    /// which case no new request should be issued.
    pub fn begin(&mut self, key: &QueryKey) -> bool {
        let entry = self.entries.entry(key.clone()).or_default();
        if entry.is_warm() || entry.loading {
            return false;
        }
        entry.loading = true;
        true
    }

    /// Record a successful fetch: clears any previous error
    pub fn complete(&mut self, key: &QueryKey, events: Vec<LogEvent>) {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.data = Some(events);
        entry.loading = false;
        entry.error = None;
    }

    /// Record a failed fetch: surfaces the error, preserves prior data
    pub fn fail(&mut self, key: &QueryKey, error: impl ToString) {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.loading = false;
        entry.error = Some(error.to_string());
    }

    /// Force the next lookup of this key to refetch
    pub fn invalidate(&mut self, key: &QueryKey) {
        self.entries.remove(key);
    }

    /// Drop every cached page for a source, across all filters
    pub fn invalidate_source(&mut self, source_id: &str) {
        self.entries.retain(|k, _| k.source_id != source_id);
    }
}

/// Cancel-and-replace debouncer for filter edits
///
/// Each [`Debouncer::submit`] replaces any pending value and restarts the
/// window; [`Debouncer::poll_at`] yields the value once the window has
/// elapsed without further edits.
#[derive(Debug)]
pub struct Debouncer<T> {
    pending: Option<(T, Instant)>,
    window: Duration,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: None,
            window,
        }
    }

    /// Schedule a value, replacing any pending one
    pub fn submit(&mut self, value: T) {
        self.submit_at(value, Instant::now());
    }

    /// Yield the pending value if its window has elapsed
    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// Drop any pending value without yielding it
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn submit_at(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    fn poll_at(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }
}

//! Page-by-page retrieval orchestration
//!
//! Turns a sequence of per-page fetches into one continuous, filterable,
//! infinitely-scrollable stream. Each filter change opens a new epoch; a
//! page that resolves under an old epoch is discarded rather than appended,
//! so the accumulated list is always exactly the concatenation of pages
//! fetched under the current filter.

use crate::constants::{LOAD_MORE_PROXIMITY, PAGE_SIZE};
use crate::event::LogEvent;
use crate::filter::FilterOptions;

/// Phase of the retrieval state machine for the current epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// No fetch issued yet for this epoch
    Idle,
    /// First page of the epoch in flight
    FetchingFirstPage,
    /// At least one page accumulated, nothing in flight
    Ready,
    /// A follow-up page in flight
    FetchingMore,
    /// Last fetch of this epoch failed
    Errored,
}

/// A fetch the controller wants issued
///
/// The epoch is carried along so the result can be checked against the
/// controller's current epoch on arrival.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub epoch: u64,
    pub source_id: String,
    pub filters: FilterOptions,
    pub page: u32,
}

/// Accumulates filtered pages into one stream
///
/// # Examples
///
/// ```
/// use logdeck_core::retrieval::RetrievalController;
///
/// let mut controller = RetrievalController::new("job-1", 50);
/// let request = controller.begin_first_page();
/// assert_eq!(request.page, 1);
///
/// controller.on_page(request.epoch, Vec::new());
/// assert!(!controller.has_more());
/// ```
#[derive(Debug)]
pub struct RetrievalController {
    source_id: String,
    filters: FilterOptions,
    /// Filter epoch; bumped atomically with every filter change
    epoch: u64,
    phase: FetchPhase,
    /// 1-based cursor of the last requested page
    page: u32,
    events: Vec<LogEvent>,
    has_more: bool,
    /// Presenting last-good data across a transient failure
    stale: bool,
    /// Consecutive failed attempts; reset only on confirmed success
    retry_count: u32,
    last_error: Option<String>,
    page_size: usize,
}

impl RetrievalController {
    pub fn new(source_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            source_id: source_id.into(),
            filters: FilterOptions::default(),
            epoch: 0,
            phase: FetchPhase::Idle,
            page: 0,
            events: Vec::new(),
            has_more: true,
            stale: false,
            retry_count: 0,
            last_error: None,
            page_size,
        }
    }

    pub fn with_default_page_size(source_id: impl Into<String>) -> Self {
        Self::new(source_id, PAGE_SIZE)
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn filters(&self) -> &FilterOptions {
        &self.filters
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether any fetch is currently in flight
    pub fn in_flight(&self) -> bool {
        matches!(
            self.phase,
            FetchPhase::FetchingFirstPage | FetchPhase::FetchingMore
        )
    }

    /// First page load with nothing accumulated yet: skeleton territory
    pub fn loading_first(&self) -> bool {
        self.phase == FetchPhase::FetchingFirstPage && self.events.is_empty()
    }

    /// Page awaited by the in-flight fetch, if any
    pub fn pending_page(&self) -> Option<u32> {
        self.in_flight().then_some(self.page)
    }

    /// Apply a new filter value
    ///
    /// The reset is a hard barrier: the accumulated events are cleared, the
    /// cursor rewinds, and the epoch is bumped in the same call, so no page
    /// from the previous epoch can be appended afterwards. Returns false if
    /// the value is unchanged.
    pub fn set_filters(&mut self, filters: FilterOptions) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filters = filters;
        self.epoch += 1;
        self.phase = FetchPhase::Idle;
        self.page = 0;
        self.events.clear();
        self.has_more = true;
        self.stale = false;
        self.last_error = None;
        true
    }

    /// Start the first page fetch of the current epoch
    pub fn begin_first_page(&mut self) -> FetchRequest {
        self.phase = FetchPhase::FetchingFirstPage;
        self.page = 1;
        self.request()
    }

    /// Request the next page, if allowed
    ///
    /// No-op while a load is in flight or after the stream is exhausted;
    /// concurrent invocations collapse to at most one in-flight request.
    pub fn load_more(&mut self) -> Option<FetchRequest> {
        if !self.has_more || self.in_flight() {
            return None;
        }
        self.page += 1;
        self.phase = FetchPhase::FetchingMore;
        Some(self.request())
    }

    /// Re-issue the fetch that last failed, without advancing the cursor
    pub fn retry_request(&mut self) -> FetchRequest {
        self.phase = if self.events.is_empty() {
            FetchPhase::FetchingFirstPage
        } else {
            FetchPhase::FetchingMore
        };
        if self.page == 0 {
            self.page = 1;
        }
        self.request()
    }

    /// Infinite-scroll trigger: the rendered window is approaching the tail
    ///
    /// Suppressed while a load is pending and once the stream is exhausted.
    pub fn wants_more(&self, rendered_end: usize) -> bool {
        self.has_more
            && !self.in_flight()
            && self.phase == FetchPhase::Ready
            && rendered_end + LOAD_MORE_PROXIMITY >= self.events.len()
    }

    /// A page arrived; append it if it belongs to the current epoch
    ///
    /// Returns false when the page was discarded as cross-epoch. A page
    /// shorter than the page size marks the stream exhausted.
    pub fn on_page(&mut self, epoch: u64, mut events: Vec<LogEvent>) -> bool {
        if epoch != self.epoch {
            tracing::debug!(
                stale_epoch = epoch,
                current_epoch = self.epoch,
                "discarding page from superseded filter epoch"
            );
            return false;
        }
        self.has_more = events.len() >= self.page_size;
        self.events.append(&mut events);
        self.phase = FetchPhase::Ready;
        self.stale = false;
        self.retry_count = 0;
        self.last_error = None;
        true
    }

    /// A fetch failed; keep the last good data visible if there is any
    ///
    /// Returns false when the failure belonged to a superseded epoch.
    pub fn on_error(&mut self, epoch: u64, message: impl Into<String>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.phase = FetchPhase::Errored;
        self.stale = !self.events.is_empty();
        self.retry_count += 1;
        self.last_error = Some(message.into());
        true
    }

    fn request(&self) -> FetchRequest {
        FetchRequest {
            epoch: self.epoch,
            source_id: self.source_id.clone(),
            filters: self.filters.clone(),
            page: self.page,
        }
    }
}

//! The paginated query contract consumed by the core

use crate::error::FeedError;
use logdeck_core::event::LogEvent;
use logdeck_core::filter::FilterOptions;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`EventSource::fetch_events`]
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<LogEvent>, FeedError>> + Send + 'a>>;

/// A paginated, filterable query over one job's event stream
///
/// Contract: pages are returned in ascending `seq` order; a page shorter
/// than the page size signals "no more pages". Implementations are expected
/// to be idempotent under re-fetch - the feed is best-effort, and the same
/// page may be requested again after a transient failure.
pub trait EventSource: Send + Sync {
    /// Fetch one page of events for the given job and filters
    ///
    /// `page` is 1-based.
    fn fetch_events<'a>(
        &'a self,
        source_id: &'a str,
        filters: &'a FilterOptions,
        page: u32,
    ) -> FetchFuture<'a>;
}

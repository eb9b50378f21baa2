//! Application event loop
//!
//! Owns the pieces the viewer delegates outward: the query cache, the
//! filter-edit debouncer, the retry timer, and the feed itself. Fetches run
//! on spawned tasks and report back over a channel; results are matched
//! against the viewer's filter epoch before they touch any state.

use crate::action::Action;
use crate::components::{Component, LogViewerComponent};
use crate::tui::{Tui, TuiGuard};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyEventKind};
use logdeck_core::constants::DEBOUNCE_WINDOW;
use logdeck_core::event::LogEvent;
use logdeck_core::filter::FilterOptions;
use logdeck_core::notify::Notice;
use logdeck_core::query::{Debouncer, QueryCache, QueryKey};
use logdeck_core::retrieval::FetchRequest;
use logdeck_core::retry::{RetryTimer, delay_for};
use logdeck_core::errors::format_fetch_error;
use logdeck_feed::source::EventSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of one page fetch, delivered back to the event loop
#[derive(Debug)]
enum FetchOutcome {
    Page {
        key: QueryKey,
        epoch: u64,
        events: Vec<LogEvent>,
    },
    Failed {
        key: QueryKey,
        epoch: u64,
        message: String,
    },
}

pub struct App {
    should_quit: bool,
    viewer: LogViewerComponent,
    cache: QueryCache,
    debouncer: Debouncer<FilterOptions>,
    retry: RetryTimer,
    source: Arc<dyn EventSource>,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    tick_rate: Duration,
    mouse: bool,
}

impl App {
    pub fn new(
        source: Arc<dyn EventSource>,
        source_id: impl Into<String>,
        page_size: usize,
        initial_filters: FilterOptions,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let mut viewer = LogViewerComponent::new(source_id, page_size);
        viewer.apply_filters(initial_filters);
        Self {
            should_quit: false,
            viewer,
            cache: QueryCache::new(),
            debouncer: Debouncer::new(DEBOUNCE_WINDOW),
            retry: RetryTimer::new(),
            source,
            outcome_tx,
            outcome_rx,
            tick_rate: Duration::from_millis(100),
            mouse: true,
        }
    }

    /// Enable or disable mouse capture for the session
    pub fn mouse_capture(mut self, enabled: bool) -> Self {
        self.mouse = enabled;
        self
    }

    /// Run until the user quits; the guard restores the terminal on the way
    /// out, panics included
    pub async fn run(&mut self) -> Result<()> {
        let mut session = TuiGuard::enter(self.mouse)?;
        self.main_loop(&mut session.terminal).await
    }

    async fn main_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        let request = self.viewer.begin_first_page();
        self.issue(request);

        while !self.should_quit {
            terminal.draw(|frame| {
                let area = frame.area();
                let _ = self.viewer.draw(frame, area);
            })?;

            if event::poll(self.tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = self.viewer.handle_key_event(key)? {
                            self.handle_action(action)?;
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Some(action) = self.viewer.handle_mouse_event(mouse)? {
                            self.handle_action(action)?;
                        }
                    }
                    Event::Resize(width, height) => {
                        self.handle_action(Action::Resize(width, height))?;
                    }
                    _ => {}
                }
            }

            self.handle_action(Action::Tick)?;

            while let Ok(outcome) = self.outcome_rx.try_recv() {
                self.on_outcome(outcome);
            }
        }

        // Nothing fires into a torn-down view
        self.retry.cancel();
        self.debouncer.cancel();
        Ok(())
    }

    fn handle_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Resize(_, _) => {}
            Action::Tick => {
                if let Some(follow_up) = self.viewer.update(Action::Tick)? {
                    self.handle_action(follow_up)?;
                }
                if let Some(filters) = self.debouncer.poll()
                    && self.viewer.apply_filters(filters)
                {
                    let request = self.viewer.begin_first_page();
                    self.issue(request);
                }
                if self.retry.poll() {
                    self.refetch_failed_page();
                }
            }
            Action::FiltersEdited(filters) => {
                self.debouncer.submit(filters);
            }
            Action::LoadMore => {
                if let Some(request) = self.viewer.load_more() {
                    self.issue(request);
                }
            }
            Action::Retry => {
                let attempt = self.viewer.retry_count().saturating_sub(1);
                let delay = delay_for(attempt);
                if self.retry.arm(delay) {
                    self.viewer.notify(Notice::retry_countdown(delay));
                }
            }
            Action::Reconnect => {
                self.retry.cancel();
                self.refetch_failed_page();
            }
        }
        Ok(())
    }

    /// Re-issue the fetch that last failed, bypassing the cache
    fn refetch_failed_page(&mut self) {
        let request = self.viewer.retry_request();
        let key = key_for(&request);
        self.cache.invalidate(&key);
        self.issue(request);
    }

    /// Serve a request from the cache, or start a fetch for it
    ///
    /// The cache's begin() collapses duplicate in-flight requests for the
    /// same key to a single fetch.
    fn issue(&mut self, request: FetchRequest) {
        let key = key_for(&request);
        if let Some(events) = self.cache.cached(&key) {
            tracing::debug!(page = request.page, "serving page from cache");
            let events = events.to_vec();
            self.viewer.on_page(request.epoch, events);
            return;
        }
        if !self.cache.begin(&key) {
            return;
        }
        tracing::debug!(
            page = request.page,
            epoch = request.epoch,
            "fetching page"
        );

        let source = Arc::clone(&self.source);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = source
                .fetch_events(&request.source_id, &request.filters, request.page)
                .await;
            let epoch = request.epoch;
            let key = QueryKey::new(request.source_id, request.filters, request.page);
            let outcome = match result {
                Ok(events) => FetchOutcome::Page { key, epoch, events },
                Err(error) => FetchOutcome::Failed {
                    key,
                    epoch,
                    message: error.to_string(),
                },
            };
            let _ = tx.send(outcome);
        });
    }

    /// Whether the viewer's in-flight fetch targets exactly this key
    ///
    /// Filters can cycle back to a value whose fetch is still out (edit
    /// A -> B -> A across two debounce windows); `issue` then starts nothing
    /// because the key is already loading, so the outcome of that older
    /// fetch is the only thing that can unblock the viewer.
    fn wants_key(&self, key: &QueryKey) -> bool {
        self.viewer.pending_page() == Some(key.page)
            && key.source_id == self.viewer.source_id()
            && key.filters == *self.viewer.filters()
    }

    fn on_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Page { key, epoch, events } => {
                self.cache.complete(&key, events.clone());
                // Deliver under the current epoch when the viewer is waiting
                // on this exact key; cross-epoch pages are discarded below
                let epoch = if self.wants_key(&key) {
                    self.viewer.epoch()
                } else {
                    epoch
                };
                self.viewer.on_page(epoch, events);
            }
            FetchOutcome::Failed {
                key,
                epoch,
                message,
            } => {
                tracing::warn!(page = key.page, error = %message, "fetch failed");
                self.cache.fail(&key, &message);
                let friendly = format_fetch_error(&message);
                let epoch = if self.wants_key(&key) {
                    self.viewer.epoch()
                } else {
                    epoch
                };
                // Exactly one notice per failed attempt
                if self.viewer.on_error(epoch, friendly.clone()) {
                    let notice = if self.viewer.is_stale() {
                        Notice::stale_cache()
                    } else {
                        Notice::fetch_failed(friendly)
                    };
                    self.viewer.notify(notice);
                }
            }
        }
    }
}

fn key_for(request: &FetchRequest) -> QueryKey {
    QueryKey::new(
        request.source_id.clone(),
        request.filters.clone(),
        request.page,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent};
    use logdeck_core::event::LogLevel;
    use logdeck_feed::source::FetchFuture;

    struct StubSource;

    impl EventSource for StubSource {
        fn fetch_events<'a>(
            &'a self,
            _source_id: &'a str,
            _filters: &'a FilterOptions,
            _page: u32,
        ) -> FetchFuture<'a> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn events(n: usize) -> Vec<LogEvent> {
        (0..n)
            .map(|i| LogEvent {
                seq: i as u64,
                id: None,
                event_type: "validation".to_string(),
                level: LogLevel::Info,
                stage: None,
                timestamp: 0,
                message: format!("event {i}"),
                metadata: serde_json::Map::new(),
            })
            .collect()
    }

    fn app() -> App {
        App::new(Arc::new(StubSource), "job-1", 50, FilterOptions::default())
    }

    #[tokio::test]
    async fn test_cached_page_is_served_without_fetch() {
        let mut app = app();
        let key = QueryKey::new("job-1", FilterOptions::default(), 1);
        app.cache.begin(&key);
        app.cache.complete(&key, events(3));

        let request = app.viewer.begin_first_page();
        app.issue(request);

        // Served synchronously from the cache, no fetch spawned
        assert_eq!(app.viewer.events().len(), 3);
        assert!(app.outcome_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_outcome_marks_stale_over_data() {
        let mut app = app();
        let request = app.viewer.begin_first_page();
        let key = key_for(&request);

        app.on_outcome(FetchOutcome::Page {
            key: key.clone(),
            epoch: request.epoch,
            events: events(50),
        });
        app.handle_action(Action::LoadMore).unwrap();

        app.on_outcome(FetchOutcome::Failed {
            key,
            epoch: request.epoch,
            message: "connection timed out".to_string(),
        });
        assert!(app.viewer.is_stale());
    }

    #[tokio::test]
    async fn test_retry_does_not_stack_timers() {
        let mut app = app();
        let request = app.viewer.begin_first_page();
        app.on_outcome(FetchOutcome::Failed {
            key: key_for(&request),
            epoch: request.epoch,
            message: "boom".to_string(),
        });

        app.handle_action(Action::Retry).unwrap();
        assert!(app.retry.is_armed());
        // A second retry before the delay elapses changes nothing
        app.handle_action(Action::Retry).unwrap();
        assert!(app.retry.is_armed());
    }

    #[tokio::test]
    async fn test_refilter_back_to_in_flight_key_recovers_page() {
        let mut app = app();
        let first = app.viewer.begin_first_page();
        let key = key_for(&first);
        app.cache.begin(&key);

        // Edit away and back while page 1 is still out
        app.viewer
            .apply_filters(FilterOptions::default().with_level(Some(LogLevel::Error)));
        app.viewer.apply_filters(FilterOptions::default());
        let request = app.viewer.begin_first_page();
        // Same key, already loading: no second fetch starts
        app.issue(request);
        assert!(app.viewer.events().is_empty());

        // The superseded fetch resolves; its page must still reach the viewer
        app.on_outcome(FetchOutcome::Page {
            key,
            epoch: first.epoch,
            events: events(3),
        });
        assert_eq!(app.viewer.events().len(), 3);
        assert!(app.viewer.pending_page().is_none());
    }

    #[tokio::test]
    async fn test_refilter_back_to_in_flight_key_surfaces_failure() {
        let mut app = app();
        let first = app.viewer.begin_first_page();
        let key = key_for(&first);
        app.cache.begin(&key);

        app.viewer
            .apply_filters(FilterOptions::default().with_level(Some(LogLevel::Error)));
        app.viewer.apply_filters(FilterOptions::default());
        let request = app.viewer.begin_first_page();
        app.issue(request);

        app.on_outcome(FetchOutcome::Failed {
            key,
            epoch: first.epoch,
            message: "boom".to_string(),
        });

        // The error lands under the current epoch and retry is offered
        let action = app
            .viewer
            .handle_key_event(KeyEvent::from(KeyCode::Char('r')))
            .unwrap();
        assert!(matches!(action, Some(Action::Retry)));
    }

    #[tokio::test]
    async fn test_filter_edit_is_debounced() {
        let mut app = app();
        app.handle_action(Action::FiltersEdited(
            FilterOptions::default().with_level(Some(LogLevel::Error)),
        ))
        .unwrap();

        // Still pending: the debounce window has not elapsed
        assert!(app.debouncer.is_pending());
        assert_eq!(app.viewer.filters(), &FilterOptions::default());
    }
}

//! Log viewer component - virtualized, filterable run-event stream
//!
//! Owns the retrieval controller and all view state for one job's event
//! stream: selection, expand/collapse, search input, and the floating
//! filter panes. Only rows intersecting the viewport are rendered, using
//! the offset table from `logdeck_core::virt`.

use crate::action::Action;
use crate::components::{Component, StatusLine};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use logdeck_core::constants::{FOLLOW_THRESHOLD, SKELETON_ROWS};
use logdeck_core::event::{LogEvent, LogLevel};
use logdeck_core::filter::FilterOptions;
use logdeck_core::notify::{Notice, Notifier};
use logdeck_core::retrieval::{FetchPhase, FetchRequest, RetrievalController};
use logdeck_core::virt::{ExpandedSet, HeightConfig, RowLayout, ScrollState};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState,
    },
};
use std::collections::BTreeSet;

/// Extra rows rendered above/below the viewport for smooth scrolling
const OVERSCAN: usize = 2;

/// Search mode state
#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchMode {
    /// Not typing; an applied search may still be active in the filters
    Off,
    /// Typing a search query
    Input,
}

/// Which floating filter pane is open
#[derive(Debug, Clone, Copy, PartialEq)]
enum FloatingPane {
    None,
    Levels,
    Stages,
    Types,
}

impl FloatingPane {
    fn title(&self) -> &'static str {
        match self {
            FloatingPane::Levels => "─ Level ",
            FloatingPane::Stages => "─ Stage ",
            FloatingPane::Types => "─ Type ",
            FloatingPane::None => "",
        }
    }
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Error => Color::Red,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Info => Color::Green,
        LogLevel::Debug => Color::DarkGray,
    }
}

/// Message split into spans with search-term occurrences highlighted
///
/// Matching is case-insensitive; every occurrence is wrapped, not just the
/// first. Case folding can change byte length ('İ' folds to two chars), so
/// matches are found in a lowercase copy and mapped back to the original
/// string through a per-byte offset table; slices always land on the
/// original's char boundaries.
fn highlight_message(message: &str, query: &str) -> Vec<Span<'static>> {
    if query.is_empty() {
        return vec![Span::raw(message.to_string())];
    }

    let query_lower = query.to_lowercase();
    let mut lower = String::with_capacity(message.len());
    // origin[i] = byte offset in `message` of the char that produced byte i
    let mut origin: Vec<usize> = Vec::with_capacity(message.len() + 1);
    for (offset, ch) in message.char_indices() {
        for folded in ch.to_lowercase() {
            lower.push(folded);
            origin.resize(lower.len(), offset);
        }
    }
    origin.push(message.len());

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut last_end = 0;

    for (start, _) in lower.match_indices(&query_lower) {
        let orig_start = origin[start];
        let orig_end = origin[start + query_lower.len()];
        if orig_start < last_end || orig_end <= orig_start {
            continue;
        }
        if orig_start > last_end {
            spans.push(Span::raw(message[last_end..orig_start].to_string()));
        }
        spans.push(Span::styled(
            message[orig_start..orig_end].to_string(),
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ));
        last_end = orig_end;
    }

    if last_end < message.len() {
        spans.push(Span::raw(message[last_end..].to_string()));
    }

    if spans.is_empty() {
        vec![Span::raw(message.to_string())]
    } else {
        spans
    }
}

/// Empty-state copy: prompts differ with and without active filters
fn empty_state_text(filters_active: bool) -> (&'static str, &'static str) {
    if filters_active {
        (
            "No events match the current filters",
            "Adjust filters: [l] level  [s] stage  [t] type  [/] search  [Esc] clear search",
        )
    } else {
        (
            "No events yet",
            "Events will appear here once the run produces them",
        )
    }
}

/// Component for browsing one job's event stream
pub struct LogViewerComponent {
    /// Retrieval state machine (filters, pages, stale flag)
    controller: RetrievalController,
    /// Rows currently showing their metadata panel
    expanded: ExpandedSet,
    /// Cached offset table for virtualization
    layout: RowLayout,
    /// Viewport position and follow mode
    scroll: ScrollState,
    /// Status-line notice sink
    status: StatusLine,
    /// Selected row index
    selected: usize,
    /// Scroll to the selection on the next layout pass
    reveal_selected: bool,
    /// Search mode
    search_mode: SearchMode,
    /// Draft query while typing
    search_input: String,
    /// Which floating pane is open
    floating_pane: FloatingPane,
    /// Choices in the open pane ("(all)" first)
    pane_items: Vec<String>,
    /// Selected pane row
    pane_selected: usize,
    pane_state: ListState,
    /// End of the last rendered row range, for the load-more trigger
    last_visible_end: usize,
    /// Last known content viewport height
    viewport_height: u16,
}

impl LogViewerComponent {
    pub fn new(source_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            controller: RetrievalController::new(source_id, page_size),
            expanded: ExpandedSet::new(),
            layout: RowLayout::new(HeightConfig::default()),
            scroll: ScrollState::new(),
            status: StatusLine::new(),
            selected: 0,
            reveal_selected: false,
            search_mode: SearchMode::Off,
            search_input: String::new(),
            floating_pane: FloatingPane::None,
            pane_items: Vec::new(),
            pane_selected: 0,
            pane_state: ListState::default(),
            last_visible_end: 0,
            viewport_height: 20,
        }
    }

    // --- retrieval plumbing, driven by the App ---

    pub fn filters(&self) -> &FilterOptions {
        self.controller.filters()
    }

    pub fn events(&self) -> &[LogEvent] {
        self.controller.events()
    }

    pub fn source_id(&self) -> &str {
        self.controller.source_id()
    }

    pub fn epoch(&self) -> u64 {
        self.controller.epoch()
    }

    pub fn pending_page(&self) -> Option<u32> {
        self.controller.pending_page()
    }

    pub fn is_stale(&self) -> bool {
        self.controller.is_stale()
    }

    pub fn retry_count(&self) -> u32 {
        self.controller.retry_count()
    }

    pub fn begin_first_page(&mut self) -> FetchRequest {
        self.controller.begin_first_page()
    }

    pub fn load_more(&mut self) -> Option<FetchRequest> {
        self.controller.load_more()
    }

    pub fn retry_request(&mut self) -> FetchRequest {
        self.controller.retry_request()
    }

    /// Apply a debounced filter edit; returns false if nothing changed
    ///
    /// The reset clears everything derived from the previous epoch in the
    /// same call: accumulated events, expand state, offsets, selection.
    pub fn apply_filters(&mut self, filters: FilterOptions) -> bool {
        if !self.controller.set_filters(filters) {
            return false;
        }
        self.expanded.clear();
        self.layout.clear();
        self.scroll = ScrollState::new();
        self.selected = 0;
        self.last_visible_end = 0;
        true
    }

    /// A page arrived from the feed; epoch-checked by the controller
    pub fn on_page(&mut self, epoch: u64, events: Vec<LogEvent>) -> bool {
        let stick = self.scroll.following()
            || self.scroll.near_bottom(
                self.layout.total_height(),
                self.viewport_height,
                FOLLOW_THRESHOLD as u32,
            );
        if !self.controller.on_page(epoch, events) {
            return false;
        }
        if stick {
            self.scroll.resume_follow();
        }
        true
    }

    /// A fetch failed; epoch-checked by the controller
    pub fn on_error(&mut self, epoch: u64, message: impl Into<String>) -> bool {
        self.controller.on_error(epoch, message)
    }

    pub fn notify(&mut self, notice: Notice) {
        self.status.notify(notice);
    }

    // --- view-model edits ---

    fn select_by(&mut self, delta: i32) {
        let rows = self.controller.events().len();
        if rows == 0 {
            return;
        }
        let last = rows - 1;
        self.selected = self
            .selected
            .saturating_add_signed(delta as isize)
            .min(last);
        self.reveal_selected = true;
        if self.selected < last {
            self.scroll.pause_follow();
        }
    }

    fn select_first(&mut self) {
        self.selected = 0;
        self.scroll.to_top();
        self.reveal_selected = false;
    }

    fn select_last(&mut self) {
        let rows = self.controller.events().len();
        self.selected = rows.saturating_sub(1);
        self.scroll.resume_follow();
        self.reveal_selected = false;
    }

    /// Toggle the metadata panel of the selected row
    ///
    /// The offset invalidation happens in the same call as the state
    /// change; the next layout pass recomputes before anything renders.
    fn toggle_selected(&mut self) {
        let Some(event) = self.controller.events().get(self.selected) else {
            return;
        };
        if !event.has_metadata() {
            return;
        }
        self.expanded.toggle(self.selected);
        self.layout.invalidate_from(self.selected);
        self.reveal_selected = true;
    }

    fn open_pane(&mut self, pane: FloatingPane) {
        if self.floating_pane == pane {
            self.floating_pane = FloatingPane::None;
            return;
        }
        self.pane_items = match pane {
            FloatingPane::Levels => {
                let mut items = vec!["(all)".to_string()];
                items.extend(LogLevel::all().iter().map(|l| l.name().to_string()));
                items
            }
            FloatingPane::Stages => {
                let stages: BTreeSet<&str> = self
                    .controller
                    .events()
                    .iter()
                    .filter_map(|e| e.stage.as_deref())
                    .collect();
                let mut items = vec!["(all)".to_string()];
                items.extend(stages.into_iter().map(str::to_string));
                items
            }
            FloatingPane::Types => {
                let types: BTreeSet<&str> = self
                    .controller
                    .events()
                    .iter()
                    .map(|e| e.event_type.as_str())
                    .collect();
                let mut items = vec!["(all)".to_string()];
                items.extend(types.into_iter().map(str::to_string));
                items
            }
            FloatingPane::None => Vec::new(),
        };
        self.floating_pane = pane;
        self.pane_selected = 0;
        self.pane_state.select(Some(0));
    }

    /// Commit the pane choice as a filter edit
    fn pane_choice(&mut self) -> Option<Action> {
        let choice = self.pane_items.get(self.pane_selected)?.clone();
        let value = (choice != "(all)").then_some(choice);
        let filters = self.controller.filters().clone();
        let filters = match self.floating_pane {
            FloatingPane::Levels => {
                let level = value.and_then(|v| v.parse::<LogLevel>().ok());
                filters.with_level(level)
            }
            FloatingPane::Stages => filters.with_stage(value),
            FloatingPane::Types => filters.with_event_type(value),
            FloatingPane::None => return None,
        };
        self.floating_pane = FloatingPane::None;
        Some(Action::FiltersEdited(filters))
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.search_mode = SearchMode::Off;
                self.search_input.clear();
                None
            }
            KeyCode::Enter => {
                self.search_mode = SearchMode::Off;
                let query = self.search_input.trim().to_string();
                let filters = self
                    .controller
                    .filters()
                    .clone()
                    .with_search((!query.is_empty()).then_some(query));
                Some(Action::FiltersEdited(filters))
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.search_input.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_pane_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.floating_pane = FloatingPane::None;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.pane_selected = self.pane_selected.saturating_sub(1);
                self.pane_state.select(Some(self.pane_selected));
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.pane_selected =
                    (self.pane_selected + 1).min(self.pane_items.len().saturating_sub(1));
                self.pane_state.select(Some(self.pane_selected));
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.pane_choice(),
            _ => None,
        }
    }

    // --- rendering ---

    fn draw_skeleton(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        for _ in 0..SKELETON_ROWS {
            lines.push(Line::from(vec![
                Span::raw(" "),
                Span::raw("▒▒▒▒▒▒▒▒").dim(),
                Span::raw(" "),
                Span::raw("▒▒▒").dim(),
                Span::raw(" "),
                Span::raw("▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒").dim(),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_error(&self, frame: &mut Frame, area: Rect, error: &str) {
        let lines = vec![
            Line::from(vec![Span::raw(" Error: ").fg(Color::Red).bold()]),
            Line::from(vec![Span::raw(" "), Span::raw(error).fg(Color::White)]),
            Line::default(),
            Line::from(vec![
                Span::raw(" "),
                Span::raw("[r]").fg(Color::Yellow),
                Span::raw(" retry").dim(),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_empty(&self, frame: &mut Frame, area: Rect) {
        let (headline, hint) = empty_state_text(self.controller.filters().is_active());
        let lines = vec![
            Line::from(Span::raw(format!(" {headline}")).bold()),
            Line::from(Span::raw(format!(" {hint}")).dim()),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    /// Lines for one row: the event line plus its open metadata panel
    ///
    /// The line count must agree with the height oracle for this row.
    fn row_lines(&self, index: usize, event: &LogEvent, width: usize) -> Vec<Line<'static>> {
        let is_selected = index == self.selected;
        let query = self.controller.filters().search.as_deref().unwrap_or("");

        let mut spans: Vec<Span<'static>> = Vec::new();
        spans.push(if is_selected {
            Span::styled("▶", Style::default().fg(Color::Cyan))
        } else {
            Span::raw(" ")
        });

        spans.push(Span::styled(
            format!("{:>8}", event.local_time()),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::raw(" "));

        let level_style = Style::default()
            .fg(Color::Black)
            .bg(level_color(event.level))
            .add_modifier(Modifier::BOLD);
        spans.push(Span::styled(event.level.badge(), level_style));
        spans.push(Span::raw(" "));

        spans.push(Span::styled(
            format!("{:<10}", event.event_type),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::raw(" "));

        if let Some(stage) = &event.stage {
            spans.push(Span::styled(
                format!("({stage})"),
                Style::default().fg(Color::Magenta),
            ));
            spans.push(Span::raw(" "));
        }

        if event.has_metadata() {
            let marker = if self.expanded.contains(index) {
                "▾ "
            } else {
                "▸ "
            };
            spans.push(Span::raw(marker).dim());
        }

        let prefix_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let available = width.saturating_sub(prefix_width + 1);
        if event.message.chars().count() <= available {
            spans.extend(highlight_message(&event.message, query));
        } else {
            let truncated: String = event
                .message
                .chars()
                .take(available.saturating_sub(1))
                .collect();
            spans.extend(highlight_message(&truncated, query));
            spans.push(Span::raw("…").dim());
        }

        let mut lines = vec![Line::from(spans)];

        if self.expanded.contains(index) && event.has_metadata() {
            let panel_style = Style::default().fg(Color::DarkGray);
            lines.push(Line::from(Span::styled("   ╭─ metadata", panel_style)));
            for text_line in event.metadata_text().lines() {
                lines.push(Line::from(vec![
                    Span::styled("   │ ", panel_style),
                    Span::styled(text_line.to_string(), Style::default().fg(Color::Gray)),
                ]));
            }
            lines.push(Line::from(Span::styled("   ╰─", panel_style)));
        }

        lines
    }

    fn draw_events(&mut self, frame: &mut Frame, area: Rect) {
        self.viewport_height = area.height;

        if self.controller.loading_first() {
            self.draw_skeleton(frame, area);
            return;
        }

        let events = self.controller.events();
        if events.is_empty() {
            match self.controller.phase() {
                FetchPhase::Errored => {
                    let error = self.controller.last_error().unwrap_or("unknown").to_string();
                    self.draw_error(frame, area, &error);
                }
                FetchPhase::Ready => self.draw_empty(frame, area),
                _ => {}
            }
            self.last_visible_end = 0;
            return;
        }

        let rows = events.len();
        let line_counts: Vec<usize> = events.iter().map(LogEvent::metadata_line_count).collect();
        self.layout
            .sync(rows, &self.expanded, |i| line_counts[i]);

        let total = self.layout.total_height();
        let viewport = area.height;
        if self.reveal_selected {
            let top = self.layout.offset_of(self.selected);
            let bottom = top + u32::from(self.layout.height_of(self.selected));
            self.scroll.reveal(top, bottom, total, viewport);
            self.reveal_selected = false;
        } else if self.scroll.following() {
            self.scroll.to_bottom(total, viewport);
        } else {
            self.scroll.clamp(total, viewport);
        }

        let range = self
            .layout
            .visible_range(self.scroll.offset(), viewport, OVERSCAN);
        let content_width = area.width.saturating_sub(1) as usize;

        let mut lines: Vec<Line> = Vec::new();
        for index in range.clone() {
            lines.extend(self.row_lines(index, &events[index], content_width));
        }
        let skip = (self.scroll.offset() - self.layout.offset_of(range.start)) as usize;
        let visible: Vec<Line> = lines
            .into_iter()
            .skip(skip)
            .take(viewport as usize)
            .collect();
        frame.render_widget(Paragraph::new(visible), area);

        self.last_visible_end = self
            .layout
            .visible_range(self.scroll.offset(), viewport, 0)
            .end;

        if total > u32::from(viewport) {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut scrollbar_state = ScrollbarState::new(total as usize)
                .position(self.scroll.offset() as usize)
                .viewport_content_length(viewport as usize);
            frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
        }
    }

    fn draw_stale_banner(&self, frame: &mut Frame, area: Rect) {
        let banner = Line::from(vec![
            Span::styled(" ⚠ ", Style::default().fg(Color::Yellow).bold()),
            Span::raw("Connection lost - showing cached events"),
            Span::raw("  "),
            Span::styled("[R]", Style::default().fg(Color::Yellow)),
            Span::raw(" reconnect").dim(),
            Span::raw("  "),
            Span::styled("[r]", Style::default().fg(Color::Yellow)),
            Span::raw(" retry with backoff").dim(),
        ]);
        frame.render_widget(
            Paragraph::new(banner).style(Style::default().bg(Color::Black).fg(Color::Yellow)),
            area,
        );
    }

    fn draw_pane(&mut self, frame: &mut Frame, area: Rect) {
        if self.pane_items.is_empty() {
            return;
        }
        let max_len = self.pane_items.iter().map(String::len).max().unwrap_or(8);
        let panel_width =
            (max_len + 6).max(14).min((area.width as usize).saturating_sub(4)) as u16;
        let panel_height =
            (self.pane_items.len() + 2).min((area.height as usize).saturating_sub(2)) as u16;
        if panel_width < 4 || panel_height < 3 {
            return;
        }
        let panel_area = Rect::new(area.x + 1, area.y, panel_width, panel_height);

        frame.render_widget(Clear, panel_area);

        let active_value = match self.floating_pane {
            FloatingPane::Levels => self
                .controller
                .filters()
                .level
                .map(|l| l.name().to_string()),
            FloatingPane::Stages => self.controller.filters().stage.clone(),
            FloatingPane::Types => self.controller.filters().event_type.clone(),
            FloatingPane::None => None,
        };

        let items: Vec<ListItem> = self
            .pane_items
            .iter()
            .map(|item| {
                let is_active = match &active_value {
                    Some(value) => item == value,
                    None => item == "(all)",
                };
                let indicator = if is_active { "●" } else { "○" };
                ListItem::new(Line::from(vec![
                    Span::raw(indicator),
                    Span::raw(" "),
                    Span::raw(item.clone()),
                ]))
            })
            .collect();

        let border_style = Style::default().fg(Color::Cyan);
        let list = List::new(items)
            .block(
                Block::default()
                    .title(self.floating_pane.title())
                    .title_style(border_style)
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        frame.render_stateful_widget(list, panel_area, &mut self.pane_state);
    }

    fn footer_spans(&self) -> Vec<Span<'static>> {
        if self.search_mode == SearchMode::Input {
            vec![
                Span::raw(" Type to search").dim(),
                Span::raw("  "),
                Span::raw("[Enter]").fg(Color::Yellow),
                Span::raw(" apply").dim(),
                Span::raw("  "),
                Span::raw("[Esc]").fg(Color::Yellow),
                Span::raw(" cancel").dim(),
            ]
        } else if self.floating_pane != FloatingPane::None {
            vec![
                Span::raw(" [Enter]").fg(Color::Yellow),
                Span::raw(" select").dim(),
                Span::raw("  "),
                Span::raw("[Esc]").fg(Color::Yellow),
                Span::raw(" close").dim(),
            ]
        } else {
            vec![
                Span::raw(" [l]").fg(Color::Yellow),
                Span::raw(" level").dim(),
                Span::raw(" [s]").fg(Color::Yellow),
                Span::raw(" stage").dim(),
                Span::raw(" [t]").fg(Color::Yellow),
                Span::raw(" type").dim(),
                Span::raw(" [/]").fg(Color::Yellow),
                Span::raw(" search").dim(),
                Span::raw(" [Enter]").fg(Color::Yellow),
                Span::raw(" details").dim(),
                Span::raw(" [f]").fg(Color::Yellow),
                Span::raw(" follow").dim(),
                Span::raw(" [g/G]").fg(Color::Yellow),
                Span::raw(" top/bottom").dim(),
                Span::raw(" [q]").fg(Color::Yellow),
                Span::raw(" quit").dim(),
            ]
        }
    }
}

impl Component for LogViewerComponent {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.search_mode == SearchMode::Input {
            return Ok(self.handle_search_key(key));
        }
        if self.floating_pane != FloatingPane::None {
            return Ok(self.handle_pane_key(key));
        }

        match key.code {
            KeyCode::Char('q') => Ok(Some(Action::Quit)),
            KeyCode::Esc => {
                if self.controller.filters().search.is_some() {
                    let filters = self.controller.filters().clone().with_search(None);
                    Ok(Some(Action::FiltersEdited(filters)))
                } else {
                    Ok(Some(Action::Quit))
                }
            }

            KeyCode::Up | KeyCode::Char('k') => {
                self.select_by(-1);
                Ok(None)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_by(1);
                Ok(None)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.select_by(-i32::from((self.viewport_height / 2).max(1)));
                Ok(None)
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.select_by(i32::from((self.viewport_height / 2).max(1)));
                Ok(None)
            }
            KeyCode::PageUp => {
                self.select_by(-i32::from(self.viewport_height.max(1)));
                Ok(None)
            }
            KeyCode::PageDown => {
                self.select_by(i32::from(self.viewport_height.max(1)));
                Ok(None)
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.select_first();
                Ok(None)
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.select_last();
                Ok(None)
            }
            KeyCode::Char('f') => {
                if self.scroll.following() {
                    self.scroll.pause_follow();
                } else {
                    self.select_last();
                }
                Ok(None)
            }

            KeyCode::Enter | KeyCode::Char(' ') => {
                self.toggle_selected();
                Ok(None)
            }

            KeyCode::Char('l') => {
                self.open_pane(FloatingPane::Levels);
                Ok(None)
            }
            KeyCode::Char('s') => {
                self.open_pane(FloatingPane::Stages);
                Ok(None)
            }
            KeyCode::Char('t') => {
                self.open_pane(FloatingPane::Types);
                Ok(None)
            }
            KeyCode::Char('/') => {
                self.search_mode = SearchMode::Input;
                self.search_input = self
                    .controller
                    .filters()
                    .search
                    .clone()
                    .unwrap_or_default();
                Ok(None)
            }

            KeyCode::Char('r') => {
                if self.controller.last_error().is_some() {
                    Ok(Some(Action::Retry))
                } else {
                    Ok(None)
                }
            }
            KeyCode::Char('R') => {
                if self.controller.is_stale() || self.controller.last_error().is_some() {
                    Ok(Some(Action::Reconnect))
                } else {
                    Ok(None)
                }
            }

            _ => Ok(None),
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        let events = self.controller.events().len();
        if events == 0 {
            return Ok(None);
        }
        let total = self.layout.total_height();
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.scroll.scroll_by(-3, total, self.viewport_height);
            }
            MouseEventKind::ScrollDown => {
                self.scroll.scroll_by(3, total, self.viewport_height);
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        if let Action::Tick = action {
            self.status.tick();
            if self.controller.wants_more(self.last_visible_end) {
                return Ok(Some(Action::LoadMore));
            }
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let stale = self.controller.is_stale();
        let has_search_bar = self.search_mode == SearchMode::Input;
        let has_status = self.status.is_visible();

        let mut constraints = vec![Constraint::Length(2)];
        if stale {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Min(0));
        if has_search_bar {
            constraints.push(Constraint::Length(1));
        }
        if has_status {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(2));
        let chunks = Layout::vertical(constraints).split(area);
        let mut next = 0;
        let mut take = || {
            let chunk = chunks[next];
            next += 1;
            chunk
        };

        // Header
        let header_area = take();
        let follow_indicator = if self.scroll.following() {
            Span::styled("● LIVE ", Style::default().fg(Color::Green).bold())
        } else {
            Span::styled("○ PAUSED ", Style::default().fg(Color::DarkGray))
        };
        let mut header_spans = vec![
            Span::raw(" Run Events: ").bold().fg(Color::Cyan),
            Span::raw(self.controller.source_id().to_string()).fg(Color::White),
            Span::raw("  "),
            follow_indicator,
            Span::raw(format!(" [{} events]", self.controller.events().len())).dim(),
        ];
        let summary = self.controller.filters().summary();
        if !summary.is_empty() {
            header_spans.push(Span::raw("  "));
            header_spans.push(Span::styled(summary, Style::default().fg(Color::Yellow)));
        }
        if stale {
            header_spans.push(Span::raw("  "));
            header_spans.push(Span::styled(
                "⚠ STALE",
                Style::default().fg(Color::Yellow).bold(),
            ));
        }
        let header = Paragraph::new(Line::from(header_spans)).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(header, header_area);

        if stale {
            let banner_area = take();
            self.draw_stale_banner(frame, banner_area);
        }

        let content_area = take();
        self.draw_events(frame, content_area);
        if self.floating_pane != FloatingPane::None {
            self.draw_pane(frame, content_area);
        }

        if has_search_bar {
            let search_area = take();
            let search_line = Line::from(vec![
                Span::styled(" /", Style::default().fg(Color::Yellow)),
                Span::raw(self.search_input.clone()),
                Span::styled("█", Style::default().fg(Color::Yellow)),
            ]);
            frame.render_widget(Paragraph::new(search_line), search_area);
        }

        if has_status {
            let status_area = take();
            if let Some(line) = self.status.line() {
                frame.render_widget(Paragraph::new(line.clone()), status_area);
            }
        }

        let footer_area = take();
        let footer = Paragraph::new(Line::from(self.footer_spans()))
            .alignment(Alignment::Left)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        frame.render_widget(footer, footer_area);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(seq: u64, message: &str, metadata_pairs: &[(&str, serde_json::Value)]) -> LogEvent {
        let mut metadata = serde_json::Map::new();
        for (k, v) in metadata_pairs {
            metadata.insert((*k).to_string(), v.clone());
        }
        LogEvent {
            seq,
            id: None,
            event_type: "validation".to_string(),
            level: LogLevel::Info,
            stage: None,
            timestamp: 0,
            message: message.to_string(),
            metadata,
        }
    }

    #[test]
    fn test_highlight_wraps_every_occurrence() {
        let spans = highlight_message("error then ERROR again", "error");
        let highlighted: Vec<&str> = spans
            .iter()
            .filter(|s| s.style.bg == Some(Color::Yellow))
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(highlighted, vec!["error", "ERROR"]);
    }

    #[test]
    fn test_highlight_empty_query_is_single_span() {
        let spans = highlight_message("plain message", "");
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_highlight_survives_length_changing_case_folds() {
        // 'İ' lowercases to two chars; offsets in the folded copy diverge
        // from the original past that point
        let spans = highlight_message("İstanbul node: boot error", "error");
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "İstanbul node: boot error");

        let highlighted: Vec<&str> = spans
            .iter()
            .filter(|s| s.style.bg == Some(Color::Yellow))
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(highlighted, vec!["error"]);
    }

    #[test]
    fn test_empty_state_copy_varies_with_filters() {
        let (with_filters, _) = empty_state_text(true);
        let (without, hint) = empty_state_text(false);
        assert!(with_filters.contains("filter"));
        assert!(without.contains("No events"));
        assert!(hint.contains("appear"));
    }

    #[test]
    fn test_toggle_requires_metadata() {
        let mut viewer = LogViewerComponent::new("job-1", 50);
        let epoch = viewer.begin_first_page().epoch;
        viewer.on_page(
            epoch,
            vec![
                event(1, "bare", &[]),
                event(2, "rich", &[("rule", json!("E501"))]),
            ],
        );

        viewer.selected = 0;
        viewer.toggle_selected();
        assert!(viewer.expanded.is_empty());

        viewer.selected = 1;
        viewer.toggle_selected();
        assert!(viewer.expanded.contains(1));
    }

    #[test]
    fn test_filter_edit_resets_view_state() {
        let mut viewer = LogViewerComponent::new("job-1", 50);
        let epoch = viewer.begin_first_page().epoch;
        viewer.on_page(
            epoch,
            vec![event(1, "a", &[("k", json!(1))]), event(2, "b", &[])],
        );
        viewer.selected = 1;
        viewer.expanded.toggle(0);

        let changed = viewer.apply_filters(
            FilterOptions::default().with_level(Some(LogLevel::Error)),
        );
        assert!(changed);
        assert_eq!(viewer.selected, 0);
        assert!(viewer.expanded.is_empty());
        assert!(viewer.controller.events().is_empty());
    }

    #[test]
    fn test_cross_epoch_page_ignored_by_view() {
        let mut viewer = LogViewerComponent::new("job-1", 50);
        let old_epoch = viewer.begin_first_page().epoch;
        viewer.apply_filters(FilterOptions::default().with_search(Some("x".to_string())));

        assert!(!viewer.on_page(old_epoch, vec![event(1, "late", &[])]));
        assert!(viewer.controller.events().is_empty());
    }

    #[test]
    fn test_retry_action_requires_error() {
        let mut viewer = LogViewerComponent::new("job-1", 50);
        let key = KeyEvent::from(KeyCode::Char('r'));
        assert!(viewer.handle_key_event(key).unwrap().is_none());

        let epoch = viewer.begin_first_page().epoch;
        viewer.on_error(epoch, "boom");
        let action = viewer.handle_key_event(key).unwrap();
        assert!(matches!(action, Some(Action::Retry)));
    }

    #[test]
    fn test_level_pane_choice_emits_filter_edit() {
        let mut viewer = LogViewerComponent::new("job-1", 50);
        viewer.open_pane(FloatingPane::Levels);
        // "(all)", then Error
        viewer.pane_selected = 1;
        let action = viewer.pane_choice().unwrap();
        match action {
            Action::FiltersEdited(filters) => {
                assert_eq!(filters.level, Some(LogLevel::Error));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}

//! Status line: the presentation sink for notices
//!
//! Implements the core's [`Notifier`] contract; notices show in a single
//! status line and expire after a fixed TTL.

use logdeck_core::constants::NOTICE_TTL;
use logdeck_core::notify::{Notice, Notifier};
use ratatui::{
    style::{Color, Style, Stylize},
    text::{Line, Span},
};
use std::time::Instant;

/// One-slot notice display with expiry
#[derive(Debug, Default)]
pub struct StatusLine {
    current: Option<(Notice, Instant)>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the notice once its TTL has elapsed; called from the tick
    pub fn tick(&mut self) {
        if let Some((_, shown_at)) = &self.current
            && shown_at.elapsed() >= NOTICE_TTL
        {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    /// Render the current notice, if any
    pub fn line(&self) -> Option<Line<'_>> {
        let (notice, _) = self.current.as_ref()?;
        let mut spans = vec![
            Span::styled(" ℹ ", Style::default().fg(Color::Cyan)),
            Span::raw(notice.message.as_str()),
        ];
        if let Some(description) = &notice.description {
            spans.push(Span::raw(" - ").dim());
            spans.push(Span::raw(description.as_str()).dim());
        }
        if let Some(action) = &notice.action {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("[{}]", action.label),
                Style::default().fg(Color::Yellow),
            ));
        }
        Some(Line::from(spans))
    }
}

impl Notifier for StatusLine {
    fn notify(&mut self, notice: Notice) {
        self.current = Some((notice, Instant::now()));
    }
}

//! JSONL-backed reference event source
//!
//! Reads an append-only `.jsonl` file where each line is one event, applies
//! the filter predicate, and serves fixed-size pages in ascending `seq`
//! order. Re-reading the file on every fetch keeps the source idempotent
//! and picks up appended events without any push machinery.

use crate::error::FeedError;
use crate::source::{EventSource, FetchFuture};
use logdeck_core::event::LogEvent;
use logdeck_core::filter::FilterOptions;
use std::path::PathBuf;

/// Event source backed by a JSONL file on disk
pub struct JsonlSource {
    path: PathBuf,
    page_size: usize,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            path: path.into(),
            page_size: page_size.max(1),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn parse(text: &str) -> Result<Vec<LogEvent>, FeedError> {
        let mut events = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: LogEvent = serde_json::from_str(line).map_err(|e| {
                FeedError::Malformed(format!("line {}: {}", lineno + 1, e))
            })?;
            events.push(event);
        }
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }
}

impl EventSource for JsonlSource {
    fn fetch_events<'a>(
        &'a self,
        source_id: &'a str,
        filters: &'a FilterOptions,
        page: u32,
    ) -> FetchFuture<'a> {
        Box::pin(async move {
            tracing::debug!(source_id, page, "reading event feed");
            let text = tokio::fs::read_to_string(&self.path).await?;
            let mut events = Self::parse(&text)?;
            events.retain(|e| filters.matches(e));

            let start = (page.max(1) as usize - 1) * self.page_size;
            let page_events: Vec<LogEvent> = events
                .into_iter()
                .skip(start)
                .take(self.page_size)
                .collect();
            tracing::debug!(source_id, page, count = page_events.len(), "page served");
            Ok(page_events)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::event::LogLevel;
    use std::io::Write;

    fn feed_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn line(seq: u64, level: &str, message: &str) -> String {
        format!(
            r#"{{"seq":{seq},"type":"validation","level":"{level}","timestamp":{},"message":"{message}"}}"#,
            1_724_300_000_000u64 + seq
        )
    }

    #[tokio::test]
    async fn test_pages_in_seq_order() {
        // Lines deliberately out of order
        let lines = [line(3, "info", "c"), line(1, "info", "a"), line(2, "info", "b")];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = feed_file(&refs);

        let source = JsonlSource::new(file.path(), 2);
        let filters = FilterOptions::default();

        let page1 = source.fetch_events("job-1", &filters, 1).await.unwrap();
        assert_eq!(page1.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2]);

        // Short second page signals exhaustion
        let page2 = source.fetch_events("job-1", &filters, 2).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].seq, 3);
    }

    #[tokio::test]
    async fn test_filters_apply_before_paging() {
        let lines = [
            line(1, "info", "fine"),
            line(2, "error", "boom"),
            line(3, "info", "fine again"),
            line(4, "error", "boom again"),
        ];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = feed_file(&refs);

        let source = JsonlSource::new(file.path(), 10);
        let filters = FilterOptions::default().with_level(Some(LogLevel::Error));

        let page = source.fetch_events("job-1", &filters, 1).await.unwrap();
        assert_eq!(page.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_malformed_line_is_hard_error() {
        let lines = [line(1, "info", "ok"), "{not json".to_string()];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = feed_file(&refs);

        let source = JsonlSource::new(file.path(), 10);
        let result = source
            .fetch_events("job-1", &FilterOptions::default(), 1)
            .await;
        assert!(matches!(result, Err(FeedError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = JsonlSource::new("/nonexistent/run.jsonl", 10);
        let result = source
            .fetch_events("job-1", &FilterOptions::default(), 1)
            .await;
        assert!(matches!(result, Err(FeedError::Io(_))));
    }

    #[tokio::test]
    async fn test_blank_lines_skipped() {
        let lines = [line(1, "info", "ok"), String::new(), line(2, "info", "ok")];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = feed_file(&refs);

        let source = JsonlSource::new(file.path(), 10);
        let page = source
            .fetch_events("job-1", &FilterOptions::default(), 1)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_passes_through() {
        let lines = [format!(
            r#"{{"seq":1,"type":"validation","level":"warn","timestamp":0,"message":"lint","rule":"E501","file":"a.py"}}"#
        )];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = feed_file(&refs);

        let source = JsonlSource::new(file.path(), 10);
        let page = source
            .fetch_events("job-1", &FilterOptions::default(), 1)
            .await
            .unwrap();
        assert!(page[0].has_metadata());
        assert_eq!(page[0].metadata.len(), 2);
    }
}

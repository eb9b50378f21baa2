//! logdeck: A terminal UI for browsing validation run event streams

use chrono::{DateTime, Utc};
use clap::Parser;
use color_eyre::Result;
use logdeck_core::constants::PAGE_SIZE;
use logdeck_core::event::LogLevel;
use logdeck_core::filter::FilterOptions;
use logdeck_feed::jsonl::JsonlSource;
use logdeck_tui::App;
use std::fs::File;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{EnvFilter, prelude::*};

/// logdeck: Terminal UI for validation run event streams
#[derive(Parser, Debug)]
#[command(name = "logdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSONL event feed
    feed: String,

    /// Job identifier shown in the header and used as the cache key
    #[arg(short, long, default_value = "local")]
    job: String,

    /// Events fetched per page
    #[arg(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Only show events at this level (error, warn, info, debug)
    #[arg(short, long)]
    level: Option<LogLevel>,

    /// Only show events from this pipeline stage
    #[arg(short, long)]
    stage: Option<String>,

    /// Only show events of this type
    #[arg(short = 't', long = "type")]
    event_type: Option<String>,

    /// Only show events whose message contains this text
    #[arg(long)]
    search: Option<String>,

    /// Only show events at or after this time (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    since: Option<DateTime<Utc>>,

    /// Only show events at or before this time (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    until: Option<DateTime<Utc>>,

    /// Disable mouse capture (keeps native terminal text selection)
    #[arg(long)]
    no_mouse: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log file path (default: /tmp/logdeck.log)
    #[arg(long, default_value = "/tmp/logdeck.log")]
    log_file: String,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp {value:?}: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    color_eyre::install()?;

    // Log to file, not stdout, which would corrupt the TUI
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let log_file = File::create(&cli.log_file)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(true)
                .with_target(false),
        )
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    tracing::info!(feed = %cli.feed, job = %cli.job, "Starting logdeck");

    let filters = FilterOptions::default()
        .with_level(cli.level)
        .with_stage(cli.stage)
        .with_event_type(cli.event_type)
        .with_search(cli.search)
        .with_range(cli.since, cli.until);

    let source = Arc::new(JsonlSource::new(&cli.feed, cli.page_size));
    let mut app =
        App::new(source, cli.job, cli.page_size, filters).mouse_capture(!cli.no_mouse);
    app.run().await?;

    tracing::info!("Goodbye!");
    Ok(())
}

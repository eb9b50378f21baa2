//! logdeck-feed: Event source abstraction for logdeck
//!
//! The event-producing pipeline is an external collaborator; this crate
//! owns the seam. [`EventSource`] is the paginated query contract the core
//! consumes, [`FeedError`] its failure taxonomy, and [`JsonlSource`] a
//! reference implementation backed by an append-only JSONL file.

pub mod error;
pub mod jsonl;
pub mod source;

pub use error::FeedError;
pub use jsonl::JsonlSource;
pub use source::{EventSource, FetchFuture};

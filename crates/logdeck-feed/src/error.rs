//! Feed error taxonomy

use thiserror::Error;

/// Errors surfaced by an [`crate::EventSource`]
///
/// A response that is not a sequence of events is a hard fetch error
/// ([`FeedError::Malformed`]), never silently swallowed. Unknown extra
/// fields inside an event's metadata bag are not an error.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed could not be read at all
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The feed returned something that is not a page of events
    #[error("malformed event feed: {0}")]
    Malformed(String),

    /// The feed is temporarily unreachable
    #[error("event feed unavailable: {0}")]
    Unavailable(String),
}

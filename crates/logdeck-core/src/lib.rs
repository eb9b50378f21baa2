//! logdeck-core: Core domain logic for logdeck
//!
//! This crate contains the event model, filtering, retrieval orchestration,
//! and virtualization math for the log viewer. It is intentionally kept
//! independent of any TUI framework to enable:
//!
//! - Unit testing without UI dependencies
//! - Reuse in CLI tools or other consumers
//! - Clear separation between retrieval logic and presentation
//!
//! # Modules
//!
//! - [`event`] - The [`LogEvent`] record and its metadata bag
//! - [`filter`] - Immutable [`FilterOptions`] query predicate
//! - [`query`] - Keyed query cache and filter-edit debouncing
//! - [`retrieval`] - Page-by-page accumulation state machine
//! - [`retry`] - Bounded exponential backoff for failed fetches
//! - [`virt`] - Row height oracle and virtual window math
//! - [`notify`] - User-facing notification types
//! - [`errors`] - Error formatting utilities for user-friendly messages
//! - [`constants`] - Shared constants (page size, debounce window, thresholds)

pub mod constants;
pub mod errors;
pub mod event;
pub mod filter;
pub mod notify;
pub mod query;
pub mod retrieval;
pub mod retry;
pub mod virt;

// Re-export commonly used items at crate root
pub use errors::*;
pub use event::*;
pub use filter::*;
pub use notify::*;
pub use query::*;
pub use retrieval::*;
pub use retry::*;
pub use virt::*;

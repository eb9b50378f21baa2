//! logdeck-tui: Ratatui presentation layer for logdeck
//!
//! Built on the component pattern: the [`App`] runs the event loop and
//! dispatches [`action::Action`]s; components own their view state, handle
//! keys, and draw themselves. All retrieval state lives in `logdeck-core`;
//! this crate only binds it to the terminal.

pub mod action;
pub mod app;
pub mod components;
pub mod tui;

pub use app::App;

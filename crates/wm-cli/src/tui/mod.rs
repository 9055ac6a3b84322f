//! Terminal User Interface module using ratatui.
//!
//! Sidebar with workspaces and recent analyses, a scrollable transcript with
//! citation badges, a status bar, and the composer.

mod app;
mod events;
mod scroll;
mod ui;
mod widgets;

pub use app::run_tui;

//! TUI Widget components.

pub mod citation_popup;
pub mod input_area;
pub mod message_list;
pub mod sidebar;
pub mod status_bar;

pub use citation_popup::CitationPopup;
pub use input_area::{InputArea, InputHistory};
pub use message_list::{transcript_lines, wrapped_height, BadgeSelection, MessageList};
pub use sidebar::Sidebar;
pub use status_bar::StatusBar;

//! Keyboard input mapping for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Input action from keyboard events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Character input
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    /// Move cursor to start of line
    Home,
    /// Move cursor to end of line
    End,
    /// Delete word before cursor
    DeleteWord,
    /// Send the composer text, or open the selected citation when empty
    Submit,
    /// Insert a line break into the composer
    Newline,
    HistoryUp,
    HistoryDown,
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    /// Select the next citation of the latest cited reply
    NextCitation,
    /// Select the previous citation of the latest cited reply
    PrevCitation,
    OpenCitation,
    CloseCitation,
    ToggleSidebar,
    /// Cancel the outstanding request (quits when idle)
    Cancel,
    Quit,
}

/// Convert key event to input action
pub fn key_to_action(key: KeyEvent, awaiting: bool) -> Option<InputAction> {
    match (key.code, key.modifiers) {
        // Quit
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => Some(InputAction::Quit),
        (KeyCode::Char('q'), KeyModifiers::CONTROL) => Some(InputAction::Quit),

        // Cancel
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(InputAction::Cancel),
        (KeyCode::Esc, _) if awaiting => Some(InputAction::Cancel),

        (KeyCode::Enter, KeyModifiers::NONE) => Some(InputAction::Submit),
        // Alt+Enter for terminals that do not report Shift+Enter
        (KeyCode::Enter, KeyModifiers::SHIFT) | (KeyCode::Enter, KeyModifiers::ALT) => {
            Some(InputAction::Newline)
        }

        // Citations
        (KeyCode::Tab, KeyModifiers::NONE) => Some(InputAction::NextCitation),
        (KeyCode::BackTab, _) => Some(InputAction::PrevCitation),
        (KeyCode::Char('o'), KeyModifiers::CONTROL) => Some(InputAction::OpenCitation),

        (KeyCode::Char('b'), KeyModifiers::CONTROL) => Some(InputAction::ToggleSidebar),

        // Navigation
        (KeyCode::Up, KeyModifiers::NONE) => Some(InputAction::HistoryUp),
        (KeyCode::Down, KeyModifiers::NONE) => Some(InputAction::HistoryDown),
        (KeyCode::Left, KeyModifiers::NONE) => Some(InputAction::Left),
        (KeyCode::Right, KeyModifiers::NONE) => Some(InputAction::Right),
        (KeyCode::Home, KeyModifiers::NONE) => Some(InputAction::Home),
        (KeyCode::End, KeyModifiers::NONE) => Some(InputAction::End),

        // Scrolling
        (KeyCode::PageUp, _) => Some(InputAction::PageUp),
        (KeyCode::PageDown, _) => Some(InputAction::PageDown),
        (KeyCode::Home, KeyModifiers::CONTROL) => Some(InputAction::ScrollToTop),
        (KeyCode::End, KeyModifiers::CONTROL) => Some(InputAction::ScrollToBottom),

        // Editing
        (KeyCode::Backspace, KeyModifiers::NONE) => Some(InputAction::Backspace),
        (KeyCode::Delete, KeyModifiers::NONE) => Some(InputAction::Delete),
        (KeyCode::Char('w'), KeyModifiers::CONTROL) => Some(InputAction::DeleteWord),

        (KeyCode::Char(c), KeyModifiers::NONE) => Some(InputAction::Char(c)),
        (KeyCode::Char(c), KeyModifiers::SHIFT) => Some(InputAction::Char(c)),

        _ => None,
    }
}

/// Key handling while the citation popup is open.
pub fn popup_key_to_action(key: KeyEvent) -> Option<InputAction> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => Some(InputAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(InputAction::Cancel),
        (KeyCode::Tab, KeyModifiers::NONE) | (KeyCode::Right, _) => Some(InputAction::NextCitation),
        (KeyCode::BackTab, _) | (KeyCode::Left, _) => Some(InputAction::PrevCitation),
        (KeyCode::Esc, _) | (KeyCode::Enter, _) | (KeyCode::Char('q'), KeyModifiers::NONE) => {
            Some(InputAction::CloseCitation)
        }
        _ => None,
    }
}

//! Composer widget and its persisted history.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use serde::{Deserialize, Serialize};
use tui_input::Input;
use unicode_width::UnicodeWidthChar;

/// Maximum number of history entries to persist
const MAX_HISTORY_ENTRIES: usize = 1000;

const PROMPT: &str = "you> ";
const PLACEHOLDER: &str = "Ask WorkMate anything about your workspace...";

/// Composer: prompt, wrapped draft text, cursor and a hint line.
pub struct InputArea<'a> {
    input: &'a Input,
    can_send: bool,
    hint: Option<&'a str>,
}

impl<'a> InputArea<'a> {
    pub fn new(input: &'a Input) -> Self {
        Self {
            input,
            can_send: true,
            hint: None,
        }
    }

    /// Dim the prompt when Enter would not send.
    pub fn can_send(mut self, can_send: bool) -> Self {
        self.can_send = can_send;
        self
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Rows needed to show `text` at `width`, including border and hint.
    pub fn height_for(text: &str, width: u16) -> u16 {
        let rows = wrap_rows(text, width.saturating_sub(PROMPT.len() as u16) as usize, width as usize);
        (rows.len() as u16 + 2).clamp(3, 8)
    }
}

/// One composer row: its text and the char offset where it starts in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Row<'a> {
    text: &'a str,
    start: usize,
}

/// Split `text` into rows at newlines and at the row width: the first row is
/// `first_width` wide, the rest `width`.
fn wrap_rows(text: &str, first_width: usize, width: usize) -> Vec<Row<'_>> {
    if first_width == 0 || width == 0 {
        return vec![Row { text: "", start: 0 }];
    }

    let mut rows = Vec::new();
    let mut start = 0;
    let mut row_width = first_width;

    for line in text.split('\n') {
        let mut remaining = line;
        loop {
            let mut used = 0;
            let mut split = remaining.len();
            for (idx, ch) in remaining.char_indices() {
                let w = UnicodeWidthChar::width(ch).unwrap_or(0);
                if used + w > row_width {
                    split = idx;
                    break;
                }
                used += w;
            }
            if split == 0 {
                // A character wider than the row still has to go somewhere.
                split = remaining.chars().next().map_or(0, char::len_utf8);
            }
            let (row, rest) = remaining.split_at(split);
            rows.push(Row { text: row, start });
            start += row.chars().count();
            remaining = rest;
            row_width = width;
            if remaining.is_empty() {
                break;
            }
        }
        // The newline itself
        start += 1;
    }

    rows
}

/// Row index and column (in chars) of `cursor` among `rows`.
fn cursor_position(rows: &[Row], cursor: usize) -> (usize, usize) {
    for (i, row) in rows.iter().enumerate() {
        if cursor <= row.start + row.text.chars().count() {
            return (i, cursor.saturating_sub(row.start));
        }
    }
    let last = rows.len().saturating_sub(1);
    let column = rows.last().map_or(0, |row| row.text.chars().count());
    (last, column)
}

impl Widget for InputArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width as usize <= PROMPT.len() || inner.height == 0 {
            return;
        }

        let prompt_style = if self.can_send {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let text_style = Style::default().fg(Color::White);

        let value = self.input.value();
        let first_width = inner.width as usize - PROMPT.len();
        let full_width = inner.width as usize;
        let rows = wrap_rows(value, first_width, full_width);
        let text_rows = inner.height.saturating_sub(1).max(1) as usize;

        for (i, row) in rows.iter().take(text_rows).enumerate() {
            let line = if i == 0 {
                let body = if value.is_empty() {
                    Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray))
                } else {
                    Span::styled(row.text, text_style)
                };
                Line::from(vec![Span::styled(PROMPT, prompt_style), body])
            } else {
                Line::from(Span::styled(row.text, text_style))
            };
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }

        let (cursor_row, cursor_col) = cursor_position(&rows, self.input.visual_cursor());
        let row_text = rows.get(cursor_row).map_or("", |row| row.text);
        let col: usize = row_text
            .chars()
            .take(cursor_col)
            .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
            .sum();
        let x = inner.x + col as u16 + if cursor_row == 0 { PROMPT.len() as u16 } else { 0 };
        let y = inner.y + cursor_row as u16;
        if cursor_row < text_rows && x < inner.right() {
            // An empty draft shows the placeholder, which stays readable under the cursor.
            let under = if value.is_empty() {
                PLACEHOLDER.chars().next()
            } else {
                row_text.chars().nth(cursor_col)
            };
            buf.set_string(
                x,
                y,
                under.unwrap_or(' ').to_string(),
                Style::default().bg(Color::White).fg(Color::Black),
            );
        }

        if let Some(hint) = self.hint {
            let hint_y = inner.bottom().saturating_sub(1);
            if hint_y > inner.y {
                buf.set_string(inner.x, hint_y, hint, Style::default().fg(Color::DarkGray));
            }
        }
    }
}

/// A single history entry with metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// File format for persisted history
#[derive(Serialize, Deserialize)]
struct PersistedHistory {
    version: u32,
    entries: Vec<HistoryEntry>,
}

/// Composer history for Up/Down navigation.
#[derive(Clone, Default)]
pub struct InputHistory {
    entries: Vec<HistoryEntry>,
    position: Option<usize>,
    stashed_draft: String,
}

impl InputHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing or unreadable file yields empty history.
    pub fn load(path: &Path) -> Self {
        let entries = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<PersistedHistory>(&content).ok())
            .map(|persisted| persisted.entries)
            .unwrap_or_default();
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = PersistedHistory {
            version: 1,
            entries: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(path, content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a submitted entry. Blank entries are skipped and repeats move
    /// to the newest position.
    pub fn add(&mut self, text: &str) {
        self.reset();
        if text.trim().is_empty() {
            return;
        }

        self.entries.retain(|e| e.text != text);
        self.entries.push(HistoryEntry {
            text: text.to_string(),
            timestamp: Utc::now(),
        });

        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let excess = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(0..excess);
        }
    }

    /// Step to an older entry, stashing `draft` on the first step.
    pub fn navigate_up(&mut self, draft: &str) -> Option<&str> {
        let newest = self.entries.len().checked_sub(1)?;
        let position = match self.position {
            None => {
                self.stashed_draft = draft.to_string();
                newest
            }
            Some(pos) => pos.saturating_sub(1),
        };
        self.position = Some(position);
        Some(&self.entries[position].text)
    }

    /// Step to a newer entry; past the newest, the stashed draft comes back.
    pub fn navigate_down(&mut self) -> Option<&str> {
        let pos = self.position?;
        if pos + 1 < self.entries.len() {
            self.position = Some(pos + 1);
            Some(&self.entries[pos + 1].text)
        } else {
            self.position = None;
            Some(&self.stashed_draft)
        }
    }

    pub fn reset(&mut self) {
        self.position = None;
        self.stashed_draft.clear();
    }
}

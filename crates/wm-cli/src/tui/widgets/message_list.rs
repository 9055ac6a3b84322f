//! Scrollable transcript of the conversation.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Widget, Wrap},
};

use wm_core::{Message, Role};

use crate::markdown::{citation_badge, citation_badge_style, render_to_text};

/// A citation badge to highlight: message index and citation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeSelection {
    pub message: usize,
    pub number: u32,
}

/// Build the transcript lines for `messages` at `width` columns.
pub fn transcript_lines(
    messages: &[Message],
    selection: Option<BadgeSelection>,
    awaiting: bool,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for (index, message) in messages.iter().enumerate() {
        lines.push(role_label(message.role));

        let mut body = render_to_text(&message.content, &message.citations, width);
        if let Some(selected) = selection.filter(|s| s.message == index) {
            highlight_badge(&mut body, selected.number);
        }
        lines.extend(body.lines.into_iter().map(indent));
        lines.push(Line::default());
    }

    if awaiting {
        lines.push(role_label(Role::Assistant));
        lines.push(Line::from(Span::styled(
            "  Thinking...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn role_label(role: Role) -> Line<'static> {
    let color = match role {
        Role::User => Color::Cyan,
        Role::Assistant => Color::Magenta,
    };
    Line::from(Span::styled(
        role.display_name(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn indent(line: Line<'static>) -> Line<'static> {
    if line.spans.is_empty() {
        return line;
    }
    let mut spans = Vec::with_capacity(line.spans.len() + 1);
    spans.push(Span::raw("  "));
    spans.extend(line.spans);
    Line::from(spans)
}

fn highlight_badge(text: &mut Text<'static>, number: u32) {
    let badge = citation_badge(number);
    let badge_style = citation_badge_style();
    for span in text.lines.iter_mut().flat_map(|l| l.spans.iter_mut()) {
        if span.style == badge_style && span.content == badge.as_str() {
            span.style = badge_style.add_modifier(Modifier::REVERSED);
        }
    }
}

/// Rows `lines` occupy once word-wrapped at `width` the way [`MessageList`] draws them.
pub fn wrapped_height(lines: &[Line<'static>], width: u16) -> u16 {
    let rows = transcript_paragraph(lines).line_count(width.max(1));
    rows.min(u16::MAX as usize) as u16
}

fn transcript_paragraph(lines: &[Line<'static>]) -> Paragraph<'static> {
    Paragraph::new(Text::from(lines.to_vec())).wrap(Wrap { trim: false })
}

pub struct MessageList<'a> {
    lines: &'a [Line<'static>],
    scroll_offset: u16,
}

impl<'a> MessageList<'a> {
    pub fn new(lines: &'a [Line<'static>]) -> Self {
        Self {
            lines,
            scroll_offset: 0,
        }
    }

    pub fn scroll(mut self, offset: u16) -> Self {
        self.scroll_offset = offset;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.lines.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "Ask WorkMate anything about your workspace to get started.",
                Style::default().fg(Color::DarkGray),
            )))
            .render(area, buf);
            return;
        }

        transcript_paragraph(self.lines)
            .scroll((self.scroll_offset, 0))
            .render(area, buf);
    }
}

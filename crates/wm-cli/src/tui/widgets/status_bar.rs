//! Status bar widget showing backend, transcript size, and status information.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Status bar display state
pub struct StatusBar<'a> {
    backend: &'a str,
    message_count: usize,
    is_waiting: bool,
    citation: Option<(usize, usize)>,
    status_message: Option<&'a str>,
}

impl<'a> StatusBar<'a> {
    pub fn new(backend: &'a str) -> Self {
        Self {
            backend,
            message_count: 0,
            is_waiting: false,
            citation: None,
            status_message: None,
        }
    }

    pub fn messages(mut self, count: usize) -> Self {
        self.message_count = count;
        self
    }

    pub fn waiting(mut self, is_waiting: bool) -> Self {
        self.is_waiting = is_waiting;
        self
    }

    /// Selected citation as (1-based position, total).
    pub fn citation(mut self, selection: Option<(usize, usize)>) -> Self {
        self.citation = selection;
        self
    }

    pub fn status(mut self, message: Option<&'a str>) -> Self {
        self.status_message = message;
        self
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style_label = Style::default().fg(Color::DarkGray);
        let style_value = Style::default().fg(Color::White);

        let mut spans = vec![
            Span::styled(" Backend: ", style_label),
            Span::styled(self.backend, style_value),
            Span::styled(" | Messages: ", style_label),
            Span::styled(self.message_count.to_string(), style_value),
        ];

        if self.is_waiting {
            spans.push(Span::styled(" | ", style_label));
            spans.push(Span::styled(
                "WAITING",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ));
        }

        if let Some((position, total)) = self.citation {
            spans.push(Span::styled(" | Citation ", style_label));
            spans.push(Span::styled(
                format!("{}/{}", position, total),
                Style::default().fg(Color::Magenta),
            ));
        }

        if let Some(msg) = self.status_message {
            let color = if msg.starts_with("Error") { Color::Red } else { Color::Yellow };
            spans.push(Span::styled(" | ", style_label));
            spans.push(Span::styled(msg, Style::default().fg(color)));
        }

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}

//! Popup showing the source and excerpt behind a citation badge.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use wm_core::Citation;

use crate::markdown::citation_badge;

pub struct CitationPopup<'a> {
    citation: &'a Citation,
}

impl<'a> CitationPopup<'a> {
    pub fn new(citation: &'a Citation) -> Self {
        Self { citation }
    }

    /// Centered area for the popup inside `area`.
    pub fn area(area: Rect) -> Rect {
        let width = 64u16.min(area.width.saturating_sub(4));
        let height = 12u16.min(area.height.saturating_sub(2));
        Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        )
    }
}

impl Widget for CitationPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let lines = vec![
            Line::from(Span::styled(
                self.citation.source.as_str(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                format!("\u{201c}{}\u{201d}", self.citation.excerpt),
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Tab next | Shift+Tab previous | Esc close",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let block = Block::default()
            .title(Span::styled(
                format!(" Source {} ", citation_badge(self.citation.number)),
                Style::default().fg(Color::Magenta),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_area_is_centered() {
        let outer = Rect::new(0, 0, 100, 40);
        let popup = CitationPopup::area(outer);
        assert_eq!(popup.width, 64);
        assert_eq!(popup.height, 12);
        assert_eq!(popup.x, 18);
        assert_eq!(popup.y, 14);
    }

    #[test]
    fn test_popup_shows_source_and_excerpt() {
        let citation = Citation::new(3, "Engineering Docs", "API v2.0 adds webhooks");
        let area = Rect::new(0, 0, 60, 10);
        let mut buf = Buffer::empty(area);

        CitationPopup::new(&citation).render(area, &mut buf);

        let rendered: String = (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        assert!(rendered.contains("Source [3]"));
        assert!(rendered.contains("Engineering Docs"));
        assert!(rendered.contains("API v2.0 adds webhooks"));
    }
}

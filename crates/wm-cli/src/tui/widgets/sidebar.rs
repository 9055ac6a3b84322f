//! Sidebar listing connected workspaces and recent analyses.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph, Widget},
};

use wm_core::{AnalysisStatus, RecentAnalysis, Workspace};

pub struct Sidebar<'a> {
    workspaces: &'a [Workspace],
    analyses: &'a [RecentAnalysis],
    loading: bool,
}

impl<'a> Sidebar<'a> {
    pub fn new(workspaces: &'a [Workspace], analyses: &'a [RecentAnalysis]) -> Self {
        Self {
            workspaces,
            analyses,
            loading: false,
        }
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let heading = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        let muted = Style::default().fg(Color::DarkGray);

        let mut lines = vec![
            Line::from(Span::styled(
                "WorkMate",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled("Your AI Work Assistant", muted)),
            Line::default(),
            Line::from(Span::styled("Connected Workspaces", heading)),
        ];

        if self.workspaces.is_empty() {
            let note = if self.loading { "  Loading..." } else { "  None connected" };
            lines.push(Line::from(Span::styled(note, muted)));
        }
        for workspace in self.workspaces {
            let dot = if workspace.connected { Color::Green } else { Color::DarkGray };
            lines.push(Line::from(vec![
                Span::styled("● ", Style::default().fg(dot)),
                Span::raw(workspace.name.as_str()),
            ]));
            lines.push(Line::from(Span::styled(
                format!("  {} pages indexed", workspace.page_count),
                muted,
            )));
        }

        if !self.analyses.is_empty() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Recent Analysis", heading)));
        }
        for analysis in self.analyses {
            let glyph_color = match analysis.status {
                AnalysisStatus::Completed => Color::Green,
                AnalysisStatus::InProgress => Color::Magenta,
                AnalysisStatus::Pending => Color::DarkGray,
            };
            lines.push(Line::from(Span::raw(analysis.name.as_str())));
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", analysis.last_analyzed), muted),
                Span::styled(analysis.status.glyph(), Style::default().fg(glyph_color)),
            ]));
        }

        lines
    }
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(Padding::horizontal(1));

        Paragraph::new(self.lines()).block(block).render(area, buf);
    }
}

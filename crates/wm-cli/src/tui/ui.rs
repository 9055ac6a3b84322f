//! UI layout rendering for the TUI.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::app::TuiApp;
use super::widgets::{
    transcript_lines, wrapped_height, CitationPopup, InputArea, MessageList, Sidebar, StatusBar,
};

const SIDEBAR_WIDTH: u16 = 32;
/// Narrower terminals hide the sidebar even when it is toggled on.
const MIN_WIDTH_FOR_SIDEBAR: u16 = 60;

/// Render the entire TUI
pub fn render(app: &mut TuiApp, frame: &mut Frame) {
    let area = frame.area();

    let main = if app.show_sidebar && area.width >= MIN_WIDTH_FOR_SIDEBAR {
        let [sidebar, main] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)]).areas(area);
        let widget = Sidebar::new(&app.workspaces, &app.analyses)
            .loading(app.is_refreshing_directory());
        frame.render_widget(widget, sidebar);
        main
    } else {
        area
    };

    let input_height = InputArea::height_for(app.input.value(), main.width);
    let [header, messages, status, composer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(input_height),
    ])
    .areas(main);

    render_header(frame, header);

    // Message list: recompute the transcript and keep scrolling in bounds
    let lines = transcript_lines(
        app.conversation.messages(),
        app.badge_selection(),
        app.conversation.is_awaiting_response(),
        messages.width.saturating_sub(2) as usize,
    );
    app.scroll
        .resize(wrapped_height(&lines, messages.width), messages.height);
    frame.render_widget(
        MessageList::new(&lines).scroll(app.scroll.offset()),
        messages,
    );

    let status_bar = StatusBar::new(app.backend_name())
        .messages(app.conversation.len())
        .waiting(app.conversation.is_awaiting_response())
        .citation(app.citation_position())
        .status(app.status_message.as_deref());
    frame.render_widget(status_bar, status);

    let hint = if app.conversation.is_awaiting_response() {
        "WorkMate is thinking... Ctrl+C to cancel"
    } else {
        "Enter send | Tab citations | Ctrl+B sidebar | /help"
    };
    let input = InputArea::new(&app.input)
        .can_send(app.can_send())
        .hint(hint);
    frame.render_widget(input, composer);

    if app.show_citation {
        if let Some(citation) = app.selected_citation() {
            frame.render_widget(CitationPopup::new(citation), CitationPopup::area(area));
        }
    }

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            "Chat",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Ask questions about your workspace",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(header, area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let overlay_width = 60u16.min(area.width.saturating_sub(4));
    let overlay_height = 23u16.min(area.height.saturating_sub(4));

    let x = (area.width.saturating_sub(overlay_width)) / 2;
    let y = (area.height.saturating_sub(overlay_height)) / 2;

    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);
    frame.render_widget(Clear, overlay_area);

    let section = Style::default().fg(Color::Cyan);
    let help_text = vec![
        Line::from(Span::styled("WorkMate Help", Style::default().fg(Color::Magenta))),
        Line::from(""),
        Line::from(Span::styled("Navigation:", section)),
        Line::from("  PgUp/PgDn    Scroll messages"),
        Line::from("  Ctrl+Home    Scroll to top"),
        Line::from("  Ctrl+End     Scroll to bottom"),
        Line::from("  Up/Down      Input history"),
        Line::from("  Ctrl+B       Toggle sidebar"),
        Line::from("  Shift+Enter  New line (Alt+Enter)"),
        Line::from(""),
        Line::from(Span::styled("Citations:", section)),
        Line::from("  Tab          Next citation"),
        Line::from("  Shift+Tab    Previous citation"),
        Line::from("  Enter/Ctrl+O Show source (empty input)"),
        Line::from(""),
        Line::from(Span::styled("Commands:", section)),
        Line::from("  /help        Show this help"),
        Line::from("  /clear       Clear conversation"),
        Line::from("  /workspaces  Refresh workspaces"),
        Line::from("  /quit        Exit"),
        Line::from(""),
        Line::from("  Ctrl+C cancel reply (quit when idle), Ctrl+D exit"),
    ];

    let help = Paragraph::new(help_text).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(help, overlay_area);
}

//! Markdown rendering for chat messages.
//!
//! Uses pulldown-cmark to parse markdown and produces ratatui `Text` directly.
//! Citation markers in plain text runs are swapped for badge spans. The TUI
//! uses the `Text` as-is; `workmate ask` converts it via `text_to_ansi()`.

use crossterm::terminal::size as terminal_size;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
};

use wm_core::{annotate, Citation, Fragment};

struct MarkdownStyle {
    bold: Style,
    italic: Style,
    inline_code: Style,
    code_block: Style,
    h1: Style,
    h2: Style,
    h3_h6: Style,
    bullet: Style,
    blockquote: Style,
    link: Style,
    strikethrough: Style,
    citation: Style,
}

impl Default for MarkdownStyle {
    fn default() -> Self {
        Self {
            bold: Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            italic: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
            inline_code: Style::default().fg(Color::Yellow),
            code_block: Style::default().fg(Color::Yellow),
            h1: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            h2: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            h3_h6: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            bullet: Style::default().fg(Color::Cyan),
            blockquote: Style::default().fg(Color::DarkGray),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            citation: citation_badge_style(),
        }
    }
}

/// Style of a citation badge such as `[2]`.
pub fn citation_badge_style() -> Style {
    Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::BOLD)
}

/// Badge text for citation `number`.
pub fn citation_badge(number: u32) -> String {
    format!("[{}]", number)
}

/// Text runs waiting to be annotated.
///
/// pulldown-cmark may hand a marker such as `[1]` over in several `Text`
/// events, so runs are joined before the marker scan.
#[derive(Default)]
struct PendingRun {
    text: String,
    style: Style,
}

impl PendingRun {
    fn push(&mut self, text: &str, style: Style) {
        if self.text.is_empty() {
            self.style = style;
        }
        self.text.push_str(text);
    }

    fn flush_into(&mut self, spans: &mut Vec<Span<'static>>, citations: &[Citation], badge: Style) {
        if self.text.is_empty() {
            return;
        }
        for fragment in annotate(&self.text, citations) {
            match fragment {
                Fragment::Text(text) => spans.push(Span::styled(text.to_string(), self.style)),
                Fragment::Reference(citation) => {
                    spans.push(Span::styled(citation_badge(citation.number), badge))
                }
            }
        }
        self.text.clear();
    }
}

/// Render markdown content to ratatui `Text`, drawing resolvable citation
/// markers as badges. `width` bounds horizontal rules.
pub fn render_to_text(content: &str, citations: &[Citation], width: usize) -> Text<'static> {
    let styles = MarkdownStyle::default();
    let options = Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(content, options);

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current_spans: Vec<Span<'static>> = Vec::new();
    let mut style_stack: Vec<Style> = Vec::new();
    let mut run = PendingRun::default();
    let mut had_paragraph = false;
    let mut in_code_block = false;
    let mut in_blockquote = false;
    // Nesting depth of emphasis, strong, strikethrough and links.
    let mut inline_depth = 0usize;

    // List tracking: stack of (is_ordered, next_number)
    let mut list_stack: Vec<(bool, u64)> = Vec::new();
    let mut pending_item_prefix: Option<Span<'static>> = None;
    let mut link_url: Option<String> = None;

    for event in parser {
        if !matches!(event, Event::Text(_)) {
            run.flush_into(&mut current_spans, citations, styles.citation);
        }

        match event {
            Event::Start(Tag::Paragraph) => {
                if had_paragraph {
                    flush_line(&mut lines, &mut current_spans);
                }
            }
            Event::End(TagEnd::Paragraph) => {
                flush_line(&mut lines, &mut current_spans);
                lines.push(Line::default());
                had_paragraph = true;
            }

            Event::Start(Tag::Heading { level, .. }) => {
                let style = match level {
                    HeadingLevel::H1 => styles.h1,
                    HeadingLevel::H2 => styles.h2,
                    _ => styles.h3_h6,
                };
                style_stack.push(style);
            }
            Event::End(TagEnd::Heading(_)) => {
                style_stack.pop();
                flush_line(&mut lines, &mut current_spans);
                lines.push(Line::default());
                had_paragraph = true;
            }

            Event::Start(Tag::Strong) => {
                inline_depth += 1;
                style_stack.push(styles.bold);
            }
            Event::Start(Tag::Emphasis) => {
                inline_depth += 1;
                style_stack.push(styles.italic);
            }
            Event::Start(Tag::Strikethrough) => {
                inline_depth += 1;
                style_stack.push(styles.strikethrough);
            }
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                inline_depth = inline_depth.saturating_sub(1);
                style_stack.pop();
            }

            Event::Start(Tag::BlockQuote(_)) => {
                in_blockquote = true;
                style_stack.push(styles.blockquote);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                in_blockquote = false;
                style_stack.pop();
                flush_line(&mut lines, &mut current_spans);
            }

            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                style_stack.push(styles.code_block);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                style_stack.pop();
                flush_line(&mut lines, &mut current_spans);
                if lines.last().is_some_and(|l| !l.spans.is_empty()) {
                    lines.push(Line::default());
                }
            }

            Event::Start(Tag::List(start)) => {
                list_stack.push(match start {
                    Some(n) => (true, n),
                    None => (false, 0),
                });
            }
            Event::End(TagEnd::List(_)) => {
                list_stack.pop();
                if list_stack.is_empty() && lines.last().is_none_or(|l| !l.spans.is_empty()) {
                    lines.push(Line::default());
                }
            }

            Event::Start(Tag::Item) => {
                flush_line(&mut lines, &mut current_spans);
                let indent = "  ".repeat(list_stack.len().saturating_sub(1));
                if let Some((is_ordered, num)) = list_stack.last_mut() {
                    let prefix = if *is_ordered {
                        let prefix = format!("{}{}. ", indent, num);
                        *num += 1;
                        prefix
                    } else {
                        format!("{}• ", indent)
                    };
                    pending_item_prefix = Some(Span::styled(prefix, styles.bullet));
                }
            }
            Event::End(TagEnd::Item) => {
                flush_line(&mut lines, &mut current_spans);
            }

            Event::Start(Tag::Link { dest_url, .. }) => {
                inline_depth += 1;
                link_url = Some(dest_url.to_string());
                style_stack.push(styles.link);
            }
            Event::End(TagEnd::Link) => {
                inline_depth = inline_depth.saturating_sub(1);
                style_stack.pop();
                if let Some(url) = link_url.take() {
                    current_spans.push(Span::styled(
                        format!(" ({})", url),
                        effective_style(&style_stack),
                    ));
                }
            }

            Event::Code(text) => {
                if let Some(prefix) = pending_item_prefix.take() {
                    current_spans.push(prefix);
                }
                current_spans.push(Span::styled(text.to_string(), styles.inline_code));
            }

            Event::Text(text) => {
                let style = effective_style(&style_stack);
                if let Some(prefix) = pending_item_prefix.take() {
                    current_spans.push(prefix);
                }

                if in_code_block {
                    for (i, line) in text.split('\n').enumerate() {
                        if i > 0 {
                            flush_line(&mut lines, &mut current_spans);
                        }
                        if !line.is_empty() {
                            current_spans.push(Span::styled(format!("  {}", line), style));
                        }
                    }
                } else if inline_depth > 0 {
                    current_spans.push(Span::styled(text.to_string(), style));
                } else {
                    if in_blockquote && current_spans.is_empty() && run.text.is_empty() {
                        current_spans.push(Span::styled("│ ".to_string(), styles.blockquote));
                    }
                    run.push(&text, style);
                }
            }

            Event::SoftBreak => {
                current_spans.push(Span::raw(" ".to_string()));
            }
            Event::HardBreak => {
                flush_line(&mut lines, &mut current_spans);
            }

            Event::Rule => {
                flush_line(&mut lines, &mut current_spans);
                lines.push(Line::from(Span::styled(
                    "─".repeat(width.clamp(1, 60)),
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::default());
            }

            Event::InlineHtml(html) => {
                let tag = html.trim().to_lowercase();
                if tag == "<br>" || tag == "<br/>" || tag == "<br />" {
                    flush_line(&mut lines, &mut current_spans);
                }
            }

            _ => {}
        }
    }

    run.flush_into(&mut current_spans, citations, styles.citation);
    flush_line(&mut lines, &mut current_spans);

    while lines.last().is_some_and(|l| l.spans.is_empty()) {
        lines.pop();
    }

    Text::from(lines)
}

fn flush_line(lines: &mut Vec<Line<'static>>, spans: &mut Vec<Span<'static>>) {
    if spans.is_empty() {
        return;
    }
    lines.push(Line::from(std::mem::take(spans)));
}

/// Compute the effective style by patching all styles on the stack together.
fn effective_style(stack: &[Style]) -> Style {
    stack
        .iter()
        .fold(Style::default(), |style, s| style.patch(*s))
}

/// Convert ratatui `Text` to an ANSI-escaped string for direct terminal output.
pub fn text_to_ansi(text: &Text) -> String {
    let mut out = String::new();
    for (i, line) in text.lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for span in &line.spans {
            let sgr = style_to_ansi(&span.style);
            if sgr.is_empty() {
                out.push_str(&span.content);
            } else {
                out.push_str(&sgr);
                out.push_str(&span.content);
                out.push_str("\x1b[0m");
            }
        }
    }
    out
}

/// Convert a ratatui Style to an ANSI SGR escape sequence.
fn style_to_ansi(style: &Style) -> String {
    let mut codes: Vec<String> = [
        (Modifier::BOLD, "1"),
        (Modifier::ITALIC, "3"),
        (Modifier::UNDERLINED, "4"),
        (Modifier::CROSSED_OUT, "9"),
    ]
    .iter()
    .filter(|(modifier, _)| style.add_modifier.contains(*modifier))
    .map(|(_, code)| code.to_string())
    .collect();

    codes.extend(style.fg.and_then(|c| color_to_ansi(c, false)));
    codes.extend(style.bg.and_then(|c| color_to_ansi(c, true)));

    if codes.is_empty() {
        String::new()
    } else {
        format!("\x1b[{}m", codes.join(";"))
    }
}

/// Map a ratatui Color to an ANSI color code.
fn color_to_ansi(color: Color, background: bool) -> Option<String> {
    let base = match color {
        Color::Black => 30,
        Color::Red => 31,
        Color::Green => 32,
        Color::Yellow => 33,
        Color::Blue => 34,
        Color::Magenta => 35,
        Color::Cyan => 36,
        Color::White | Color::Gray => 37,
        Color::DarkGray => 90,
        Color::LightRed => 91,
        Color::LightGreen => 92,
        Color::LightYellow => 93,
        Color::LightBlue => 94,
        Color::LightMagenta => 95,
        Color::LightCyan => 96,
        Color::Indexed(n) => {
            return Some(format!("{};5;{}", if background { 48 } else { 38 }, n));
        }
        Color::Rgb(r, g, b) => {
            return Some(format!("{};2;{};{};{}", if background { 48 } else { 38 }, r, g, b));
        }
        _ => return None,
    };
    Some((if background { base + 10 } else { base }).to_string())
}

/// Width available for one-shot terminal output.
pub fn terminal_width() -> usize {
    let (width, _) = terminal_size().unwrap_or((80, 24));
    (width as usize).saturating_sub(2).max(40)
}

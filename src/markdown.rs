//! Bot reply rendering
//!
//! Turns markdown text into styled ratatui lines using pulldown-cmark.
//! User turns never go through here; they are shown verbatim.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Render markdown to styled lines.
///
/// Paragraphs are separated by a blank line; a trailing blank line is dropped
/// so callers can add their own spacing between turns.
pub fn render_markdown(input: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::default();
    for event in Parser::new_ext(input, options) {
        renderer.handle(event);
    }
    renderer.flush_line();

    while renderer.lines.last().is_some_and(|l| l.spans.is_empty()) {
        renderer.lines.pop();
    }
    renderer.lines
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => style.fg(Color::Yellow).add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => style.fg(Color::Yellow),
        _ => style,
    }
}

fn code_style() -> Style {
    Style::default().fg(Color::Green)
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    // One entry per open list: next ordinal for ordered lists
    lists: Vec<Option<u64>>,
    pending_marker: Option<String>,
    in_code_block: bool,
    quote_depth: usize,
}

impl Renderer {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush_line();
                self.styles.push(heading_style(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush_line();
                self.styles.pop();
                self.blank_line();
            }

            Event::Start(Tag::Emphasis) => self.styles.push(Style::default().add_modifier(Modifier::ITALIC)),
            Event::Start(Tag::Strong) => self.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Event::Start(Tag::Strikethrough) => {
                self.styles.push(Style::default().add_modifier(Modifier::CROSSED_OUT));
            }
            Event::Start(Tag::Link { .. }) => {
                self.styles.push(Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
            }
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link) => {
                self.styles.pop();
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush_line();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            format!("  [{}]", lang),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                self.flush_line();
                self.in_code_block = false;
                self.blank_line();
            }

            Event::Start(Tag::List(start)) => {
                self.flush_line();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}{}. ", indent, n);
                        *n += 1;
                        marker
                    }
                    _ => format!("{}• ", indent),
                };
                self.pending_marker = Some(marker);
            }
            Event::End(TagEnd::Item) => self.flush_line(),
            Event::TaskListMarker(checked) => {
                let marker = self.pending_marker.take().unwrap_or_default();
                let box_ = if checked { "[x] " } else { "[ ] " };
                self.pending_marker = Some(format!("{}{}", marker, box_));
            }

            Event::Start(Tag::BlockQuote { .. }) => {
                self.flush_line();
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote { .. }) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }

            Event::End(TagEnd::Paragraph) => {
                self.flush_line();
                // Tight list items carry no paragraph spacing
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }

            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => {
                self.push_prefix();
                self.spans.push(Span::styled(code.to_string(), code_style()));
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                )));
            }

            // Tables, images, html and footnotes fall through as plain text
            // via their inner Text events, or are dropped.
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.lines() {
                self.spans.push(Span::styled(format!("  {}", line), code_style()));
                self.flush_line();
            }
            return;
        }

        self.push_prefix();
        let style = self
            .styles
            .iter()
            .fold(Style::default(), |acc, s| acc.patch(*s));
        self.spans.push(Span::styled(text.to_string(), style));
    }

    /// Quote bars and list markers go in front of the first span on a line
    fn push_prefix(&mut self) {
        if self.spans.is_empty() && self.quote_depth > 0 {
            self.spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                Style::default().fg(Color::DarkGray),
            ));
        }
        if let Some(marker) = self.pending_marker.take() {
            self.spans.push(Span::styled(marker, Style::default().fg(Color::Cyan)));
        }
    }

    fn flush_line(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }
}

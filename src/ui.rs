use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::app::App;
use crate::conversation::Sender;
use crate::markdown::render_markdown;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" 🤖 AI Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("(Gemini API) ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray).italic()),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Every line of the message list, including the typing indicator
fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for turn in app.conversation.turns() {
        match turn.sender {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                // Literal text, no markdown
                for line in turn.text.lines() {
                    lines.push(Line::raw(line.to_string()));
                }
            }
            Sender::Bot => {
                lines.push(Line::from(Span::styled(
                    "Bot:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                lines.extend(render_markdown(&turn.text));
            }
        }
        lines.push(Line::default());
    }

    if app.is_awaiting() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("🤖 Gemini is typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Slice of `draft` that fits in `width` columns with the cursor visible.
///
/// Returns the visible text and the cursor's column inside it. Widths are
/// display columns, so wide characters count twice.
fn visible_input(draft: &str, cursor: usize, width: usize) -> (String, usize) {
    let widths: Vec<usize> = draft.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor_col: usize = widths.iter().take(cursor).sum();

    // Drop leading characters until the cursor cell fits
    let mut skip = 0;
    let mut skipped_cols = 0;
    while width > 0 && cursor_col - skipped_cols >= width && skip < widths.len() {
        skipped_cols += widths[skip];
        skip += 1;
    }

    let mut used = 0;
    let visible: String = draft
        .chars()
        .zip(widths.iter())
        .skip(skip)
        .take_while(|(_, w)| {
            used += **w;
            used <= width
        })
        .map(|(c, _)| c)
        .collect();

    (visible, cursor_col - skipped_cols)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let inner = chat_block.inner(area);
    let lines = chat_lines(app);

    let chat_text = if lines.is_empty() {
        Text::from(Span::styled(
            "No messages. Type below to start chatting.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(lines)
    };

    // Measure with the same word wrapping the paragraph renders with
    let chat = Paragraph::new(chat_text).wrap(Wrap { trim: false });
    let total_lines = chat.line_count(inner.width);

    app.chat_height = inner.height;
    app.chat_total_lines = total_lines.min(u16::MAX as usize) as u16;
    if app.follow_latest {
        app.chat_scroll = app.max_scroll();
    } else {
        app.chat_scroll = app.chat_scroll.min(app.max_scroll());
    }

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);

    // Scrolled away from the bottom: hint how to get back
    if !app.follow_latest && app.chat_scroll < app.max_scroll() && area.width > 20 {
        let hint = " ⬇ Ctrl+G ";
        let hint_area = Rect::new(
            area.x + area.width - 12,
            area.y + area.height.saturating_sub(1),
            11,
            1,
        );
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().bg(Color::Blue).fg(Color::White)),
            hint_area,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let awaiting = app.is_awaiting();
    let (title, border_color) = if awaiting {
        (" Sending... ", Color::DarkGray)
    } else {
        (" Message (Enter to send) ", Color::Yellow)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;

    let draft = app.conversation.draft();
    let (visible_text, cursor_col) = visible_input(draft, app.cursor, inner_width);
    let input = if draft.is_empty() {
        Paragraph::new(Span::styled(
            "Type your message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    frame.set_cursor_position((area.x + cursor_col as u16 + 1, area.y + 1));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if app.is_awaiting() {
        (" AWAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" IDLE ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = [
        (" Enter ", " send "),
        (" Ctrl+L ", " clear "),
        (" Ctrl+G ", " latest "),
        (" ↑/↓ ", " scroll "),
        (" Esc ", " quit "),
    ];

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints.into_iter().flat_map(|(key, label)| {
            [Span::styled(key, key_style), Span::styled(label, label_style)]
        }))
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

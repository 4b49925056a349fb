//! Chat screen.
//!
//! Transcript pane on top, status line, single-line input at the bottom.

use crate::client::http::ChatBackend;
use crate::client::session::{ChatSession, Replies};
use crate::transcript::{MessageElement, Role};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tui_input::backend::crossterm::EventHandler;

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Continue,
    Quit,
}

/// Run the chat screen until the user quits.
pub async fn run_tui<B: ChatBackend + 'static>(
    mut session: ChatSession<B>,
    replies: Replies,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut session, replies).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Forward terminal events from a dedicated thread.
///
/// `event::read` blocks, so it cannot live on the runtime. The thread ends
/// once the receiver is dropped and the next event arrives.
fn spawn_event_reader() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if tx.send(ev).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read terminal event: {}", e);
                break;
            }
        }
    });
    rx
}

async fn run_event_loop<T: Backend, B: ChatBackend + 'static>(
    terminal: &mut Terminal<T>,
    session: &mut ChatSession<B>,
    mut replies: Replies,
) -> Result<()> {
    let mut events = spawn_event_reader();

    loop {
        terminal.draw(|frame| draw_ui(frame, session))?;

        tokio::select! {
            ev = events.recv() => {
                let Some(ev) = ev else {
                    return Ok(());
                };
                if handle_event(session, ev) == Action::Quit {
                    return Ok(());
                }
            }
            Some(reply) = replies.recv() => {
                session.complete(reply);
            }
        }
    }
}

fn handle_event<B: ChatBackend + 'static>(session: &mut ChatSession<B>, ev: Event) -> Action {
    let Event::Key(key) = ev else {
        // Resizes just need the redraw that follows
        return Action::Continue;
    };
    // Only handle key press events (not release)
    if key.kind != KeyEventKind::Press {
        return Action::Continue;
    }

    match key.code {
        KeyCode::Enter => {
            debug!("Submitting {} chars", session.input().value().chars().count());
            session.send_message();
        }
        KeyCode::Esc => return Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Action::Quit;
        }
        KeyCode::Up => session.view_mut().scroll_up(1),
        KeyCode::Down => session.view_mut().scroll_down(1),
        KeyCode::PageUp => session.view_mut().scroll_up(10),
        KeyCode::PageDown => session.view_mut().scroll_down(10),
        _ => {
            session.input_mut().handle_event(&Event::Key(key));
        }
    }
    Action::Continue
}

/// Label and body style for an entry. Colors follow the role class.
fn entry_style(element: &MessageElement) -> (Span<'static>, Style) {
    let label = match element.message().role() {
        Role::User => "you ",
        Role::Bot => "bot ",
    };
    let (label_color, body_color) = if element.has_class("user-message") {
        (Color::Cyan, Color::White)
    } else {
        (Color::Green, Color::Gray)
    };
    (
        Span::styled(label, Style::default().fg(label_color).add_modifier(Modifier::BOLD)),
        Style::default().fg(body_color),
    )
}

/// Lay out the transcript as text, one blank line between entries.
fn transcript_text<'a>(entries: &'a [MessageElement]) -> Text<'a> {
    let mut lines = Vec::new();
    for (i, element) in entries.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        let (label, style) = entry_style(element);
        let mut body = element.message().text().lines();
        let first = body.next().unwrap_or("");
        lines.push(Line::from(vec![label, Span::styled(first, style)]));
        for rest in body {
            lines.push(Line::from(Span::styled(rest, style)));
        }
    }
    Text::from(lines)
}

fn draw_ui<B: ChatBackend + 'static>(frame: &mut Frame, session: &mut ChatSession<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_transcript(frame, session, chunks[0]);

    let status = Paragraph::new(Line::from(Span::styled(
        session.status().to_string(),
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(status, chunks[1]);

    draw_input(frame, session, chunks[2]);
}

fn draw_transcript<B: ChatBackend + 'static>(
    frame: &mut Frame,
    session: &mut ChatSession<B>,
    area: Rect,
) {
    let block = Block::default()
        .title(format!(" {} ", session.title()))
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let mut view = *session.view();
    let paragraph = Paragraph::new(transcript_text(session.transcript().entries()))
        .wrap(Wrap { trim: false });
    let content_lines = u16::try_from(paragraph.line_count(inner.width)).unwrap_or(u16::MAX);
    let offset = view.resolve(content_lines, inner.height);

    frame.render_widget(paragraph.block(block).scroll((offset, 0)), area);
    *session.view_mut() = view;
}

fn draw_input<B: ChatBackend + 'static>(frame: &mut Frame, session: &ChatSession<B>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    if inner_area.width == 0 {
        return;
    }

    let input = session.input();
    let input_width = inner_area.width as usize;
    let cursor_pos = input.visual_cursor();

    // Scroll the input if cursor is beyond visible area
    let scroll = if cursor_pos >= input_width {
        cursor_pos - input_width + 1
    } else {
        0
    };

    let visible_value: String = input.value().chars().skip(scroll).take(input_width).collect();
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            visible_value,
            Style::default().fg(Color::White),
        ))),
        inner_area,
    );

    let cursor_x = inner_area.x + cursor_pos.saturating_sub(scroll) as u16;
    frame.set_cursor_position((cursor_x, inner_area.y));
}

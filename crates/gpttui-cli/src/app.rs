use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gpttui_core::{ConversationController, GptError, Message, Role, Settings};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Terminal,
};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::keys::{Action, KeyMap, Mode};
use crate::theme::Theme;

type TurnResult = gpttui_core::Result<String>;

// ── Single-prompt mode ──────────────────────────────────────────────────

pub async fn run_single_prompt(controller: &ConversationController, prompt: &str) -> Result<()> {
    let result = controller.submit(prompt).await;
    let shutdown = controller.shutdown();

    println!("{}", result?);
    shutdown?;
    Ok(())
}

// ── Interactive TUI ─────────────────────────────────────────────────────

/// One entry of the transcript view.
#[derive(Clone)]
enum ChatItem {
    Message(Message),
    Error(String),
}

struct AppState {
    // Input
    input: String,
    /// Cursor position in characters.
    cursor_pos: usize,
    mode: Mode,

    // Transcript
    items: Vec<ChatItem>,
    scroll_offset: usize,
    total_content_lines: usize,

    // Turn state
    is_processing: bool,
    status_text: String,
    should_quit: bool,

    controller: Arc<ConversationController>,
    keymap: KeyMap,
    theme: Theme,
}

impl AppState {
    fn new(controller: Arc<ConversationController>, settings: &Settings, theme_name: &str) -> Self {
        Self {
            input: String::new(),
            cursor_pos: 0,
            mode: Mode::Normal,
            items: Vec::new(),
            scroll_offset: 0,
            total_content_lines: 0,
            is_processing: false,
            status_text: "Ready".into(),
            should_quit: false,
            controller,
            keymap: KeyMap::from_bindings(&settings.keybindings),
            theme: Theme::by_name(theme_name),
        }
    }

    fn load_history(&mut self) {
        match self.controller.history() {
            Ok(history) => {
                self.items = history.into_iter().map(ChatItem::Message).collect();
                self.scroll_to_bottom();
            }
            Err(e) => self.report_error(e),
        }
    }

    fn push(&mut self, item: ChatItem) {
        self.items.push(item);
        self.scroll_to_bottom();
    }

    fn report_error(&mut self, e: GptError) {
        error!("{}", e);
        self.status_text = if e.is_store_fatal() {
            "Store unavailable, press quit to exit".into()
        } else {
            "Error".into()
        };
        self.push(ChatItem::Error(e.to_string()));
    }

    fn scroll_to_bottom(&mut self) {
        // Resolved on next draw
        self.scroll_offset = usize::MAX;
    }

    fn scroll_up(&mut self, lines: usize) {
        if self.scroll_offset == usize::MAX {
            self.scroll_offset = self.total_content_lines;
        }
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn insert_str(&mut self, text: &str) {
        let at = self.byte_index(self.cursor_pos);
        self.input.insert_str(at, text);
        self.cursor_pos += text.chars().count();
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }
}

pub async fn run_tui(
    controller: ConversationController,
    settings: &Settings,
    theme_name: &str,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = AppState::new(Arc::new(controller), settings, theme_name);
    state.load_history();
    info!(
        "TUI started on session '{}' with {}",
        state.controller.session_name(),
        state.controller.backend_kind()
    );

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<TurnResult>();

    let outcome = event_loop(&mut terminal, &mut state, &result_tx, &mut result_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    result_tx: &mpsc::UnboundedSender<TurnResult>,
    result_rx: &mut mpsc::UnboundedReceiver<TurnResult>,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw_ui(f, state))?;

        // Finished turns (non-blocking)
        while let Ok(result) = result_rx.try_recv() {
            handle_turn_result(state, result);
        }

        if event::poll(std::time::Duration::from_millis(33))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(state, key, result_tx);
                }
            }
        }

        if state.should_quit {
            return Ok(());
        }
    }
}

fn handle_turn_result(state: &mut AppState, result: TurnResult) {
    state.is_processing = false;
    match result {
        Ok(reply) => {
            state.status_text = "Ready".into();
            state.push(ChatItem::Message(Message::assistant(reply)));
        }
        Err(e) => state.report_error(e),
    }
}

fn draw_ui(f: &mut ratatui::Frame, state: &mut AppState) {
    let theme = state.theme.clone();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // transcript
            Constraint::Length(3), // prompt
            Constraint::Length(1), // status
        ])
        .split(f.area());

    let chat_area = main_chunks[0];
    let chat_lines = build_chat_lines(&state.items, state.is_processing, &theme);
    let total_lines = chat_lines.len();
    state.total_content_lines = total_lines;

    let visible_height = chat_area.height.saturating_sub(2) as usize;
    let max_scroll = total_lines.saturating_sub(visible_height);
    if state.scroll_offset > max_scroll {
        state.scroll_offset = max_scroll;
    }

    let title = format!(
        " gpttui | {} | {} ",
        state.controller.session_name(),
        state.controller.backend_kind()
    );
    let chat = Paragraph::new(Text::from(chat_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(theme.border)),
        )
        .style(Style::default().bg(theme.bg))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset.min(u16::MAX as usize) as u16, 0));
    f.render_widget(chat, chat_area);

    if total_lines > visible_height {
        let mut scrollbar_state = ScrollbarState::new(max_scroll).position(state.scroll_offset);
        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("^"))
                .end_symbol(Some("v")),
            chat_area,
            &mut scrollbar_state,
        );
    }

    draw_prompt(f, main_chunks[1], state, &theme);
    draw_status_bar(f, main_chunks[2], state, &theme);
}

fn render_message_lines<'a>(msg: &'a Message, theme: &Theme) -> Vec<Line<'a>> {
    let (prefix, color) = match msg.role {
        Role::User => ("User > ", theme.user_color),
        Role::Assistant => ("Assistant > ", theme.assistant_color),
        Role::System => ("System > ", theme.system_color),
    };
    prefixed_lines(prefix, &msg.content, color)
}

fn prefixed_lines<'a>(
    prefix: &'static str,
    content: &'a str,
    color: ratatui::style::Color,
) -> Vec<Line<'a>> {
    let indent = " ".repeat(prefix.len());
    let mut lines: Vec<Line> = Vec::new();

    for (i, raw_line) in content.lines().enumerate() {
        let lead = if i == 0 {
            Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD))
        } else {
            Span::raw(indent.clone())
        };
        lines.push(Line::from(vec![
            lead,
            Span::styled(raw_line, Style::default().fg(color)),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            prefix,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }
    lines
}

fn build_chat_lines<'a>(items: &'a [ChatItem], is_processing: bool, theme: &Theme) -> Vec<Line<'a>> {
    let mut chat_lines: Vec<Line> = Vec::new();

    for item in items {
        match item {
            ChatItem::Message(msg) => chat_lines.extend(render_message_lines(msg, theme)),
            ChatItem::Error(text) => chat_lines.extend(prefixed_lines("Error > ", text, theme.error)),
        }
        chat_lines.push(Line::raw(""));
    }

    if is_processing {
        chat_lines.push(Line::from(Span::styled(
            "  Waiting for response...",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::DIM),
        )));
    }

    chat_lines
}

fn draw_prompt(f: &mut ratatui::Frame, area: Rect, state: &AppState, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(10), Constraint::Min(10)])
        .split(area);

    let indicator_bg = match state.mode {
        Mode::Normal => theme.normal_mode,
        Mode::Insert => theme.insert_mode,
    };
    let indicator = Paragraph::new(Line::from(Span::styled(
        format!(" {} ", state.mode.label()),
        Style::default()
            .fg(theme.indicator_fg)
            .bg(indicator_bg)
            .add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(indicator_bg)));
    f.render_widget(indicator, chunks[0]);

    let (input_style, title) = if state.is_processing {
        (Style::default().fg(theme.muted), " Prompt (waiting...) ")
    } else if state.input.is_empty() && state.mode == Mode::Normal {
        (Style::default().fg(theme.muted), " Prompt ")
    } else {
        (Style::default().fg(theme.fg), " Prompt ")
    };
    let shown = if state.input.is_empty() && state.mode == Mode::Normal {
        "Enter some text..."
    } else {
        state.input.as_str()
    };

    let input = Paragraph::new(shown)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(if state.mode == Mode::Insert {
                    theme.insert_mode
                } else {
                    theme.border
                })),
        )
        .style(input_style);
    f.render_widget(input, chunks[1]);

    if state.mode == Mode::Insert {
        let input_area = chunks[1];
        f.set_cursor_position((
            cursor_column(input_area, state.cursor_pos),
            input_area.y.saturating_add(1),
        ));
    }
}

/// Terminal column of the input cursor, clamped inside the prompt border.
fn cursor_column(area: Rect, cursor_pos: usize) -> u16 {
    let offset = u16::try_from(cursor_pos).unwrap_or(u16::MAX);
    let cursor_x = area.x.saturating_add(offset).saturating_add(1);
    let max_x = area.x.saturating_add(area.width.saturating_sub(2));
    cursor_x.min(max_x)
}

fn draw_status_bar(f: &mut ratatui::Frame, area: Rect, state: &AppState, theme: &Theme) {
    let hint = match state.mode {
        Mode::Normal => "i insert  y yank  p paste  c clear  d delete  q quit",
        Mode::Insert => "enter send  esc normal",
    };
    let status_spans = vec![
        Span::styled(
            format!(" {} ", state.controller.backend_kind()),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("| {} ", state.controller.session_name()),
            Style::default().fg(theme.accent),
        ),
        Span::styled("| ", Style::default().fg(theme.muted)),
        Span::styled(&state.status_text, Style::default().fg(theme.muted)),
        Span::styled(format!("  {hint} "), Style::default().fg(theme.muted)),
    ];
    f.render_widget(Paragraph::new(Line::from(status_spans)), area);
}

fn handle_key(state: &mut AppState, key: KeyEvent, result_tx: &mpsc::UnboundedSender<TurnResult>) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        run_action(state, Action::Quit, result_tx);
        return;
    }

    if let Some(action) = state.keymap.lookup(state.mode, &key) {
        run_action(state, action, result_tx);
        return;
    }

    if state.mode == Mode::Insert {
        edit_input(state, key);
    }
}

fn run_action(state: &mut AppState, action: Action, result_tx: &mpsc::UnboundedSender<TurnResult>) {
    match action {
        Action::Insert => state.mode = Mode::Insert,
        Action::Normal => state.mode = Mode::Normal,
        Action::Send => send(state, result_tx),
        Action::Yank => yank(state),
        Action::Paste => paste(state),
        Action::Clear => {
            state.items.clear();
            state.scroll_offset = 0;
        }
        Action::Delete => state.clear_input(),
        Action::Quit => {
            if let Err(e) = state.controller.shutdown() {
                error!("Failed to close store: {}", e);
            }
            state.should_quit = true;
        }
        Action::ScrollUp => state.scroll_up(1),
        Action::ScrollDown => state.scroll_down(1),
        Action::PageUp => state.scroll_up(20),
        Action::PageDown => state.scroll_down(20),
    }
}

fn send(state: &mut AppState, result_tx: &mpsc::UnboundedSender<TurnResult>) {
    if state.is_processing || state.input.trim().is_empty() {
        return;
    }

    let text = std::mem::take(&mut state.input);
    state.cursor_pos = 0;
    state.push(ChatItem::Message(Message::user(text.clone())));
    state.is_processing = true;
    state.status_text = "Sending...".into();

    let controller = state.controller.clone();
    let tx = result_tx.clone();
    tokio::spawn(async move {
        let result = controller.submit(&text).await;
        let _ = tx.send(result);
    });
}

fn yank(state: &mut AppState) {
    let last = match state.controller.last_reply() {
        Ok(message) => message,
        Err(e) => return state.report_error(e),
    };
    match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(last.content)) {
        Ok(()) => state.status_text = "Yanked last message".into(),
        Err(e) => state.status_text = format!("Clipboard unavailable: {e}"),
    }
}

fn paste(state: &mut AppState) {
    match arboard::Clipboard::new().and_then(|mut cb| cb.get_text()) {
        Ok(text) => {
            let text = text.replace('\r', "");
            state.insert_str(&text);
        }
        Err(e) => state.status_text = format!("Clipboard unavailable: {e}"),
    }
}

fn edit_input(state: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if state.cursor_pos > 0 {
                let at = state.byte_index(state.cursor_pos - 1);
                state.input.remove(at);
                state.cursor_pos -= 1;
            }
        }
        KeyCode::Delete => {
            if state.cursor_pos < state.input.chars().count() {
                let at = state.byte_index(state.cursor_pos);
                state.input.remove(at);
            }
        }
        KeyCode::Left => state.cursor_pos = state.cursor_pos.saturating_sub(1),
        KeyCode::Right => {
            if state.cursor_pos < state.input.chars().count() {
                state.cursor_pos += 1;
            }
        }
        KeyCode::Home => state.cursor_pos = 0,
        KeyCode::End => state.cursor_pos = state.input.chars().count(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut buf = [0u8; 4];
            state.insert_str(c.encode_utf8(&mut buf));
        }
        _ => {}
    }
}

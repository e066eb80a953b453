use anyhow::Result;
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use keyseq::config::Config;
use keyseq::defaults::{default_shortcuts, standard_key_tokens};
use keyseq::key_source::KeyEventHub;
use keyseq::key_token::token_from_key_event;
use keyseq::logging::{init_tracing, LogRingBuffer};
use keyseq::registry::ShortcutRegistry;
use keyseq::session::{FocusTarget, UiSessionState};
use keyseq::shortcut::ShortcutInfo;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

struct Debugger {
    hub: Rc<KeyEventHub>,
    session: Rc<UiSessionState>,
    registry: ShortcutRegistry,
    focus: Rc<Cell<FocusTarget>>,
    activations: Rc<RefCell<VecDeque<String>>>,
    dark_theme: Rc<Cell<bool>>,
    log_buffer: LogRingBuffer,
    config: Config,
    /// True when the terminal cannot report key releases and we synthesize
    /// one right after each press
    synthetic_release: bool,
    should_quit: bool,
}

fn record(activations: &Rc<RefCell<VecDeque<String>>>, max: usize, message: String) {
    let mut history = activations.borrow_mut();
    history.push_front(message);
    while history.len() > max {
        history.pop_back();
    }
}

impl Debugger {
    fn new(config: Config, log_buffer: LogRingBuffer, synthetic_release: bool) -> Result<Self> {
        let hub = Rc::new(KeyEventHub::with_keys(standard_key_tokens()));
        let session = Rc::new(UiSessionState::new());
        let focus = Rc::new(Cell::new(FocusTarget::Element));
        let activations = Rc::new(RefCell::new(VecDeque::new()));
        let dark_theme = Rc::new(Cell::new(true));
        let max_entries = config.history.max_entries;

        let focus_query = {
            let focus = Rc::clone(&focus);
            Rc::new(move || focus.get())
        };
        let mut registry =
            ShortcutRegistry::with_focus_query(Rc::clone(&hub), Rc::clone(&session), focus_query);

        let navigate = {
            let activations = Rc::clone(&activations);
            Rc::new(move |path: &str| {
                tracing::info!(target: "nav", "navigate to {}", path);
                record(&activations, max_entries, format!("navigate → {}", path));
            })
        };
        let toggle_theme = {
            let activations = Rc::clone(&activations);
            let dark_theme = Rc::clone(&dark_theme);
            Rc::new(move || {
                dark_theme.set(!dark_theme.get());
                let mode = if dark_theme.get() { "dark" } else { "light" };
                record(&activations, max_entries, format!("theme → {}", mode));
            })
        };
        registry.register(default_shortcuts(&session, navigate, toggle_theme))?;

        Ok(Self {
            hub,
            session,
            registry,
            focus,
            activations,
            dark_theme,
            log_buffer,
            config,
            synthetic_release,
            should_quit: false,
        })
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.kind {
            KeyEventKind::Press => self.handle_press(key),
            KeyEventKind::Release => {
                if let Some(token) = token_from_key_event(&key) {
                    self.hub.key_up(&token);
                }
            }
            KeyEventKind::Repeat => {}
        }
    }

    fn handle_press(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        // F2 simulates focus moving between element kinds, to exercise the
        // focus guard without a real form
        if key.code == KeyCode::F(2) {
            let next = match self.focus.get() {
                FocusTarget::Element => FocusTarget::TextInput,
                FocusTarget::TextInput => FocusTarget::TextArea,
                FocusTarget::TextArea => FocusTarget::ContentEditable,
                FocusTarget::ContentEditable => FocusTarget::Element,
            };
            self.focus.set(next);
            record(
                &self.activations,
                self.config.history.max_entries,
                format!("focus → {:?}", next),
            );
            return;
        }

        if let Some(token) = token_from_key_event(&key) {
            self.hub.key_down(token.clone());
            if self.synthetic_release {
                self.hub.key_up(&token);
            }
        }
    }

    fn draw(&self, f: &mut Frame) {
        let mut constraints = vec![
            Constraint::Length(9),                                          // status
            Constraint::Length(self.registry.sequence_progress().len() as u16 + 2), // sequences
            Constraint::Min(6),                                             // activations
        ];
        if self.config.display.show_key_history {
            constraints.push(Constraint::Length(8));
        }
        if self.config.display.show_log_tail {
            constraints.push(Constraint::Length(8));
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(f.area());

        self.draw_status(f, chunks[0]);
        self.draw_sequences(f, chunks[1]);
        self.draw_activations(f, chunks[2]);

        let mut next = 3;
        if self.config.display.show_key_history {
            self.draw_key_history(f, chunks[next]);
            next += 1;
        }
        if self.config.display.show_log_tail {
            self.draw_log_tail(f, chunks[next]);
        }
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let held = self.hub.held_keys().tokens();
        let held_display = if held.is_empty() {
            "(none)".to_string()
        } else {
            held.iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };

        let flag = |on: bool| {
            if on {
                Span::styled("open", Style::default().fg(Color::Green))
            } else {
                Span::styled("closed", Style::default().fg(Color::DarkGray))
            }
        };

        let release_mode = if self.synthetic_release {
            "synthetic (terminal lacks release events)"
        } else {
            "real"
        };

        let status_text = vec![
            Line::from(vec![
                Span::raw("Held keys: "),
                Span::styled(held_display, Style::default().fg(Color::Cyan)),
            ]),
            Line::from(vec![
                Span::raw("Command palette: "),
                flag(self.session.is_command_palette_open()),
                Span::raw("  Shortcut dialog: "),
                flag(self.session.is_shortcut_dialog_open()),
            ]),
            Line::from(vec![
                Span::raw("Focus: "),
                Span::styled(
                    format!("{:?}", self.focus.get()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw("  Theme: "),
                Span::raw(if self.dark_theme.get() { "dark" } else { "light" }),
            ]),
            Line::from(vec![
                Span::raw("Key releases: "),
                Span::raw(release_mode),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Try: ", Style::default().fg(Color::DarkGray)),
                Span::raw("g h (home), g a (about), ? (dialog), t (theme), Ctrl+k (palette),"),
            ]),
            Line::from(vec![
                Span::raw("     Escape (dismiss), F2 (cycle focus guard), Ctrl+c (quit)"),
            ]),
        ];

        let status = Paragraph::new(status_text)
            .block(Block::default().borders(Borders::ALL).title("keyseq"));
        f.render_widget(status, area);
    }

    fn draw_sequences(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .registry
            .sequence_progress()
            .into_iter()
            .map(|progress| {
                let mut spans = vec![Span::styled(
                    format!("{:24}", progress.shortcut_id),
                    Style::default().fg(Color::Gray),
                )];
                for (i, token) in progress.sequence.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::styled(" → ", Style::default().fg(Color::DarkGray)));
                    }
                    let style = if i < progress.cursor {
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    spans.push(Span::styled(token.to_string(), style));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Sequence progress"),
        );
        f.render_widget(list, area);
    }

    fn draw_activations(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .activations
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, msg)| {
                let style = if i == 0 {
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                ListItem::new(msg.clone()).style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Activations (newest first)"),
        );
        f.render_widget(list, area);
    }

    fn draw_key_history(&self, f: &mut Frame, area: Rect) {
        let recent = self.hub.recent_keys();
        let items: Vec<ListItem> = recent
            .iter()
            .rev()
            .take(area.height.saturating_sub(2) as usize)
            .enumerate()
            .map(|(i, key)| {
                let style = if i == 0 {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ListItem::new(key.clone()).style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Key history (newest first)"),
        );
        f.render_widget(list, area);
    }

    fn draw_log_tail(&self, f: &mut Frame, area: Rect) {
        let lines = self
            .log_buffer
            .recent(area.height.saturating_sub(2) as usize);
        let items: Vec<ListItem> = lines
            .iter()
            .map(|line| ListItem::new(line.clone()).style(Style::default().fg(Color::DarkGray)))
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Log"));
        f.render_widget(list, area);
    }
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: Debugger) -> Result<()> {
    loop {
        terminal.draw(|f| app.draw(f))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);

                if app.should_quit {
                    app.registry.teardown();
                    return Ok(());
                }
            }
        }
    }
}

fn print_catalog() -> Result<()> {
    let session = Rc::new(UiSessionState::new());
    let shortcuts = default_shortcuts(&session, Rc::new(|_| {}), Rc::new(|| {}));
    let infos: Vec<ShortcutInfo> = shortcuts.iter().map(ShortcutInfo::from).collect();
    println!("{}", serde_json::to_string_pretty(&infos)?);
    Ok(())
}

fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--list") {
        return print_catalog();
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Warning: could not load config ({}), using defaults", err);
            Config::default()
        }
    };
    let log_buffer = init_tracing(&config.logging.default_filter);

    let release_events = supports_keyboard_enhancement().unwrap_or(false);
    let app = Debugger::new(config, log_buffer, !release_events)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if release_events {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    if release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    terminal.show_cursor()?;

    res
}

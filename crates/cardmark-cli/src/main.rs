use anyhow::Result;
use cardmark_config::{CardDefaults, Config};
use cardmark_engine::editing::tree;
use cardmark_engine::session::{Key, Modifiers};
use cardmark_engine::{
    Background, CardId, CardStore, CardStyles, CardTemplate, ElementKind, KeyChord, Node, SessionRegistry,
    document_to_markdown, io,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{env, fs, io::stdout, path::PathBuf, process};

const CARET: &str = "▏";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Edit,
}

struct App {
    project_path: PathBuf,
    store: CardStore,
    sessions: SessionRegistry,
    card_list_state: ListState,
    mode: Mode,
    dirty: bool,
    status: String,
}

impl App {
    fn new(project_path: PathBuf, template: CardTemplate) -> Result<Self> {
        let (store, status) = if project_path.exists() {
            let store = io::load_project(&project_path, template)?;
            let status = format!("Opened {} cards", store.len());
            (store, status)
        } else {
            (CardStore::new(template), "New project".to_string())
        };

        let mut app = Self {
            project_path,
            store,
            sessions: SessionRegistry::new(),
            card_list_state: ListState::default(),
            mode: Mode::Browse,
            dirty: false,
            status,
        };
        app.card_list_state.select(Some(0));
        Ok(app)
    }

    fn card_ids(&self) -> Vec<CardId> {
        self.store.sorted_cards().iter().map(|card| card.id.clone()).collect()
    }

    fn selected_card(&self) -> Option<CardId> {
        let index = self.card_list_state.selected()?;
        self.card_ids().into_iter().nth(index)
    }

    fn select_card(&mut self, id: &CardId) {
        let index = self.card_ids().iter().position(|candidate| candidate == id);
        self.card_list_state.select(index);
        self.store.focus_card(id);
    }

    fn next_card(&mut self) {
        let count = self.store.len();
        let i = match self.card_list_state.selected() {
            Some(i) => (i + 1) % count,
            None => 0,
        };
        self.card_list_state.select(Some(i));
        self.sync_focus();
    }

    fn previous_card(&mut self) {
        let count = self.store.len();
        let i = match self.card_list_state.selected() {
            Some(0) | None => count - 1,
            Some(i) => i - 1,
        };
        self.card_list_state.select(Some(i));
        self.sync_focus();
    }

    fn sync_focus(&mut self) {
        if let Some(id) = self.selected_card() {
            self.store.focus_card(&id);
        }
    }

    fn add_card(&mut self) {
        let id = self.store.add_card();
        self.select_card(&id);
        self.dirty = true;
        self.status = "Card added".to_string();
    }

    fn duplicate_card(&mut self) {
        if let Some(id) = self.selected_card()
            && let Some(copy) = self.store.duplicate_card(&id)
        {
            self.select_card(&copy);
            self.dirty = true;
            self.status = "Card duplicated".to_string();
        }
    }

    fn delete_card(&mut self) {
        let Some(id) = self.selected_card() else {
            return;
        };
        if self.store.delete_card(&id) {
            self.sessions.remove(&id);
            if let Some(focused) = self.store.focused().cloned() {
                self.select_card(&focused);
            }
            self.dirty = true;
            self.status = "Card deleted".to_string();
        } else {
            self.status = "A project needs at least one card".to_string();
        }
    }

    fn start_editing(&mut self) -> Result<()> {
        let Some(id) = self.selected_card() else {
            return Ok(());
        };
        let content = self.store.get(&id).map(|card| card.content.clone()).unwrap_or_default();
        let session = self.sessions.set_active(&id, || content);
        if session.selection().is_none() {
            session.select_end()?;
        }
        self.mode = Mode::Edit;
        self.status = "Editing (Esc to stop)".to_string();
        Ok(())
    }

    fn stop_editing(&mut self) {
        self.mode = Mode::Browse;
        self.status = String::new();
    }

    fn edit_key(&mut self, chord: KeyChord) {
        let Some(id) = self.sessions.active_id().cloned() else {
            return;
        };
        match self.sessions.handle_key(&id, &chord, &mut self.store) {
            Ok(true) => self.dirty = true,
            Ok(false) => {}
            Err(e) => {
                log::warn!("{chord} failed: {e}");
                self.status = format!("{chord}: {e}");
            }
        }
    }

    fn save(&mut self) {
        match io::save_project(&self.store, &self.project_path) {
            Ok(()) => {
                self.dirty = false;
                self.status = format!("Saved to {}", self.project_path.display());
            }
            Err(e) => self.status = format!("Save failed: {e}"),
        }
    }

    fn export_markdown(&mut self) {
        let Some(card) = self.selected_card().and_then(|id| self.store.get(&id).cloned()) else {
            return;
        };
        let dir = self
            .project_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        self.status = match io::save_card_markdown(&card, &dir) {
            Ok(path) => format!("Wrote {}", path.display()),
            Err(e) => format!("Export failed: {e}"),
        };
    }

    /// Lines of the card preview. While editing, the active session is shown
    /// with a caret; otherwise the card's Markdown.
    fn preview_lines(&self) -> Vec<String> {
        if self.mode == Mode::Edit
            && let Some(session) = self.sessions.active()
        {
            return render_session(session.content(), session.document().caret());
        }
        self.selected_card()
            .and_then(|id| self.store.get(&id))
            .map(|card| document_to_markdown(&card.content).lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn render_session(root: &[Node], caret: Option<&cardmark_engine::Point>) -> Vec<String> {
    let mut lines = Vec::new();
    for block in tree::text_blocks(root) {
        let Some(element) = tree::element(root, &block) else {
            continue;
        };
        let mut text = element.children.iter().map(Node::text_content).collect::<String>();
        if let Some(caret) = caret
            && block.is_ancestor_of(&caret.path)
            && let Some(offset) = tree::block_offset(root, &block, caret)
        {
            text.insert_str(offset, CARET);
        }

        let prefix = match &element.kind {
            ElementKind::Heading { level } => format!("{} ", "#".repeat(usize::from(*level))),
            ElementKind::ListItem => "• ".to_string(),
            ElementKind::CodeBlock { .. } => "│ ".to_string(),
            ElementKind::Divider => "────".to_string(),
            ElementKind::PageBreak => "── page break ──".to_string(),
            _ if element.children.iter().any(|child| child.as_element().is_some()) => "▌ ".to_string(),
            _ => String::new(),
        };
        let mut block_lines = text.split('\n');
        lines.push(format!("{prefix}{}", block_lines.next().unwrap_or_default()));
        let indent = " ".repeat(prefix.chars().count());
        lines.extend(block_lines.map(|line| format!("{indent}{line}")));
    }
    lines
}

fn to_chord(key: &KeyEvent) -> Option<KeyChord> {
    let code = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Tab => Key::Tab,
        KeyCode::Esc => Key::Escape,
        _ => return None,
    };
    Some(KeyChord {
        key: code,
        modifiers: Modifiers {
            ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
            shift: key.modifiers.contains(KeyModifiers::SHIFT),
            alt: key.modifiers.contains(KeyModifiers::ALT),
            meta: key.modifiers.contains(KeyModifiers::SUPER),
        },
    })
}

fn card_template(defaults: &CardDefaults) -> CardTemplate {
    CardTemplate {
        width: defaults.width,
        background: Background::color(defaults.background_color.clone()),
        styles: CardStyles {
            padding: defaults.padding.clone(),
            default_font: defaults.font_family.clone(),
            default_size: defaults.font_size.clone(),
            default_color: defaults.color.clone(),
            line_height: defaults.line_height,
        },
        placeholder_text: defaults.placeholder.clone(),
    }
}

/// Log to a file beside the config so the terminal UI is not overwritten
fn init_logging() {
    let log_path = Config::log_path();
    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init(),
        Err(e) => eprintln!("Warning: cannot open log file {}: {e}", log_path.display()),
    }
}

fn main() -> Result<()> {
    init_logging();

    // Determine project path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let project_path = match (args.len(), &config) {
        (2, _) => PathBuf::from(&args[1]),
        (1, Some(config)) => config.project_path.clone(),
        (1, None) => {
            eprintln!("Error: No project file provided and no config file found");
            eprintln!("Usage: {} <project.json>", args[0]);
            eprintln!("Or create a config file at {}", config_path.display());
            process::exit(1);
        }
        _ => {
            eprintln!("Usage: {} [project.json]", args[0]);
            process::exit(1);
        }
    };
    let defaults = config.map(|config| config.card).unwrap_or_default();

    let mut app = match App::new(project_path.clone(), card_template(&defaults)) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: Cannot open project '{}': {e}", project_path.display());
            process::exit(1);
        }
    };
    log::info!("cardmark started on {}", project_path.display());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }
    if app.dirty {
        println!("Unsaved changes to {} were discarded", app.project_path.display());
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.mode {
            Mode::Edit => match key.code {
                KeyCode::Esc => app.stop_editing(),
                _ => {
                    if let Some(chord) = to_chord(&key) {
                        app.edit_key(chord);
                    }
                }
            },
            Mode::Browse => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_card(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_card(),
                KeyCode::Char('a') => app.add_card(),
                KeyCode::Char('d') => app.duplicate_card(),
                KeyCode::Char('x') => app.delete_card(),
                KeyCode::Char('s') => app.save(),
                KeyCode::Char('m') => app.export_markdown(),
                KeyCode::Enter | KeyCode::Char('e') => app.start_editing()?,
                _ => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(rows[0]);

    // Card list panel
    let card_items: Vec<ListItem> = app
        .store
        .sorted_cards()
        .iter()
        .map(|card| {
            let title = card
                .content
                .iter()
                .map(Node::text_content)
                .find(|text| !text.trim().is_empty())
                .unwrap_or_else(|| "(empty)".to_string());
            let title = title.lines().next().unwrap_or_default().to_string();
            ListItem::new(vec![Line::from(vec![
                Span::raw(title),
                Span::styled(format!("  {}px", card.width), Style::default().fg(Color::DarkGray)),
            ])])
        })
        .collect();

    let title = if app.dirty { "Cards *" } else { "Cards" };
    let cards_list = List::new(card_items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(cards_list, chunks[0], &mut app.card_list_state);

    // Preview panel
    let (panel_title, border_style) = match app.mode {
        Mode::Edit => ("Editing", Style::default().fg(Color::Green)),
        Mode::Browse => ("Markdown", Style::default()),
    };
    let content: Vec<Line> = app.preview_lines().into_iter().map(Line::from).collect();
    let preview = Paragraph::new(content)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(panel_title),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(preview, chunks[1]);

    // Help and status
    let help_text = match app.mode {
        Mode::Browse => "q: Quit | j/k: Select | e: Edit | a: Add | d: Duplicate | x: Delete | s: Save | m: Markdown",
        Mode::Edit => "Esc: Stop | Ctrl+B/I/U: Marks | Ctrl+Enter: Line break | Markdown shortcuts: # - 1. --- ```",
    };
    let mut status_spans = vec![Span::raw(help_text)];
    if app.mode == Mode::Edit
        && let Some(session) = app.sessions.active()
    {
        let snapshot = session.format_snapshot();
        let flags: String = [(snapshot.bold, 'B'), (snapshot.italic, 'I'), (snapshot.underline, 'U')]
            .into_iter()
            .filter_map(|(on, c)| on.then_some(c))
            .collect();
        status_spans.push(Span::styled(
            format!("  [{} {}]", snapshot.block_type, flags),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    let help = Paragraph::new(vec![
        Line::from(status_spans),
        Line::from(Span::styled(app.status.clone(), Style::default().fg(Color::Cyan))),
    ]);

    f.render_widget(help, rows[1]);
}

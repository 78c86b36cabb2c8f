//! Interactive TUI for browsing the catalog.

use crate::install::spawn_install;
use crate::loader::CatalogLoader;
use crate::resolver::{DetailStatus, spawn_resolve};
use crate::route::Route;
use crate::source::CatalogSource;
use crate::state::{Event, Message, Theme, ViewState, reduce};
use anyhow::Result;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use doohickey_catalog::Application;
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// ============================================================================
// Public entry points
// ============================================================================

/// Run the TUI starting from the list view
pub fn run_list<S: CatalogSource>(
    runtime: Handle,
    source: Arc<S>,
    fallback_after: Duration,
) -> Result<()> {
    App::new(runtime, source, fallback_after, Route::List).run()
}

/// Run the TUI starting from the given route
pub fn run_route<S: CatalogSource>(
    runtime: Handle,
    source: Arc<S>,
    fallback_after: Duration,
    route: Route,
) -> Result<()> {
    App::new(runtime, source, fallback_after, route).run()
}

// ============================================================================
// App state
// ============================================================================

struct App<S> {
    runtime: Handle,
    source: Arc<S>,
    fallback_after: Duration,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    view: ViewState,
    screen: Screen,
    /// Present while the list view is up; dropping it cancels the fallback timer.
    loader: Option<CatalogLoader>,
    next_generation: u64,
    should_quit: bool,
    pending_action: Option<PendingAction>,
}

enum Screen {
    List(ListScreen),
    Detail(DetailScreen),
}

#[derive(Default)]
struct ListScreen {
    list_state: ListState,
}

struct DetailScreen {
    route: Route,
    /// Results from any other generation belong to a view we already left.
    generation: u64,
    status: DetailStatus,
}

enum PendingAction {
    OpenUrl { url: String },
}

/// Colours for one theme.
struct Palette {
    background: Color,
    text: Color,
    title: Color,
    accent: Color,
    muted: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: Color::Rgb(0xf4, 0xf4, 0xf4),
                text: Color::Rgb(0x33, 0x33, 0x33),
                title: Color::Rgb(0x5a, 0x5a, 0x5a),
                accent: Color::Rgb(0x00, 0x56, 0xb3),
                muted: Color::Rgb(0x66, 0x66, 0x66),
                error: Color::Rgb(0xff, 0x57, 0x22),
            },
            Theme::Dark => Palette {
                background: Color::Rgb(0x12, 0x12, 0x12),
                text: Color::White,
                title: Color::Rgb(0xf4, 0xf4, 0xf4),
                accent: Color::Rgb(0x00, 0x7b, 0xff),
                muted: Color::Rgb(0xcc, 0xcc, 0xcc),
                error: Color::Rgb(0xf4, 0x43, 0x36),
            },
        }
    }
}

// ============================================================================
// App implementation
// ============================================================================

impl<S: CatalogSource> App<S> {
    fn new(runtime: Handle, source: Arc<S>, fallback_after: Duration, route: Route) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = Self {
            runtime,
            source,
            fallback_after,
            tx,
            rx,
            view: ViewState::default(),
            screen: Screen::List(ListScreen::default()),
            loader: None,
            next_generation: 0,
            should_quit: false,
            pending_action: None,
        };
        app.navigate(route);
        app
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn navigate(&mut self, route: Route) {
        tracing::debug!(path = %route.path(), "navigating");
        match route {
            Route::List => self.show_list(),
            Route::Detail { .. } => self.show_detail(route),
        }
    }

    /// Mount the list view and start a fresh catalog load.
    fn show_list(&mut self) {
        let generation = self.bump_generation();
        // Replacing the loader drops the previous one, cancelling its timer.
        self.loader = Some(CatalogLoader::activate(
            &self.runtime,
            Arc::clone(&self.source),
            generation,
            self.fallback_after,
            self.tx.clone(),
        ));
        // The current apps stay up while reloading, so the new fallback timer
        // only matters when nothing has loaded yet.
        self.screen = Screen::List(ListScreen::default());
        self.clamp_selection();
    }

    /// Mount the detail view and resolve its identifier in the background.
    fn show_detail(&mut self, route: Route) {
        let Some(identifier) = route.identifier().map(str::to_string) else {
            self.show_list();
            return;
        };
        let generation = self.bump_generation();
        self.loader = None;
        spawn_resolve(
            &self.runtime,
            Arc::clone(&self.source),
            identifier,
            generation,
            self.tx.clone(),
        );
        self.screen = Screen::Detail(DetailScreen {
            route,
            generation,
            status: DetailStatus::Loading,
        });
    }

    fn run(mut self) -> Result<()> {
        // Restore the terminal before printing any panic message, so the user
        // isn't left with a broken terminal.
        let hook = PanicHookGuard::install(restore_terminal);

        let result = self.run_inner();

        // Always restore the terminal, even if run_inner returned an error.
        ratatui::restore();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);

        drop(hook);
        result
    }

    fn run_inner(&mut self) -> Result<()> {
        let mut terminal = ratatui::init();

        loop {
            // Background completions are applied here and only here, so every
            // view-state mutation happens on this thread.
            self.process_messages();

            terminal.draw(|frame| self.render(frame))?;

            if let Some(action) = self.pending_action.take() {
                self.execute_action(action);
                continue;
            }

            if event::poll(Duration::from_millis(100))?
                && let TermEvent::Key(key) = event::read()?
            {
                // Windows compatibility: only handle Press events
                if key.kind == KeyEventKind::Press {
                    // Ctrl+C quits immediately
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        break;
                    }
                    self.handle_key(key.code);
                }
            }

            if self.should_quit {
                break;
            }
        }

        self.loader = None;
        Ok(())
    }

    fn process_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.apply_message(message);
        }
    }

    fn apply_message(&mut self, message: Message) {
        match message {
            Message::Catalog { generation, event } => {
                let current = self
                    .loader
                    .as_ref()
                    .is_some_and(|loader| loader.generation() == generation);
                if current {
                    self.dispatch(event);
                    self.clamp_selection();
                } else {
                    tracing::trace!(generation, "dropping stale catalog message");
                }
            }
            Message::Detail { generation, status } => {
                if let Screen::Detail(state) = &mut self.screen
                    && state.generation == generation
                {
                    state.status = status;
                } else {
                    tracing::trace!(generation, "dropping stale detail result");
                }
            }
            Message::Install(event) => self.dispatch(event),
        }
    }

    fn dispatch(&mut self, event: Event) {
        let view = std::mem::take(&mut self.view);
        self.view = reduce(view, event);
    }

    /// Keep the list selection inside the current catalog.
    fn clamp_selection(&mut self) {
        let len = self.view.apps.len();
        if let Screen::List(state) = &mut self.screen {
            match state.list_state.selected() {
                _ if len == 0 => state.list_state.select(None),
                None => state.list_state.select(Some(0)),
                Some(i) if i >= len => state.list_state.select(Some(len - 1)),
                Some(_) => {}
            }
        }
    }

    fn selected_app(&self, state: &ListScreen) -> Option<&Application> {
        state
            .list_state
            .selected()
            .and_then(|index| self.view.apps.get(index))
    }

    fn execute_action(&mut self, action: PendingAction) {
        match action {
            PendingAction::OpenUrl { url } => {
                if let Err(e) = open::that(&url) {
                    tracing::warn!(url, error = %e, "failed to open browser");
                    self.dispatch(Event::OpenUrlFailed { url });
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        enum Action {
            None,
            Quit,
            ListUp,
            ListDown,
            Open(String),
            Install(String),
            Reload,
            OpenUrl(String),
            Back,
        }

        // Keys shared by every screen
        match key {
            KeyCode::Char('t') => {
                self.dispatch(Event::ToggleTheme);
                return;
            }
            KeyCode::Char('x') => {
                self.dispatch(Event::DismissError);
                self.dispatch(Event::DismissNotice);
                return;
            }
            _ => {}
        }

        let action = match &self.screen {
            Screen::List(state) => match key {
                KeyCode::Up | KeyCode::Char('k') => Action::ListUp,
                KeyCode::Down | KeyCode::Char('j') => Action::ListDown,
                KeyCode::Enter => self
                    .selected_app(state)
                    .map_or(Action::None, |app| Action::Open(app.name.clone())),
                KeyCode::Char('i') => self
                    .selected_app(state)
                    .map_or(Action::None, |app| Action::Install(app.name.clone())),
                KeyCode::Char('r') => Action::Reload,
                KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
                _ => Action::None,
            },
            Screen::Detail(state) => {
                let ready = match &state.status {
                    DetailStatus::Ready(app) => Some(app),
                    _ => None,
                };
                match key {
                    KeyCode::Char('i') => {
                        ready.map_or(Action::None, |app| Action::Install(app.name.clone()))
                    }
                    KeyCode::Char('d') => ready
                        .filter(|app| !app.download_url.is_empty())
                        .map_or(Action::None, |app| Action::OpenUrl(app.download_url.clone())),
                    KeyCode::Char('s') => ready
                        .and_then(|app| app.source_url.clone())
                        .filter(|url| !url.is_empty())
                        .map_or(Action::None, Action::OpenUrl),
                    KeyCode::Esc | KeyCode::Backspace => Action::Back,
                    KeyCode::Char('q') => Action::Quit,
                    _ => Action::None,
                }
            }
        };

        match action {
            Action::None => {}
            Action::Quit => self.should_quit = true,
            Action::ListUp => {
                let count = self.view.apps.len();
                if let Screen::List(state) = &mut self.screen {
                    list_nav(&mut state.list_state, count, false);
                }
            }
            Action::ListDown => {
                let count = self.view.apps.len();
                if let Screen::List(state) = &mut self.screen {
                    list_nav(&mut state.list_state, count, true);
                }
            }
            Action::Open(name) => self.navigate(Route::detail(&name)),
            Action::Install(name) => {
                spawn_install(&self.runtime, Arc::clone(&self.source), name, self.tx.clone());
            }
            Action::Reload => self.show_list(),
            Action::OpenUrl(url) => self.pending_action = Some(PendingAction::OpenUrl { url }),
            Action::Back => self.navigate(Route::List),
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let palette = Palette::for_theme(self.view.theme);
        frame.render_widget(
            Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
            frame.area(),
        );

        match &mut self.screen {
            Screen::List(state) => render_list(frame, &self.view, state, &palette),
            Screen::Detail(state) => render_detail(frame, state, &palette),
        }

        render_messages(frame, &self.view, &palette);
    }
}

fn restore_terminal() {
    let _ = ratatui::try_restore();
    let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);
}

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

/// Runs `cleanup` ahead of the previous panic hook while alive, and puts the
/// previous hook back when dropped.
struct PanicHookGuard {
    previous: Arc<PanicHook>,
}

impl PanicHookGuard {
    fn install(cleanup: fn()) -> Self {
        let previous: Arc<PanicHook> = Arc::from(std::panic::take_hook());
        let chained = Arc::clone(&previous);
        std::panic::set_hook(Box::new(move |info| {
            cleanup();
            chained(info);
        }));
        Self { previous }
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        // Hooks cannot be swapped while panicking; the process is going down anyway.
        if std::thread::panicking() {
            return;
        }
        let previous = Arc::clone(&self.previous);
        std::panic::set_hook(Box::new(move |info| previous(info)));
    }
}

/// Clamped (non-wrapping) movement on a `ListState` within `0..count`.
fn list_nav(state: &mut ListState, count: usize, forward: bool) {
    if count == 0 {
        return;
    }
    let i = state.selected().unwrap_or(0);
    let next = if forward {
        (i + 1).min(count - 1)
    } else {
        i.saturating_sub(1)
    };
    state.select(Some(next));
}

// ============================================================================
// Screen renderers
// ============================================================================

fn app_list_item<'a>(app: &'a Application, palette: &Palette) -> ListItem<'a> {
    let desc = app.description.lines().next().unwrap_or("");
    ListItem::new(Text::from(vec![
        Line::from(Span::styled(
            app.name.as_str(),
            Style::default().fg(palette.accent).bold(),
        )),
        Line::from(Span::styled(desc, Style::default().fg(palette.muted))),
    ]))
}

fn render_list(frame: &mut Frame, view: &ViewState, state: &mut ListScreen, palette: &Palette) {
    let area = frame.area();

    let [header, main, footer] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let title = if view.loading && !view.apps.is_empty() {
        "App Doohickey (refreshing...)"
    } else {
        "App Doohickey"
    };
    frame.render_widget(
        Paragraph::new(title)
            .style(Style::default().fg(palette.title).bold())
            .centered(),
        header,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted));

    if view.apps.is_empty() {
        let message = if view.loading {
            "Loading apps..."
        } else {
            "No apps available."
        };
        let inner = block.inner(main);
        frame.render_widget(block, main);
        let [center] = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .areas(inner);
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(palette.muted))
                .centered(),
            center,
        );
    } else {
        let items: Vec<ListItem> = view
            .apps
            .iter()
            .map(|app| app_list_item(app, palette))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(palette.accent)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, main, &mut state.list_state);
    }

    frame.render_widget(
        Paragraph::new("↑↓/jk Navigate | Enter Details | i Install | r Reload | t Theme | x Dismiss | q Quit")
            .style(Style::default().fg(palette.muted))
            .centered(),
        footer,
    );
}

fn render_detail(frame: &mut Frame, state: &DetailScreen, palette: &Palette) {
    let area = frame.area();

    let [header, main, footer] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("← Back to Apps", Style::default().fg(palette.accent)),
            Span::styled(
                format!("  {}", state.route.path()),
                Style::default().fg(palette.muted),
            ),
        ])),
        header,
    );

    let footer_text = match &state.status {
        DetailStatus::Ready(_) => {
            "i Install | d Download | s Source | t Theme | x Dismiss | Esc Back | q Quit"
        }
        _ => "t Theme | Esc Back | q Quit",
    };

    match &state.status {
        DetailStatus::Failed(error) => {
            frame.render_widget(
                Paragraph::new(error.to_string())
                    .style(Style::default().fg(palette.title).bold())
                    .centered(),
                main,
            );
        }
        DetailStatus::Loading => {
            frame.render_widget(
                Paragraph::new("Loading...")
                    .style(Style::default().fg(palette.title).bold())
                    .centered(),
                main,
            );
        }
        DetailStatus::Ready(app) => {
            let [body, sidebar] =
                Layout::horizontal([Constraint::Fill(2), Constraint::Fill(1)]).areas(main);
            frame.render_widget(
                Paragraph::new(detail_body_lines(app, palette)).wrap(Wrap { trim: false }),
                body,
            );
            frame.render_widget(
                Paragraph::new(detail_sidebar_lines(app, palette))
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(palette.muted)),
                    )
                    .wrap(Wrap { trim: false }),
                sidebar,
            );
        }
    }

    frame.render_widget(
        Paragraph::new(footer_text)
            .style(Style::default().fg(palette.muted))
            .centered(),
        footer,
    );
}

fn detail_body_lines<'a>(app: &'a Application, palette: &Palette) -> Vec<Line<'a>> {
    let heading = Style::default().fg(palette.title).bold();
    let mut lines = vec![Line::styled(app.name.as_str(), heading), Line::from("")];

    if let Some(developer) = &app.developer {
        lines.push(Line::styled("Developer", Style::default().fg(palette.muted)));
        let mut spans = vec![Span::styled(
            developer.name.as_str(),
            Style::default().fg(palette.accent),
        )];
        if let Some(url) = &developer.url {
            spans.push(Span::styled(
                format!(" ({url})"),
                Style::default().fg(palette.muted),
            ));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    if !app.description.is_empty() {
        lines.push(Line::from(app.description.as_str()));
        lines.push(Line::from(""));
    }

    if let Some(long_description) = &app.long_description {
        lines.push(Line::styled("About", heading));
        lines.extend(long_description.lines().map(Line::from));
        lines.push(Line::from(""));
    }

    if let Some(features) = &app.features {
        lines.push(Line::styled("Features", heading));
        for feature in features {
            lines.push(Line::from(format!("  • {feature}")));
        }
    }

    lines
}

fn detail_sidebar_lines<'a>(app: &'a Application, palette: &Palette) -> Vec<Line<'a>> {
    let label = Style::default().fg(palette.text).bold();
    let value = Style::default().fg(palette.muted);

    let mut lines = vec![Line::styled(
        format!("[d] Download {}", app.name),
        Style::default().fg(palette.accent).bold(),
    )];
    if app.source_url.as_deref().is_some_and(|url| !url.is_empty()) {
        lines.push(Line::styled(
            "[s] Source Code",
            Style::default().fg(palette.accent),
        ));
    }
    lines.push(Line::from(""));

    let meta = [
        ("Version", &app.version),
        ("Release Date", &app.release_date),
        ("Size", &app.size),
        ("System Requirements", &app.requirements),
    ];
    for (name, text) in meta {
        if text.is_empty() {
            continue;
        }
        lines.push(Line::styled(name, label));
        lines.push(Line::styled(text.as_str(), value));
        lines.push(Line::from(""));
    }

    lines
}

/// Error and notice popups along the bottom edge, error lowest.
fn render_messages(frame: &mut Frame, view: &ViewState, palette: &Palette) {
    let area = frame.area();
    let mut offset = 1;

    if let Some(error) = &view.error {
        let rect = bottom_popup(area, error, offset);
        render_popup(frame, rect, error, palette.error);
        offset += rect.height;
    }
    if let Some(notice) = &view.notice {
        let rect = bottom_popup(area, notice, offset);
        render_popup(frame, rect, notice, palette.accent);
    }
}

fn render_popup(frame: &mut Frame, rect: Rect, message: &str, background: Color) {
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw(message),
            Span::styled("  [x]", Style::default().add_modifier(Modifier::DIM)),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().bg(background).fg(Color::White))
        .centered(),
        rect,
    );
}

/// A 3-row rect centred horizontally, `offset` rows above the bottom edge.
fn bottom_popup(area: Rect, message: &str, offset: u16) -> Rect {
    let height = 3;
    let width = u16::try_from(message.chars().count())
        .unwrap_or(u16::MAX)
        .saturating_add(10)
        .min(area.width);
    let y = area
        .bottom()
        .saturating_sub(offset.saturating_add(height))
        .max(area.y);
    Rect {
        x: area.x + (area.width - width) / 2,
        y,
        width,
        height: height.min(area.height),
    }
}

use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use popcorn_core::{
    models::{MovieDetail, WatchedEntry, MAX_USER_RATING},
    Catalog, DetailLoader, DetailState, SearchController, SearchState, Watchlist, WatchlistError,
    MIN_QUERY_LEN,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_QUERY_LEN: usize = 120;
const APP_TITLE: &str = "usePopcorn";

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Magenta,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Query,
    Results,
    Side,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Query => Focus::Results,
            Focus::Results => Focus::Side,
            Focus::Side => Focus::Query,
        }
    }

    fn previous(self) -> Self {
        match self {
            Focus::Query => Focus::Side,
            Focus::Results => Focus::Query,
            Focus::Side => Focus::Results,
        }
    }
}

/// Single-line text input. `cursor` counts characters, not bytes.
#[derive(Debug, Clone, Default)]
struct QueryInput {
    value: String,
    cursor: usize,
}

impl QueryInput {
    fn value(&self) -> &str {
        &self.value
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }

    /// Terminal columns taken by the text left of the cursor.
    fn cursor_column(&self) -> usize {
        Line::from(&self.value[..self.byte_index(self.cursor)]).width()
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) -> bool {
        if ch.is_control() || self.char_len() >= MAX_QUERY_LEN {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
        true
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
        true
    }

    fn clear(&mut self) -> bool {
        if self.value.is_empty() {
            return false;
        }
        self.value.clear();
        self.cursor = 0;
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ListCursor {
    index: usize,
    height: usize,
}

impl ListCursor {
    fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.index = 0;
            return;
        }
        self.index = (self.index as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    fn move_to(&mut self, index: usize, len: usize) {
        self.index = index.min(len.saturating_sub(1));
    }

    fn page(&mut self, direction: isize, len: usize) {
        let step = self.height.max(1) as isize;
        self.move_by(direction * step, len);
    }

    fn clamp(&mut self, len: usize) {
        self.move_by(0, len);
    }

    /// Shared list navigation; returns whether the key was consumed.
    fn handle_key(&mut self, key: &KeyEvent, len: usize) -> bool {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_by(1, len),
            KeyCode::Char('k') | KeyCode::Up => self.move_by(-1, len),
            KeyCode::Char('g') | KeyCode::Home => self.move_to(0, len),
            KeyCode::Char('G') | KeyCode::End => self.move_to(usize::MAX, len),
            KeyCode::PageDown => self.page(1, len),
            KeyCode::PageUp => self.page(-1, len),
            _ => return false,
        }
        true
    }
}

fn rating_from_digit(ch: char) -> Option<u8> {
    match ch.to_digit(10)? {
        0 => Some(MAX_USER_RATING),
        digit => Some(digit as u8),
    }
}

fn step_rating(current: u8, delta: i16) -> u8 {
    (i16::from(current) + delta).clamp(1, i16::from(MAX_USER_RATING)) as u8
}

fn format_score(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |value| format!("{value:.1}"))
}

enum AppEvent {
    Input(Event),
    Tick,
}

struct UiState {
    query: QueryInput,
    focus: Focus,
    results: ListCursor,
    watched: ListCursor,
    rating: u8,
    shown_selection: Option<String>,
    window_title: String,
    results_open: bool,
    side_open: bool,
    spinner: usize,
    status: String,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            query: QueryInput::default(),
            focus: Focus::Query,
            results: ListCursor::default(),
            watched: ListCursor::default(),
            rating: 0,
            shown_selection: None,
            window_title: APP_TITLE.to_string(),
            results_open: true,
            side_open: true,
            spinner: 0,
            status: "Ready".to_string(),
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}

/// Terminal frontend: search box, result list, movie detail and watch-list.
pub struct PopcornApp {
    search: SearchController,
    detail: DetailLoader,
    watchlist: Watchlist,
    state: UiState,
    theme: Theme,
    has_api_key: bool,
}

impl PopcornApp {
    pub fn new(catalog: Arc<dyn Catalog>, watchlist: Watchlist, has_api_key: bool) -> Self {
        Self {
            search: SearchController::new(catalog.clone()),
            detail: DetailLoader::new(catalog),
            watchlist,
            state: UiState::default(),
            theme: Theme::default(),
            has_api_key,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let status = if self.has_api_key {
            format!("{} movies on your watch-list", self.watchlist.len())
        } else {
            "No API key configured: set POPCORN_CATALOG__API_KEY or edit config.toml".to_string()
        };
        self.state.set_status(status);

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen, SetTitle(APP_TITLE))
            .context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);
        let mut search_rx = self.search.subscribe();
        let mut detail_rx = self.detail.subscribe();

        let result = self
            .event_loop(&mut terminal, &mut event_rx, &mut search_rx, &mut detail_rx)
            .await;

        restore_terminal(&mut terminal)?;
        info!("Shutting down");
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
        search_rx: &mut watch::Receiver<SearchState>,
        detail_rx: &mut watch::Receiver<DetailState>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break;
                    }
                }
                Ok(()) = search_rx.changed() => self.on_search_changed(),
                Ok(()) = detail_rx.changed() => self.on_detail_changed(),
            }

            if self.state.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    error!(?err, "Input handling failed");
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.state.spinner = self.state.spinner.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    fn on_search_changed(&mut self) {
        let search = self.search.state();
        self.state.results.clamp(search.results.len());
        if !search.loading {
            debug!(
                query = %search.query,
                results = search.results.len(),
                error = %search.error,
                "Search state settled"
            );
        }
    }

    fn on_detail_changed(&mut self) {
        let detail = self.detail.state();
        if detail.selected != self.state.shown_selection {
            self.state.rating = 0;
            self.state.shown_selection = detail.selected.clone();
        }
        if let Some(message) = detail.error.as_deref() {
            self.state
                .set_status(format!("Could not load movie details: {message}"));
        }
        let title = match detail.title() {
            Some(title) => format!("movie | {title}"),
            None => APP_TITLE.to_string(),
        };
        self.set_window_title(title);
    }

    fn set_window_title(&mut self, title: String) {
        if self.state.window_title == title {
            return;
        }
        if let Err(err) = execute!(io::stdout(), SetTitle(&title)) {
            debug!(?err, "Failed to set terminal title");
        }
        self.state.window_title = title;
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            _ => Ok(()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        match key.code {
            KeyCode::Tab => {
                self.state.focus = self.state.focus.next();
                return Ok(());
            }
            KeyCode::BackTab => {
                self.state.focus = self.state.focus.previous();
                return Ok(());
            }
            KeyCode::Esc => {
                if self.detail.selected().is_some() {
                    self.detail.clear();
                    self.state.set_status("Closed movie details".to_string());
                } else if self.state.focus == Focus::Query {
                    self.state.focus = Focus::Results;
                }
                return Ok(());
            }
            _ => {}
        }

        if self.state.focus == Focus::Query {
            return self.handle_query_key(key);
        }
        if self.handle_global_shortcut(&key) {
            return Ok(());
        }
        match self.state.focus {
            Focus::Query => Ok(()),
            Focus::Results => self.handle_results_key(key),
            Focus::Side if self.detail.selected().is_some() => self.handle_detail_key(key),
            Focus::Side => self.handle_watched_key(key),
        }
    }

    fn handle_global_shortcut(&mut self, key: &KeyEvent) -> bool {
        if !(key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT) {
            return false;
        }
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Char('/') => {
                self.state.focus = Focus::Query;
                if self.state.query.clear() {
                    self.apply_query();
                }
            }
            KeyCode::Char('[') => {
                self.state.results_open = !self.state.results_open;
                let message = if self.state.results_open {
                    "Results expanded"
                } else {
                    "Results collapsed"
                };
                self.state.set_status(message.to_string());
            }
            KeyCode::Char(']') => {
                self.state.side_open = !self.state.side_open;
                let message = if self.state.side_open {
                    "Side panel expanded"
                } else {
                    "Side panel collapsed"
                };
                self.state.set_status(message.to_string());
            }
            _ => return false,
        }
        true
    }

    fn handle_query_key(&mut self, key: KeyEvent) -> Result<()> {
        let edited = match key.code {
            KeyCode::Enter | KeyCode::Down => {
                self.state.focus = Focus::Results;
                false
            }
            KeyCode::Left => {
                self.state.query.move_cursor(-1);
                false
            }
            KeyCode::Right => {
                self.state.query.move_cursor(1);
                false
            }
            KeyCode::Home => {
                self.state.query.move_home();
                false
            }
            KeyCode::End => {
                self.state.query.move_end();
                false
            }
            KeyCode::Backspace => self.state.query.backspace(),
            KeyCode::Delete => self.state.query.delete(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.query.clear()
            }
            KeyCode::Char(c)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.state.query.insert(c)
            }
            _ => false,
        };
        if edited {
            self.apply_query();
        }
        Ok(())
    }

    fn apply_query(&mut self) {
        let query = self.state.query.value().to_string();
        debug!(query = %query, "Query edited");
        self.search.set_query(query);
        self.state.results.move_to(0, 0);
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> Result<()> {
        let results = self.search.state().results;
        if self.state.results.handle_key(&key, results.len()) {
            return Ok(());
        }
        if let KeyCode::Enter | KeyCode::Char(' ') = key.code {
            let Some(item) = results.get(self.state.results.index) else {
                return Ok(());
            };
            self.detail.toggle(&item.id);
            if self.detail.selected().is_some() {
                info!(id = %item.id, title = %item.title, "Movie selected");
                self.state.focus = Focus::Side;
                self.state
                    .set_status(format!("Loading {} ({})", item.title, item.year));
            } else {
                self.state.set_status(format!("Closed {}", item.title));
            }
        }
        Ok(())
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter | KeyCode::Char('a') => self.add_to_watchlist(),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => {
                self.change_rating(step_rating(self.state.rating, -1));
                Ok(())
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') => {
                self.change_rating(step_rating(self.state.rating, 1));
                Ok(())
            }
            KeyCode::Char(c) => {
                if let Some(rating) = rating_from_digit(c) {
                    self.change_rating(rating);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn change_rating(&mut self, rating: u8) {
        let Some(id) = self.detail.selected() else {
            return;
        };
        if let Some(existing) = self.watchlist.rating_for(&id) {
            self.state
                .set_status(format!("You already rated this movie {existing}"));
            return;
        }
        self.state.rating = rating;
    }

    fn add_to_watchlist(&mut self) -> Result<()> {
        let detail = self.detail.state();
        let Some(movie) = detail.detail else {
            let message = if detail.loading {
                "Movie details are still loading"
            } else {
                "No movie details to add"
            };
            self.state.set_status(message.to_string());
            return Ok(());
        };
        if let Some(existing) = self.watchlist.get(&movie.id) {
            let message = match existing.user_rating {
                Some(rating) => format!("You already rated this movie {rating}"),
                None => format!("{} is already on your watch-list", movie.title),
            };
            self.state.set_status(message);
            return Ok(());
        }
        if self.state.rating == 0 {
            self.state
                .set_status("Pick a rating first: ←/→ or 1-9, 0 for 10".to_string());
            return Ok(());
        }

        let rating = self.state.rating;
        let outcome = WatchedEntry::from_detail(&movie, rating)
            .and_then(|entry| self.watchlist.add(entry));
        match outcome {
            Ok(()) => {
                self.state
                    .set_status(format!("Added {} with your rating {rating}", movie.title));
            }
            Err(WatchlistError::Persist(err)) => {
                warn!(?err, id = %movie.id, "Watch-list entry kept in memory only");
                self.state.set_status(format!(
                    "Added {} but the watch-list could not be saved: {err:#}",
                    movie.title
                ));
            }
            Err(err) => {
                self.state.set_status(err.to_string());
                return Ok(());
            }
        }
        let len = self.watchlist.len();
        self.state.watched.move_to(len, len);
        self.detail.clear();
        Ok(())
    }

    fn handle_watched_key(&mut self, key: KeyEvent) -> Result<()> {
        let len = self.watchlist.len();
        if self.state.watched.handle_key(&key, len) {
            return Ok(());
        }
        if let KeyCode::Char('d') | KeyCode::Delete = key.code {
            self.remove_highlighted();
        }
        Ok(())
    }

    fn remove_highlighted(&mut self) {
        let Some(entry) = self.watchlist.entries().get(self.state.watched.index) else {
            return;
        };
        let (id, title) = (entry.id.clone(), entry.title.clone());
        match self.watchlist.remove(&id) {
            Ok(true) => self.state.set_status(format!("Removed {title}")),
            Ok(false) => {}
            Err(err) => {
                warn!(?err, id = %id, "Watch-list removal not saved");
                self.state
                    .set_status(format!("Removed {title} but saving failed: {err}"));
            }
        }
        self.state.watched.clamp(self.watchlist.len());
    }

    fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.theme.accent)
        } else {
            Style::default()
        }
    }

    fn loader_line(&self) -> Line<'static> {
        let dots = ".".repeat(self.state.spinner % 4);
        Line::from(Span::styled(
            format!("Loading{dots}"),
            Style::default().fg(self.theme.muted),
        ))
    }

    fn draw(&mut self, frame: &mut Frame) {
        let search = self.search.state();
        let detail = self.detail.state();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(frame.size());

        self.render_navbar(frame, chunks[0], &search);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[1]);

        self.render_results(frame, body[0], &search, &detail);
        if detail.selected.is_some() {
            self.render_detail(frame, body[1], &detail);
        } else {
            self.render_watched(frame, body[1]);
        }
        self.render_status(frame, chunks[2]);
    }

    fn render_navbar(&self, frame: &mut Frame, area: Rect, search: &SearchState) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(16),
                Constraint::Min(20),
                Constraint::Length(22),
            ])
            .split(area);

        let logo = Paragraph::new(Line::from(vec![
            Span::raw("🍿 "),
            Span::styled(
                "usePopcorn",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(logo, columns[0]);

        let focused = self.state.focus == Focus::Query;
        let input = if self.state.query.value().is_empty() && !focused {
            Line::from(Span::styled(
                "Search movies... (/)",
                Style::default().fg(self.theme.muted),
            ))
        } else {
            Line::from(self.state.query.value().to_string())
        };
        let input_area = columns[1];
        frame.render_widget(
            Paragraph::new(input).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Search")
                    .border_style(self.border_style(focused)),
            ),
            input_area,
        );
        if focused {
            let cursor_x = (input_area.x + 1 + self.state.query.cursor_column() as u16)
                .min(input_area.x + input_area.width.saturating_sub(2));
            frame.set_cursor(cursor_x, input_area.y + 1);
        }

        let found = Paragraph::new(Line::from(vec![
            Span::raw("Found "),
            Span::styled(
                search.results.len().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" results"),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(found, columns[2]);
    }

    fn render_collapsed(&self, frame: &mut Frame, area: Rect, title: &str, key: char) {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!("[+] press {key} to expand"),
            Style::default().fg(self.theme.muted),
        )))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
        frame.render_widget(paragraph, area);
    }

    fn render_results(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        search: &SearchState,
        detail: &DetailState,
    ) {
        if !self.state.results_open {
            self.render_collapsed(frame, area, "Results", '[');
            return;
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Results")
            .border_style(self.border_style(self.state.focus == Focus::Results));

        if search.loading {
            frame.render_widget(Paragraph::new(self.loader_line()).block(block), area);
            return;
        }
        if search.has_error() {
            let message = Line::from(Span::styled(
                format!("⛔ {}", search.error),
                Style::default().fg(self.theme.danger),
            ));
            frame.render_widget(
                Paragraph::new(message)
                    .block(block)
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }
        if search.results.is_empty() {
            let hint = if search.query.trim().chars().count() < MIN_QUERY_LEN {
                format!("Type at least {MIN_QUERY_LEN} characters to search")
            } else {
                "No results".to_string()
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    hint,
                    Style::default().fg(self.theme.muted),
                )))
                .block(block),
                area,
            );
            return;
        }

        self.state.results.height = area.height.saturating_sub(2) as usize;
        self.state.results.clamp(search.results.len());

        let items: Vec<ListItem> = search
            .results
            .iter()
            .map(|item| {
                let open = detail.selected.as_deref() == Some(item.id.as_str());
                let marker = if open {
                    Span::styled("● ", Style::default().fg(self.theme.accent))
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::styled(
                        item.title.clone(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  🗓 {}", item.year),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        let mut list_state = ListState::default().with_selected(Some(self.state.results.index));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, detail: &DetailState) {
        if !self.state.side_open {
            self.render_collapsed(frame, area, "Movie", ']');
            return;
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .title(detail.title().unwrap_or("Movie").to_string())
            .border_style(self.border_style(self.state.focus == Focus::Side));

        let lines = if detail.loading {
            vec![self.loader_line()]
        } else if let Some(movie) = &detail.detail {
            self.detail_lines(movie)
        } else {
            let message = detail.error.as_deref().unwrap_or("Nothing to show");
            vec![Line::from(Span::styled(
                format!("⛔ {message}"),
                Style::default().fg(self.theme.danger),
            ))]
        };

        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true }),
            area,
        );
    }

    fn detail_lines(&self, movie: &MovieDetail) -> Vec<Line<'static>> {
        let muted = Style::default().fg(self.theme.muted);
        let mut lines = vec![
            Line::from(Span::styled(
                movie.title.clone(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("{} • {}", movie.released, movie.runtime),
                muted,
            )),
            Line::from(movie.genre.clone()),
            Line::from(vec![
                Span::styled("⭐ ", Style::default().fg(self.theme.warning)),
                Span::raw(format!("{} IMDb rating", format_score(movie.external_rating))),
            ]),
            Line::from(""),
        ];

        match self.watchlist.get(&movie.id) {
            Some(entry) => {
                let message = match entry.user_rating {
                    Some(rating) => format!("You already rated this movie {rating} ⭐"),
                    None => "Already on your watch-list".to_string(),
                };
                lines.push(Line::from(Span::styled(
                    message,
                    Style::default().fg(self.theme.success),
                )));
            }
            None => {
                let rating = self.state.rating;
                let mut stars: Vec<Span> = (1..=MAX_USER_RATING)
                    .map(|n| {
                        if n <= rating {
                            Span::styled("★ ", Style::default().fg(self.theme.warning))
                        } else {
                            Span::styled("☆ ", muted)
                        }
                    })
                    .collect();
                let label = if rating == 0 {
                    " rate with ←/→ or 1-9, 0 for 10".to_string()
                } else {
                    format!(" {rating}/{MAX_USER_RATING}")
                };
                stars.push(Span::raw(label));
                lines.push(Line::from(stars));
                if rating > 0 {
                    lines.push(Line::from(Span::styled(
                        "[Enter] + Add to list",
                        Style::default()
                            .fg(self.theme.success)
                            .add_modifier(Modifier::BOLD),
                    )));
                }
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            movie.plot.clone(),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(format!("Starring {}", movie.actors)));
        lines.push(Line::from(format!("Directed by {}", movie.director)));
        lines
    }

    fn render_watched(&mut self, frame: &mut Frame, area: Rect) {
        if !self.state.side_open {
            self.render_collapsed(frame, area, "Watched", ']');
            return;
        }
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(3)])
            .split(area);

        let summary = self.watchlist.summary();
        let summary_lines = vec![
            Line::from(Span::styled(
                format!("#️⃣ {} movies", summary.count),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "⭐️ {:.2}   🌟 {:.2}   ⏳ {:.2} min",
                summary.avg_external_rating, summary.avg_user_rating, summary.avg_runtime
            )),
        ];
        frame.render_widget(
            Paragraph::new(summary_lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Movies you watched"),
            ),
            chunks[0],
        );

        let focused = self.state.focus == Focus::Side;
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Watch-list")
            .border_style(self.border_style(focused));
        let entries = self.watchlist.entries();
        if entries.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "Rate a movie to add it here",
                    Style::default().fg(self.theme.muted),
                )))
                .block(block),
                chunks[1],
            );
            return;
        }

        self.state.watched.height = chunks[1].height.saturating_sub(2) as usize / 2;
        self.state.watched.clamp(entries.len());

        let muted = Style::default().fg(self.theme.muted);
        let items: Vec<ListItem> = entries
            .iter()
            .map(|entry| {
                let mut details = format!(
                    "  ⭐️ {}  🌟 {}  ⏳ {} min",
                    format_score(entry.external_rating),
                    entry
                        .user_rating
                        .map_or_else(|| "-".to_string(), |rating| rating.to_string()),
                    entry
                        .runtime
                        .map_or_else(|| "N/A".to_string(), |runtime| format!("{runtime:.0}")),
                );
                if let Some(watched_at) = entry.watched_at {
                    details.push_str(&format!(
                        "  {}",
                        watched_at.with_timezone(&Local).format("%Y-%m-%d")
                    ));
                }
                ListItem::new(vec![
                    Line::from(Span::styled(
                        entry.title.clone(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(details, muted)),
                ])
            })
            .collect();

        let mut list = List::new(items).block(block);
        if focused {
            list = list.highlight_style(Style::default().bg(self.theme.selection_bg));
        }
        let mut list_state = ListState::default().with_selected(Some(self.state.watched.index));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let hints = match self.state.focus {
            Focus::Query => "Type to search  Enter results  Tab focus  Esc close  Ctrl-C quit",
            Focus::Results => "↑/↓ move  Enter open  / search  [ ] collapse  Tab focus  q quit",
            Focus::Side if self.state.shown_selection.is_some() => {
                "←/→ or 0-9 rate  Enter add  Esc close  Tab focus  q quit"
            }
            Focus::Side => "↑/↓ move  d remove  / search  [ ] collapse  Tab focus  q quit",
        };
        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(hints, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_input_edits_by_character() {
        let mut input = QueryInput::default();
        for ch in "Amélie".chars() {
            assert!(input.insert(ch));
        }
        assert_eq!(input.value(), "Amélie");

        input.move_cursor(-3);
        assert!(input.backspace());
        assert_eq!(input.value(), "Amlie");
        assert!(input.delete());
        assert_eq!(input.value(), "Amie");

        input.move_home();
        assert!(!input.backspace());
        input.move_end();
        assert!(!input.delete());
        assert!(input.clear());
        assert!(!input.clear());
    }

    #[test]
    fn cursor_column_counts_display_width() {
        let mut input = QueryInput::default();
        for ch in "東京 story".chars() {
            input.insert(ch);
        }
        assert_eq!(input.cursor_column(), 10);

        input.move_home();
        input.move_cursor(2);
        assert_eq!(input.cursor, 2);
        assert_eq!(input.cursor_column(), 4);

        input.move_home();
        assert_eq!(input.cursor_column(), 0);
    }

    #[test]
    fn query_input_rejects_control_and_overflow() {
        let mut input = QueryInput::default();
        assert!(!input.insert('\n'));
        for _ in 0..MAX_QUERY_LEN {
            input.insert('a');
        }
        assert!(!input.insert('b'));
        assert_eq!(input.char_len(), MAX_QUERY_LEN);
    }

    #[test]
    fn list_cursor_stays_in_bounds() {
        let mut cursor = ListCursor {
            index: 0,
            height: 3,
        };
        cursor.move_by(-1, 5);
        assert_eq!(cursor.index, 0);
        cursor.page(1, 5);
        assert_eq!(cursor.index, 3);
        cursor.page(1, 5);
        assert_eq!(cursor.index, 4);
        cursor.clamp(2);
        assert_eq!(cursor.index, 1);
        cursor.clamp(0);
        assert_eq!(cursor.index, 0);
    }

    #[test]
    fn digits_map_to_ratings() {
        assert_eq!(rating_from_digit('1'), Some(1));
        assert_eq!(rating_from_digit('9'), Some(9));
        assert_eq!(rating_from_digit('0'), Some(MAX_USER_RATING));
        assert_eq!(rating_from_digit('x'), None);
    }

    #[test]
    fn rating_steps_are_clamped() {
        assert_eq!(step_rating(0, 1), 1);
        assert_eq!(step_rating(0, -1), 1);
        assert_eq!(step_rating(5, 1), 6);
        assert_eq!(step_rating(MAX_USER_RATING, 1), MAX_USER_RATING);
    }

    #[test]
    fn focus_cycles_both_ways() {
        let mut focus = Focus::Query;
        for _ in 0..3 {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::Query);
        assert_eq!(Focus::Query.previous(), Focus::Side);
    }
}

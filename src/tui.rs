use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::cell::RefCell;
use std::io::stdout;
use std::rc::Rc;

use crate::auth::{AuthSession, SubscriptionId};
use crate::browser;
use crate::catalog::Catalog;
use crate::favorites::Favorites;
use crate::models::{ExperienceLevel, JobListing, JobType, SalaryRange, SortMode};
use crate::query::{self, page_window, QueryState};

#[derive(Debug, Clone, Copy, PartialEq)]
enum InputMode {
    Normal,
    Search,
    Location,
}

struct AppState<'a> {
    catalog: &'a Catalog,
    query: QueryState,
    favorites: Favorites<'a>,
    selected: usize,
    scroll_offset: u16,
    mode: InputMode,
    message: Option<String>,
    /// Display name of the signed-in user, fed by the auth session.
    identity: Rc<RefCell<Option<String>>>,
}

impl<'a> AppState<'a> {
    fn new(catalog: &'a Catalog, query: QueryState, favorites: Favorites<'a>) -> Self {
        let mut state = Self {
            catalog,
            query,
            favorites,
            selected: 0,
            scroll_offset: 0,
            mode: InputMode::Normal,
            message: None,
            identity: Rc::new(RefCell::new(None)),
        };
        state.refresh();
        state
    }

    fn results(&self) -> query::QueryResult<'a> {
        query::apply(self.catalog.listings(), &self.query)
    }

    fn current_job(&self) -> Option<&'a JobListing> {
        self.results().page.get(self.selected).copied()
    }

    /// Re-runs the query after a state change and keeps page and selection in range.
    fn refresh(&mut self) {
        let total_pages = self.results().total_pages;
        self.query.clamp_page(total_pages);
        let on_page = self.results().page.len();
        if self.selected >= on_page {
            self.selected = on_page.saturating_sub(1);
        }
    }

    fn next(&mut self) {
        let on_page = self.results().page.len();
        if on_page > 0 && self.selected < on_page - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn next_page(&mut self) {
        if self.results().has_next(self.query.current_page) {
            self.go_to_page(self.query.current_page + 1);
        }
    }

    fn prev_page(&mut self) {
        if self.results().has_previous(self.query.current_page) {
            self.go_to_page(self.query.current_page - 1);
        }
    }

    fn go_to_page(&mut self, page: u32) {
        self.query.current_page = page;
        self.selected = 0;
        self.scroll_offset = 0;
        self.refresh();
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn toggle_favorite(&mut self) {
        if let Some(job) = self.current_job() {
            let id = job.id;
            self.favorites.toggle(id);
            self.message = Some(if self.favorites.is_favorite(id) {
                format!("Saved #{}", id)
            } else {
                format!("Removed #{} from saved jobs", id)
            });
        }
    }

    fn clear_filters(&mut self) {
        if self.query.has_active_filters() {
            self.query.clear_filters();
            self.refresh();
            self.message = Some("Filters cleared".to_string());
        }
    }

    fn watch_identity(&self, session: &mut AuthSession<'_>) -> SubscriptionId {
        let identity = Rc::clone(&self.identity);
        session.subscribe(move |user| {
            *identity.borrow_mut() = user.map(|u| u.display_name.clone());
        })
    }

    fn identity_label(&self) -> String {
        match self.identity.borrow().as_deref() {
            Some(name) => format!("Signed in as {}", name),
            None => "Guest".to_string(),
        }
    }

    fn help_line(&self) -> String {
        if self.mode != InputMode::Normal {
            return " type to edit  backspace:delete  enter/esc:done".to_string();
        }
        let mut help = String::from(
            " j/k:select n/p:page /:search l:location t:type e:level s:salary r:remote o:sort",
        );
        if self.query.has_active_filters() {
            help.push_str(" c:clear");
        }
        help.push_str(" f:save a:apply");
        if self.identity.borrow().is_some() {
            help.push_str(" L:logout");
        }
        help.push_str(" q:quit");
        help
    }

    fn apply_to_current(&mut self) {
        if let Some(job) = self.current_job() {
            self.message = Some(match browser::open_link(&job.apply_link) {
                Ok(()) => format!("Opened {}", job.apply_link),
                Err(e) => format!("{:#}", e),
            });
        }
    }

    fn edit_text(&mut self, key: KeyCode) {
        let field = match self.mode {
            InputMode::Search => &mut self.query.search_query,
            InputMode::Location => &mut self.query.location_query,
            InputMode::Normal => return,
        };
        match key {
            KeyCode::Enter | KeyCode::Esc => self.mode = InputMode::Normal,
            KeyCode::Backspace => {
                field.pop();
            }
            KeyCode::Char(c) => field.push(c),
            _ => {}
        }
        self.refresh();
    }
}

pub fn run_browse(
    catalog: &Catalog,
    query: QueryState,
    favorites: Favorites<'_>,
    session: &mut AuthSession<'_>,
) -> Result<()> {
    let mut state = AppState::new(catalog, query, favorites);
    let subscription = state.watch_identity(session);
    session.start();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, session);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    session.unsubscribe(subscription);
    session.stop();

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    session: &mut AuthSession,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(Some(state.selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if state.mode != InputMode::Normal {
                state.edit_text(key.code);
                continue;
            }
            state.message = None;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Right | KeyCode::Char('n') => state.next_page(),
                KeyCode::Left | KeyCode::Char('p') => state.prev_page(),
                KeyCode::Char('/') => state.mode = InputMode::Search,
                KeyCode::Char('l') => state.mode = InputMode::Location,
                KeyCode::Char('t') => {
                    state.query.job_type = cycle(state.query.job_type, JobType::ALL);
                    state.refresh();
                }
                KeyCode::Char('e') => {
                    state.query.experience = cycle(state.query.experience, ExperienceLevel::ALL);
                    state.refresh();
                }
                KeyCode::Char('s') => {
                    state.query.salary = cycle(state.query.salary, SalaryRange::ALL);
                    state.refresh();
                }
                KeyCode::Char('r') => {
                    state.query.remote_only = !state.query.remote_only;
                    state.refresh();
                }
                KeyCode::Char('o') => {
                    state.query.sort = match state.query.sort {
                        SortMode::Newest => SortMode::Oldest,
                        SortMode::Oldest => SortMode::Salary,
                        SortMode::Salary => SortMode::Newest,
                    };
                    state.refresh();
                }
                KeyCode::Char('c') => state.clear_filters(),
                KeyCode::Char('L') => {
                    if session.current_user().is_some() {
                        session.logout();
                        state.message = Some("Signed out".to_string());
                    }
                }
                KeyCode::Char('f') | KeyCode::Char(' ') => state.toggle_favorite(),
                KeyCode::Char('a') | KeyCode::Enter => state.apply_to_current(),
                _ => {}
            }
        }
    }
    Ok(())
}

/// Steps an optional filter through "all" and then each value in turn.
fn cycle<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(value) => {
            let pos = all.iter().position(|v| *v == value)?;
            all.get(pos + 1).copied()
        }
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let results = state.results();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Header: counts and active query
    let location = if state.query.location_query.is_empty() {
        "All locations".to_string()
    } else {
        format!("Jobs in \"{}\"", state.query.location_query)
    };
    let mut filters = vec![format!("sort:{}", state.query.sort)];
    if let Some(t) = state.query.job_type {
        filters.push(t.to_string());
    }
    if let Some(e) = state.query.experience {
        filters.push(e.to_string());
    }
    if let Some(s) = state.query.salary {
        filters.push(s.to_string());
    }
    if state.query.remote_only {
        filters.push("Remote only".to_string());
    }
    let search_style = if state.mode == InputMode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let location_style = if state.mode == InputMode::Location {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} Jobs Found", results.total_matched),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {}  ", location)),
        Span::styled(format!("search:[{}] ", state.query.search_query), search_style),
        Span::styled(format!("location:[{}] ", state.query.location_query), location_style),
        Span::styled(filters.join(" | "), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  {}", state.identity_label()),
            Style::default().fg(Color::Magenta),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" JobSeeker "));
    frame.render_widget(header, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    // Left panel: current page
    let items: Vec<ListItem> = results
        .page
        .iter()
        .map(|job| {
            let saved = if state.favorites.is_favorite(job.id) { "♥" } else { " " };
            let title = if job.title.chars().count() > 35 {
                format!("{}...", job.title.chars().take(32).collect::<String>())
            } else {
                job.title.clone()
            };
            ListItem::new(format!("{} #{:<4} {} | {} | {}", saved, job.id, title, job.company, job.posted))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Page {} of {} ",
            state.query.current_page, results.total_pages
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: job detail
    let detail = build_detail(state.current_job(), &state.favorites);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);

    // Pagination strip
    let mut strip: Vec<Span> = Vec::new();
    if results.total_pages > 1 {
        let dim = Style::default().fg(Color::DarkGray);
        strip.push(if results.has_previous(state.query.current_page) {
            Span::raw(" < prev ")
        } else {
            Span::styled(" < prev ", dim)
        });
        for page in page_window(state.query.current_page, results.total_pages) {
            if page == state.query.current_page {
                strip.push(Span::styled(
                    format!("[{}]", page),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                strip.push(Span::raw(format!(" {} ", page)));
            }
        }
        strip.push(if results.has_next(state.query.current_page) {
            Span::raw(" next > ")
        } else {
            Span::styled(" next > ", dim)
        });
    }
    if let Some(message) = &state.message {
        strip.push(Span::styled(format!("  {}", message), Style::default().fg(Color::Green)));
    }
    frame.render_widget(Paragraph::new(Line::from(strip)), rows[2]);

    // Footer help
    frame.render_widget(
        Paragraph::new(state.help_line()).style(Style::default().fg(Color::DarkGray)),
        rows[3],
    );
}

fn build_detail<'a>(job: Option<&'a JobListing>, favorites: &Favorites) -> Text<'a> {
    let Some(job) = job else {
        return Text::raw("No jobs found. Try adjusting your search or filters.");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &job.title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("{}  ★ {:.1}", job.company, job.rating)));

    let mut place = format!("{}, {}", job.location, job.country);
    if job.is_remote {
        place.push_str("  [Remote]");
    }
    lines.push(Line::from(place));
    lines.push(Line::from(Span::styled(
        format!("Posted {}", job.posted),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        format!("Salary: {}", job.salary),
        Style::default().fg(Color::Green),
    )));
    lines.push(Line::from(format!(
        "{} · {} · {}",
        job.job_type, job.schedule, job.experience_level
    )));
    lines.push(Line::from(""));

    for line in textwrap::fill(&job.description, 70).lines() {
        lines.push(Line::from(line.to_string()));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "Requirements",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for requirement in &job.requirements {
        lines.push(Line::from(format!("  • {}", requirement)));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(format!("Apply: {}", job.apply_link)));
    lines.push(Line::from(Span::styled(
        if favorites.is_favorite(job.id) { "Saved" } else { "Save Job (f)" },
        Style::default().fg(Color::Cyan),
    )));

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use crate::storage::{KeyValueStore, SqliteStore, AUTH_USER_KEY};

    #[test]
    fn test_cycle_walks_through_all_then_none() {
        let mut current = None;
        let mut seen = Vec::new();
        for _ in 0..5 {
            current = cycle(current, JobType::ALL);
            seen.push(current);
        }
        assert_eq!(
            seen,
            vec![
                Some(JobType::FullTime),
                Some(JobType::PartTime),
                Some(JobType::Contract),
                Some(JobType::Internship),
                None,
            ]
        );
    }

    #[test]
    fn test_page_controls_stop_at_boundaries() {
        let store = SqliteStore::open_in_memory().unwrap();
        let catalog = Catalog::from_seed(1);
        let mut state = AppState::new(&catalog, QueryState::default(), Favorites::load(&store));

        state.prev_page();
        assert_eq!(state.query.current_page, 1);
        for _ in 0..20 {
            state.next_page();
        }
        assert_eq!(state.query.current_page, 10);
    }

    #[test]
    fn test_narrowing_filter_pulls_page_back_into_range() {
        let store = SqliteStore::open_in_memory().unwrap();
        let catalog = Catalog::from_seed(1);
        let mut state = AppState::new(&catalog, QueryState::default(), Favorites::load(&store));
        state.go_to_page(8);
        state.selected = 9;

        state.query.job_type = Some(JobType::Contract);
        state.refresh();
        assert_eq!(state.query.current_page, 2);
        assert_eq!(state.selected, 9);

        state.query.search_query = "nothing matches this".to_string();
        state.refresh();
        assert_eq!(state.query.current_page, 1);
        assert_eq!(state.selected, 0);
        assert!(state.current_job().is_none());
    }

    #[test]
    fn test_toggle_favorite_on_selected_job() {
        let store = SqliteStore::open_in_memory().unwrap();
        let catalog = Catalog::from_seed(1);
        let mut state = AppState::new(
            &catalog,
            QueryState {
                sort: SortMode::Salary,
                ..Default::default()
            },
            Favorites::load(&store),
        );
        state.next();
        state.toggle_favorite();
        assert_eq!(state.favorites.ids(), &[2]);
        assert_eq!(state.message.as_deref(), Some("Saved #2"));
    }

    #[test]
    fn test_text_entry_edits_search() {
        let store = SqliteStore::open_in_memory().unwrap();
        let catalog = Catalog::from_seed(1);
        let mut state = AppState::new(&catalog, QueryState::default(), Favorites::load(&store));
        state.mode = InputMode::Search;
        for c in "intx".chars() {
            state.edit_text(KeyCode::Char(c));
        }
        state.edit_text(KeyCode::Backspace);
        state.edit_text(KeyCode::Enter);
        assert_eq!(state.query.search_query, "int");
        assert_eq!(state.mode, InputMode::Normal);
        assert_eq!(state.results().total_matched, 20);
    }

    #[test]
    fn test_clear_only_offered_with_active_filters() {
        let store = SqliteStore::open_in_memory().unwrap();
        let catalog = Catalog::from_seed(1);
        let mut state = AppState::new(
            &catalog,
            QueryState {
                sort: SortMode::Oldest,
                ..Default::default()
            },
            Favorites::load(&store),
        );
        assert!(!state.help_line().contains("c:clear"));
        state.clear_filters();
        assert_eq!(state.query.sort, SortMode::Oldest);
        assert!(state.message.is_none());

        state.query.remote_only = true;
        state.refresh();
        assert!(state.help_line().contains("c:clear"));
        state.clear_filters();
        assert!(!state.query.remote_only);
        assert_eq!(state.query.sort, SortMode::Newest);
        assert_eq!(state.message.as_deref(), Some("Filters cleared"));
        assert!(!state.help_line().contains("c:clear"));
    }

    #[test]
    fn test_header_follows_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = User {
            uid: "uid-7".to_string(),
            display_name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            signed_in_at: chrono::Utc::now(),
        };
        store.set(AUTH_USER_KEY, &serde_json::to_string(&user).unwrap()).unwrap();

        let catalog = Catalog::from_seed(1);
        let state = AppState::new(&catalog, QueryState::default(), Favorites::load(&store));
        let mut session = AuthSession::new(&store);
        let subscription = state.watch_identity(&mut session);
        assert_eq!(state.identity_label(), "Guest");

        session.start();
        assert_eq!(state.identity_label(), "Signed in as Grace Hopper");
        assert!(state.help_line().contains("L:logout"));

        session.logout();
        assert_eq!(state.identity_label(), "Guest");
        assert!(!state.help_line().contains("L:logout"));

        session.unsubscribe(subscription);
        session.stop();
    }
}

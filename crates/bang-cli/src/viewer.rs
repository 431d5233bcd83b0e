use std::io;
use std::time::Duration;

use anyhow::Result;
use bang_core::{HttpApiClient, IncidentEntry, IncidentFeed, SessionStore, Status};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Terminal;

pub(crate) struct ViewerState {
    incidents: Vec<IncidentEntry>,
    table: TableState,
    pub(crate) logged_in: bool,
    polling: bool,
    message: Option<String>,
}

impl ViewerState {
    pub(crate) fn new() -> Self {
        Self {
            incidents: Vec::new(),
            table: TableState::default(),
            logged_in: false,
            polling: false,
            message: None,
        }
    }

    /// Picks up a login or logout done from another terminal.
    pub(crate) fn sync_session(&mut self, session: &SessionStore) {
        self.logged_in = session.is_logged_in();
    }

    // Keeps the cursor on the same incident across re-sorts when it survives.
    fn update(&mut self, incidents: Vec<IncidentEntry>) {
        let selected_key = self.selected().map(|e| e.key.clone());
        self.incidents = incidents;

        let idx = selected_key
            .and_then(|key| self.incidents.iter().position(|e| e.key == key))
            .or(if self.incidents.is_empty() { None } else { Some(0) });
        self.table.select(idx);
    }

    fn selected(&self) -> Option<&IncidentEntry> {
        self.table.selected().and_then(|idx| self.incidents.get(idx))
    }

    fn move_selection(&mut self, delta: isize) {
        if self.incidents.is_empty() {
            return;
        }
        let last = self.incidents.len() as isize - 1;
        let current = self.table.selected().unwrap_or(0) as isize;
        self.table.select(Some((current + delta).clamp(0, last) as usize));
    }
}

pub async fn run_viewer(feed: &mut IncidentFeed<HttpApiClient>, session: &SessionStore) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = ViewerState::new();
    let mut updates = feed.subscribe();

    let run_result = async {
        feed.start().await;
        state.polling = feed.is_polling();

        loop {
            if updates.has_changed().unwrap_or(false) {
                let incidents = updates.borrow_and_update().clone();
                state.update(incidents);
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
                        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
                        KeyCode::Char('p') => {
                            if feed.is_polling() {
                                feed.stop();
                                state.message = Some("polling paused".to_string());
                            } else {
                                feed.start().await;
                                state.message = Some("polling resumed".to_string());
                            }
                            state.polling = feed.is_polling();
                        }
                        KeyCode::Char('r') => {
                            if let Some(key) = state.selected().map(|e| e.key.clone()) {
                                state.message = Some(match feed.resolve(&key).await {
                                    Ok(()) => format!("resolved {key}"),
                                    Err(err) if err.is_auth_failure() => {
                                        "not authorized; run `bangctl login` first".to_string()
                                    }
                                    Err(err) => format!("resolve failed: {err}"),
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }

            // The feed runs on its own schedule; yield so in-flight polls land.
            tokio::task::yield_now().await;
            state.sync_session(session);
            terminal.draw(|frame| draw_ui(frame.size(), frame, &mut state))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    feed.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn draw_ui(area: Rect, frame: &mut ratatui::Frame<'_>, state: &mut ViewerState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    frame.render_widget(render_header(state), rows[0]);
    render_incidents(frame, rows[1], state);
}

fn render_header(state: &ViewerState) -> Paragraph<'static> {
    let count = |status: Status| {
        state
            .incidents
            .iter()
            .filter(|e| e.incident.status == status)
            .count()
    };

    let summary = format!(
        "critical={} warning={} total={} polling={} session={}",
        count(Status::Critical),
        count(Status::Warning),
        state.incidents.len(),
        state.polling,
        if state.logged_in { "logged in" } else { "anonymous" },
    );

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "Bangarang Incidents  ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(summary),
        ]),
        Line::from(
            state
                .message
                .clone()
                .unwrap_or_else(|| "j/k move  r resolve  p pause/resume  q quit".to_string()),
        ),
    ];

    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"))
}

fn render_incidents(frame: &mut ratatui::Frame<'_>, area: Rect, state: &mut ViewerState) {
    let rows: Vec<Row> = state
        .incidents
        .iter()
        .map(|entry| {
            let color = status_color(entry.incident.status);
            Row::new(vec![
                Cell::from(entry.incident.status.label()).style(Style::default().fg(color)),
                Cell::from(entry.incident.describe()),
                Cell::from(entry.key.clone()).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Min(40),
            Constraint::Length(34),
        ],
    )
    .header(
        Row::new(vec!["STATUS", "DESCRIPTION", "KEY"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Active"))
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(table, area, &mut state.table);
}

fn status_color(status: Status) -> Color {
    parse_hex(status.color()).unwrap_or(Color::Green)
}

fn parse_hex(raw: &str) -> Option<Color> {
    let hex = raw.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

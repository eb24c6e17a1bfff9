mod app;

use std::io;
use std::time::Duration;

use app::{
    clamp_selection, format_latency_us, format_score, format_supply, format_time_secs, format_velocity, short_tier,
    truncate, AppState, ConnectionStatus, KeywordDetail,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);
    let mut table_state = TableState::default();

    // Initial fetch before rendering
    app.refresh(&client).await;
    if !app.reports.is_empty() {
        table_state.select(Some(0));
    }
    sync_detail(&mut app, &client, &mut table_state).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            sync_detail(app, client, table_state).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.reports.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                            sync_detail(app, client, table_state).await;
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                            sync_detail(app, client, table_state).await;
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            sync_detail(app, client, table_state).await;
            last_tick = std::time::Instant::now();
        }
    }
}

/// Keep the selection in range and the detail pane on the selected keyword.
async fn sync_detail(app: &mut AppState, client: &reqwest::Client, table_state: &mut TableState) {
    let selected = clamp_selection(app.reports.len(), table_state.selected());
    table_state.select(selected);
    let Some(keyword) = app.selected_row(selected).map(|r| r.keyword.clone()) else {
        app.detail = KeywordDetail::default();
        return;
    };
    app.fetch_detail(client, &keyword).await;
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, table_state, chunks[1]);
    render_footer(f, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected if app.health.run_in_progress => {
            ("● analysing".to_string(), Color::Yellow)
        }
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let last_run = app.runs.last_run.as_ref().map_or("no runs yet".to_string(), |r| {
        format!("last run {} ({})", format_time_secs(r.finished_at), r.strategy)
    });

    let title_spans = vec![
        Span::styled(
            " Trend Arbitrage  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(last_run, Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} runs", app.runs.total_runs),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} keywords", app.health.keywords_in_store),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "p95 demand {} / supply {}",
                format_latency_us(app.latency.demand.p95_us),
                format_latency_us(app.latency.supply.p95_us),
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    // Horizontal split: ranking (45%) | detail (55%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_ranking_table(f, app, table_state, halves[0]);

    let detail = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(halves[1]);

    render_periods_table(f, app, detail[0]);
    render_verdict(f, app, table_state.selected(), detail[1]);
}

fn score_color(score: f64) -> Color {
    if score >= 70.0 {
        Color::Green
    } else if score >= 50.0 {
        Color::LightGreen
    } else if score >= 30.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn header_row(cols: &[&'static str]) -> Row<'static> {
    let cells = cols
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    Row::new(cells).height(1)
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_ranking_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let rows: Vec<Row> = app
        .reports
        .iter()
        .map(|r| {
            let rising = if r.is_rising { "▲" } else { "▼" };
            let rising_color = if r.is_rising { Color::Green } else { Color::Red };
            Row::new(vec![
                Cell::from(r.rank.to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&r.keyword, 24)),
                Cell::from(format_score(r.opportunity_score))
                    .style(Style::default().fg(score_color(r.opportunity_score))),
                Cell::from(format_supply(r.total_supply)).style(Style::default().fg(Color::Cyan)),
                Cell::from(rising).style(Style::default().fg(rising_color)),
                Cell::from(short_tier(&r.verdict_tier)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(2),
            Constraint::Length(5),
        ],
    )
    .header(header_row(&["#", "Keyword", "Score", "Supply", "", "Tier"]))
    .block(titled_block(" TOP OPPORTUNITIES "))
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_periods_table(f: &mut Frame, app: &AppState, area: Rect) {
    let rows: Vec<Row> = app
        .detail
        .periods
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.period.clone()),
                Cell::from(format_score(p.opportunity_score))
                    .style(Style::default().fg(score_color(p.opportunity_score))),
                Cell::from(format!("{:.1}", p.avg_interest)),
                Cell::from(format_velocity(p.trend_velocity)),
                Cell::from(format!("{:.2}x", p.momentum_multiplier)),
                Cell::from(short_tier(&p.verdict_tier)),
            ])
        })
        .collect();

    let title = app
        .detail
        .keyword
        .as_deref()
        .map_or(" PERIODS ".to_string(), |k| format!(" PERIODS: {} ", truncate(k, 30)));

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(5),
        ],
    )
    .header(header_row(&["Period", "Score", "Interest", "Velocity", "Moment", "Tier"]))
    .block(titled_block(&title));

    f.render_widget(table, area);
}

fn render_verdict(f: &mut Frame, app: &AppState, selected: Option<usize>, area: Rect) {
    let lines = match app.selected_row(selected) {
        Some(r) => vec![
            Line::from(Span::styled(
                r.verdict.clone(),
                Style::default().fg(Color::White),
            )),
            Line::raw(""),
            Line::from(Span::styled(
                format!(
                    "demand {:.0} │ pressure {:.2} │ ratio {:.2} │ penalty -{:.0} │ {}",
                    r.demand_signal,
                    r.supply_pressure,
                    r.base_ratio,
                    r.saturation_penalty,
                    r.competition_level.as_deref().unwrap_or("—"),
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "No ranked keywords yet.",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(titled_block(" VERDICT "));
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("select keyword  "),
        Span::styled("auto-refresh: 2s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

use crate::api::TodoSource;
use crate::app::{ActiveInput, App, InputMode, Toast};
use crate::models::{Todo, TodoStatus};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn key_hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Red)),
        Span::raw(action),
    ]
}

fn get_legend(input_mode: &InputMode) -> Text<'static> {
    let hints: Vec<[Span<'static>; 2]> = match input_mode {
        InputMode::Normal => vec![
            key_hint(" q ", ": Quit "),
            key_hint(" j/k ", ": Down/Up "),
            key_hint(" n/p ", ": Next/Previous Page "),
            key_hint(" u ", ": User Filter "),
            key_hint(" s ", ": Status Filter "),
            key_hint(" c ", ": Clear Filters "),
            key_hint(" Enter ", ": View Details "),
            key_hint(" a ", ": Add "),
            key_hint(" e ", ": Edit "),
            key_hint(" d ", ": Delete "),
            key_hint(" r ", ": Reload "),
        ],
        InputMode::Editing => vec![
            key_hint(" i ", ": Insert "),
            key_hint(" Tab ", ": Switch Field "),
            key_hint(" Space ", ": Toggle Status "),
            key_hint(" Enter ", ": Submit "),
            key_hint(" Esc ", ": Cancel "),
        ],
        InputMode::Insert => vec![key_hint(" Esc ", ": Stop Typing ")],
        InputMode::ConfirmDelete => vec![
            key_hint(" y ", ": Delete "),
            key_hint(" n ", ": Cancel "),
        ],
    };
    Text::from(Line::from(hints.into_iter().flatten().collect::<Vec<_>>()))
}

fn status_label(todo: &Todo) -> Span<'static> {
    if todo.completed {
        Span::styled("Completed", Style::default().fg(Color::Green))
    } else {
        Span::styled("Pending", Style::default().fg(Color::Yellow))
    }
}

fn filter_pills<S: TodoSource + 'static>(app: &App<S>) -> Line<'static> {
    let state = app.filter_state();
    let pill = Style::default().bg(Color::Blue).fg(Color::White);
    let mut spans = vec![Span::styled(
        "Filters: ",
        Style::default().add_modifier(Modifier::BOLD),
    )];

    if !state.is_active() {
        spans.push(Span::raw("none"));
        return Line::from(spans);
    }
    if let Some(user_id) = state.selected_user_id {
        let name = app
            .user_name(user_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("User {}", user_id));
        spans.push(Span::styled(format!(" User: {} ", name), pill));
        spans.push(Span::raw(" "));
    }
    if state.selected_status != TodoStatus::All {
        spans.push(Span::styled(
            format!(" Status: {} ", app.status_label(state.selected_status)),
            pill,
        ));
    }
    Line::from(spans)
}

fn draw_tasks<S: TodoSource + 'static>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(area);

    f.render_widget(Paragraph::new(filter_pills(app)), chunks[0]);

    let block = Block::default().borders(Borders::ALL).title("Tasks");

    if let Some(error) = &app.load_error {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )))
        .block(block);
        f.render_widget(paragraph, chunks[1]);
        return;
    }

    let Some(page) = app.current_page() else {
        f.render_widget(Paragraph::new("Loading tasks...").block(block), chunks[1]);
        return;
    };

    if page.todos.is_empty() {
        f.render_widget(
            Paragraph::new("No tasks found")
                .alignment(Alignment::Center)
                .block(block),
            chunks[1],
        );
    } else {
        let rows: Vec<Row> = page
            .todos
            .iter()
            .map(|todo| {
                let user = app
                    .user_name(todo.user_id)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("User {}", todo.user_id));
                let style = if app.deleting == Some(todo.id) {
                    Style::default().add_modifier(Modifier::DIM)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(todo.id.to_string()),
                    Cell::from(todo.title.clone()),
                    Cell::from(status_label(todo)),
                    Cell::from(user),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Min(20),
                Constraint::Length(11),
                Constraint::Length(20),
            ],
        )
        .header(
            Row::new(vec!["Task ID", "Title", "Status", "Assigned User"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[1], &mut app.state);
    }

    if page.total > 0 {
        let start = (page.page - 1) * page.page_size + 1;
        let end = (start + page.todos.len()).saturating_sub(1).min(page.total);
        let plural = if page.total == 1 { "" } else { "s" };
        let footer = format!(
            "Showing {} to {} of {} task{}    Page {} of {}",
            start, end, page.total, plural, page.page, page.total_pages
        );
        f.render_widget(Paragraph::new(footer), chunks[2]);
    }
}

fn draw_detail<S: TodoSource + 'static>(f: &mut Frame, app: &App<S>, area: Rect) {
    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");

    let Some(detail) = app.detail() else {
        let paragraph = Paragraph::new("Press Enter to view task details")
            .block(detail_block)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let user = app
        .user_name(detail.user_id)
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown user".to_string());

    let lines = vec![
        Line::from(vec![Span::styled("ID: ", bold), Span::raw(detail.id.to_string())]),
        Line::from(vec![Span::styled("Title: ", bold), Span::raw(detail.title.clone())]),
        Line::from(vec![Span::styled("Status: ", bold), status_label(&detail)]),
        Line::from(vec![Span::styled("Assigned User: ", bold), Span::raw(user)]),
    ];

    let paragraph = Paragraph::new(lines)
        .block(detail_block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_form<S: TodoSource + 'static>(f: &mut Frame, app: &App<S>, area: Rect) {
    let popup_area = centered_rect_absolute(area.width * 60 / 100, 9, area);
    let form = &app.form;

    let title = match (form.is_edit(), app.is_busy()) {
        (true, true) => "Updating...",
        (false, true) => "Creating...",
        (true, false) => "Edit Task",
        (false, false) => "Create Task",
    };

    let field_style = |field: ActiveInput| {
        if app.active_input == field {
            match app.input_mode {
                InputMode::Insert => Style::default().fg(Color::Yellow),
                _ => Style::default().fg(Color::Green),
            }
        } else {
            Style::default().fg(Color::White)
        }
    };

    let user_hint = form
        .user_id
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|id| app.user_name(id))
        .map(|name| format!(" ({})", name))
        .unwrap_or_default();

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Title: ", field_style(ActiveInput::Title)),
            Span::raw(form.title.clone()),
        ]),
        Line::from(Span::styled(
            "  must be at least 3 characters long",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(vec![
            Span::styled("Assigned User ID: ", field_style(ActiveInput::User)),
            Span::raw(form.user_id.clone()),
            Span::styled(user_hint, Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::raw("Status: "),
            Span::raw(if form.completed { "Completed" } else { "Pending" }),
        ]),
    ];

    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else if !form.is_valid() {
        lines.push(Line::from(Span::styled(
            "Fill in a title and a user to submit",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let popup = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Green)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn draw_confirm_delete(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect_absolute(area.width * 50 / 100, 5, area);
    let popup = Paragraph::new(vec![
        Line::from("Are you sure you want to delete this task?"),
        Line::from("This action cannot be undone."),
    ])
    .block(
        Block::default()
            .title("Delete Task")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });

    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn draw<S: TodoSource + 'static>(f: &mut Frame, app: &mut App<S>) {
    let size = f.area();

    // body, toast line, legend
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(2)].as_ref())
        .split(size);

    let body_chunk = chunks[0];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(body_chunk);

    draw_tasks(f, app, columns[0]);
    draw_detail(f, app, columns[1]);

    match app.input_mode {
        InputMode::Editing | InputMode::Insert => draw_form(f, app, body_chunk),
        InputMode::ConfirmDelete => draw_confirm_delete(f, body_chunk),
        InputMode::Normal => {}
    }

    let toast = match &app.toast {
        Some(Toast::Success(message)) => {
            Span::styled(message.clone(), Style::default().fg(Color::Green))
        }
        Some(Toast::Error(message)) => Span::styled(message.clone(), Style::default().fg(Color::Red)),
        None => Span::raw(""),
    };
    f.render_widget(Paragraph::new(Line::from(toast)), chunks[1]);

    let legend = Paragraph::new(get_legend(&app.input_mode))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(legend, chunks[2]);
}

pub async fn run_app<B: Backend, S: TodoSource + 'static>(
    terminal: &mut Terminal<B>,
    mut app: App<S>,
) -> io::Result<()> {
    app.load().await;

    loop {
        app.drain_outcomes();
        app.reload_if_stale().await;
        terminal.draw(|f| draw(f, &mut app))?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_input(key).await {
                    return Ok(());
                }
            }
        }
    }
}

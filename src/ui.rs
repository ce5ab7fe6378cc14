use crate::app::{App, Screen};
use crate::input::TextField;
use crate::login::{AuthField, AuthMode, LoginScreen};
use crate::status::RequestStatus;
use crate::task_board::{BoardFocus, TaskBoard};
use crate::task_details::{EditField, TaskDetails};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

pub fn draw(frame: &mut Frame, app: &App) {
    let screen = app.screen();
    let body = if screen.has_header() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(frame.area());
        draw_header(frame, chunks[0]);
        chunks[1]
    } else {
        frame.area()
    };

    match screen {
        Screen::Login(login) => draw_login(frame, body, login),
        Screen::Tasks(board) => draw_board(frame, body, board, app.tick()),
        Screen::Details(details) => draw_details(frame, body, details, app.tick()),
        Screen::NotFound => draw_not_found(frame, body),
    }
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " Task Tracker ",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled("Ctrl+H", Style::default().fg(Color::Yellow)),
        Span::raw(" Home   "),
        Span::styled("Ctrl+L", Style::default().fg(Color::Yellow)),
        Span::raw(" Logout   "),
        Span::styled("Ctrl+Q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn field_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn field_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<13}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, field_style(focused)),
    ])
}

fn secret(field: &TextField, show: bool) -> String {
    if show {
        field.value().to_string()
    } else {
        field.masked()
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_login(frame: &mut Frame, area: Rect, login: &LoginScreen) {
    let area = centered(area, 64, 14);
    let mut lines = Vec::new();

    let (title, color) = match login.mode {
        AuthMode::Login => {
            lines.push(field_line(
                "Email",
                login.email.value().to_string(),
                login.focus == AuthField::Email,
            ));
            lines.push(field_line(
                "Password",
                secret(&login.password, login.show_password),
                login.focus == AuthField::Password,
            ));
            lines.push(Line::from(format!(
                "[{}] Show Password",
                if login.show_password { "x" } else { " " }
            )));
            lines.push(Line::from(""));
            if let Some(error) = &login.error_message {
                lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
            }
            lines.push(Line::styled(
                "Enter: Login   Tab: next field   Ctrl+P: show password",
                Style::default().fg(Color::DarkGray),
            ));
            lines.push(Line::styled(
                "Don't have an account? Ctrl+S: Sign Up   Esc: quit",
                Style::default().fg(Color::DarkGray),
            ));
            (" Login ", Color::Cyan)
        }
        AuthMode::Signup => {
            let form = &login.signup;
            if let Some(success) = &form.success_message {
                lines.push(Line::styled(success.clone(), Style::default().fg(Color::Green)));
            }
            lines.push(field_line(
                "Name",
                form.name.value().to_string(),
                login.focus == AuthField::Name,
            ));
            lines.push(field_line(
                "Email",
                form.email.value().to_string(),
                login.focus == AuthField::Email,
            ));
            lines.push(field_line(
                "Password",
                secret(&form.password, form.show_password),
                login.focus == AuthField::Password,
            ));
            lines.push(Line::from(format!(
                "[{}] Show Password",
                if form.show_password { "x" } else { " " }
            )));
            lines.push(Line::from(""));
            if let Some(error) = &form.error_message {
                lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
            }
            lines.push(Line::styled(
                "Enter: Create User   Tab: next field   Ctrl+P: show password",
                Style::default().fg(Color::DarkGray),
            ));
            lines.push(Line::styled(
                "Esc / Ctrl+S: Back To Login",
                Style::default().fg(Color::DarkGray),
            ));
            (" Sign Up ", Color::Green)
        }
    };

    let form = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color)),
    );
    frame.render_widget(form, area);
}

fn draw_loading(frame: &mut Frame, area: Rect, tick: u64) {
    let spinner = SPINNER[(tick as usize) % SPINNER.len()];
    let loading = Paragraph::new(format!("{} Loading...", spinner))
        .style(Style::default().fg(Color::Green))
        .alignment(Alignment::Center);
    frame.render_widget(loading, area);
}

fn draw_failure(frame: &mut Frame, area: Rect) {
    let failure = Paragraph::new(vec![
        Line::styled(
            "Something went wrong! Please try again.",
            Style::default().fg(Color::Red),
        ),
        Line::from(""),
        Line::styled("Ctrl+R: Retry", Style::default().fg(Color::Yellow)),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(failure, area);
}

fn draw_board(frame: &mut Frame, area: Rect, board: &TaskBoard, tick: u64) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(area);

    let form = &board.form;
    let mut lines = vec![
        field_line(
            "Title",
            form.title.value().to_string(),
            board.focus == BoardFocus::Title,
        ),
        field_line(
            "Description",
            form.description.value().to_string(),
            board.focus == BoardFocus::Description,
        ),
        field_line(
            "Status",
            format!("< {} >", form.status),
            board.focus == BoardFocus::Status,
        ),
        field_line(
            "Due Date",
            form.due_date.value().to_string(),
            board.focus == BoardFocus::DueDate,
        ),
    ];
    if let Some(notice) = &form.notice {
        lines.push(Line::styled(notice.clone(), Style::default().fg(Color::Red)));
    }
    lines.push(Line::styled(
        "Enter: Add Task   Tab: next field   Left/Right: change status",
        Style::default().fg(Color::DarkGray),
    ));
    let form_widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Add a task ")
            .borders(Borders::ALL)
            .border_style(if board.focus == BoardFocus::Table {
                Style::default()
            } else {
                Style::default().fg(Color::Cyan)
            }),
    );
    frame.render_widget(form_widget, chunks[0]);

    let list_block = Block::default()
        .title(" Task List ")
        .borders(Borders::ALL)
        .border_style(if board.focus == BoardFocus::Table {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        });
    let inner = list_block.inner(chunks[1]);
    frame.render_widget(list_block, chunks[1]);

    match board.status {
        RequestStatus::Initial => {}
        RequestStatus::InProgress => draw_loading(frame, inner, tick),
        RequestStatus::Failure => draw_failure(frame, inner),
        RequestStatus::NoTasks => {
            let empty = Paragraph::new("No tasks available. Create a new task to get started!")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            frame.render_widget(empty, inner);
        }
        RequestStatus::Success => draw_task_table(frame, inner, board),
    }
}

fn draw_task_table(frame: &mut Frame, area: Rect, board: &TaskBoard) {
    let header = Row::new(vec![
        "Title",
        "Description",
        "Status",
        "Due Date",
        "Created At",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = board
        .tasks
        .iter()
        .map(|t| {
            Row::new(vec![
                t.title.clone(),
                t.description.clone(),
                t.status.to_string(),
                t.due_date.to_string(),
                t.created_at.clone(),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Percentage(13),
            Constraint::Percentage(12),
            Constraint::Percentage(20),
        ],
    )
    .header(header)
    .row_highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");

    let mut state = TableState::default();
    if board.focus == BoardFocus::Table {
        state.select(Some(board.selected_task));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_details(frame: &mut Frame, area: Rect, details: &TaskDetails, tick: u64) {
    if let Some(error) = &details.error {
        let message = Paragraph::new(vec![
            Line::styled(error.message(), Style::default().fg(Color::Red)),
            Line::from(""),
            Line::styled("Ctrl+R: Reload", Style::default().fg(Color::Yellow)),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(message, area);
        return;
    }

    let task = match (details.status, &details.task) {
        (RequestStatus::InProgress, _) => return draw_loading(frame, area, tick),
        (RequestStatus::Failure, _) => return draw_failure(frame, area),
        (_, Some(task)) => task,
        (_, None) => return,
    };

    let mut lines = vec![field_line("ID", task.id.to_string(), false)];
    match &details.draft {
        Some(draft) => {
            lines.push(field_line(
                "Title",
                draft.title.value().to_string(),
                draft.focus == EditField::Title,
            ));
            lines.push(field_line(
                "Description",
                draft.description.value().to_string(),
                draft.focus == EditField::Description,
            ));
            lines.push(field_line(
                "Status",
                format!("< {} >", draft.status),
                draft.focus == EditField::Status,
            ));
            lines.push(field_line(
                "Due Date",
                draft.due_date.value().to_string(),
                draft.focus == EditField::DueDate,
            ));
        }
        None => {
            lines.push(field_line("Title", task.title.clone(), false));
            lines.push(field_line("Description", task.description.clone(), false));
            lines.push(field_line("Status", task.status.to_string(), false));
            lines.push(field_line("Due Date", task.due_date.to_string(), false));
        }
    }
    lines.push(field_line("Created At", task.created_at.clone(), false));
    lines.push(Line::from(""));
    if let Some(notice) = &details.notice {
        lines.push(Line::styled(notice.clone(), Style::default().fg(Color::Red)));
    }
    lines.push(Line::styled(
        if details.is_editing() {
            "Ctrl+S: Save   Ctrl+K: Mark as complete   Ctrl+D: Delete   Esc: cancel"
        } else {
            "e: Edit   c: Mark as complete   d: Delete"
        },
        Style::default().fg(Color::DarkGray),
    ));

    let panel = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Task Details ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    frame.render_widget(panel, area);
}

fn draw_not_found(frame: &mut Frame, area: Rect) {
    let not_found = Paragraph::new(vec![
        Line::styled(
            "Page Not Found",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
        Line::styled(
            "Ctrl+H takes you back to your tasks",
            Style::default().fg(Color::DarkGray),
        ),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(not_found, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TaskApi;
    use crate::session::Session;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn login_screen_masks_password() {
        let mut app = App::new(TaskApi::new("http://127.0.0.1:9"), Session::in_memory());
        app.visit("/login");
        if let Screen::Login(login) = app.screen_mut() {
            login.password = TextField::with_value("hunter22");
        }
        let out = render(&app);
        assert!(out.contains("Login"));
        assert!(out.contains("********"));
        assert!(!out.contains("hunter22"));
    }

    #[tokio::test]
    async fn not_found_has_header() {
        let mut app = App::new(TaskApi::new("http://127.0.0.1:9"), Session::in_memory());
        app.visit("/nowhere");
        let out = render(&app);
        assert!(out.contains("Page Not Found"));
        assert!(out.contains("Logout"));
    }
}

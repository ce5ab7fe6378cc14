use crate::app::{Command, Effect};
use crate::error::ApiError;
use crate::input::{cycle, focus_step, is_ctrl, TextField};
use crate::route::Route;
use crate::status::RequestStatus;
use crate::task::{parse_due_date, NewTask, Task, TaskStatus};
use crossterm::event::{KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardFocus {
    Title,
    Description,
    Status,
    DueDate,
    Table,
}

const FOCUS_ORDER: [BoardFocus; 5] = [
    BoardFocus::Title,
    BoardFocus::Description,
    BoardFocus::Status,
    BoardFocus::DueDate,
    BoardFocus::Table,
];

/// The "Add a task" form.
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    pub title: TextField,
    pub description: TextField,
    pub status: TaskStatus,
    pub due_date: TextField,
    /// Why the last submit was refused, if it was.
    pub notice: Option<String>,
}

impl TaskForm {
    fn build(&self) -> Result<NewTask, &'static str> {
        if self.title.is_blank() || self.description.is_blank() || self.due_date.is_blank() {
            return Err("Please fill out this field.");
        }
        let due_date =
            parse_due_date(self.due_date.value()).ok_or("Please enter a valid date (YYYY-MM-DD).")?;
        Ok(NewTask::new(
            self.title.value().to_string(),
            self.description.value().to_string(),
            self.status,
            due_date,
        ))
    }

    fn reset(&mut self) {
        *self = TaskForm::default();
    }
}

/// The `/` screen: the user's tasks plus the create form.
#[derive(Debug, Clone)]
pub struct TaskBoard {
    pub status: RequestStatus,
    pub tasks: Vec<Task>,
    pub form: TaskForm,
    pub focus: BoardFocus,
    pub selected_task: usize,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self {
            status: RequestStatus::Initial,
            tasks: Vec::new(),
            form: TaskForm::default(),
            focus: BoardFocus::Title,
            selected_task: 0,
        }
    }
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self) -> Effect {
        self.status.begin();
        Effect::Run(Command::FetchTasks)
    }

    pub fn apply_loaded(&mut self, result: Result<Vec<Task>, ApiError>) {
        match result {
            Ok(tasks) => {
                tracing::info!(count = tasks.len(), "tasks loaded");
                self.status.succeed_with(tasks.len());
                self.tasks = tasks;
                self.selected_task = 0;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load tasks");
                self.status.fail();
            }
        }
    }

    /// Builds a create command from the form. Held back until the initial fetch
    /// settles, since that result replaces the whole list.
    pub fn submit(&mut self) -> Effect {
        if self.status.is_loading() {
            tracing::debug!("create held back while tasks load");
            return Effect::None;
        }
        self.form.notice = None;
        match self.form.build() {
            Ok(new) => Effect::Run(Command::CreateTask(new)),
            Err(notice) => {
                self.form.notice = Some(notice.to_string());
                Effect::None
            }
        }
    }

    /// Adds the created task without re-fetching. The server's copy wins when it sent one.
    pub fn apply_created(&mut self, local: Task, result: Result<Option<Task>, ApiError>) {
        match result {
            Ok(echoed) => {
                let task = echoed.unwrap_or(local);
                tracing::info!(id = %task.id, "task created");
                self.tasks.push(task);
                self.form.reset();
                self.status.succeed();
            }
            Err(err) => tracing::error!(error = %err, "Error adding task"),
        }
    }

    pub fn selected(&self) -> Option<&Task> {
        self.tasks.get(self.selected_task)
    }

    pub fn shows_table(&self) -> bool {
        self.status == RequestStatus::Success
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if is_ctrl(&key, 'r') && self.status == RequestStatus::Failure {
            return Effect::Reload;
        }
        if self.focus == BoardFocus::Table {
            return self.handle_table_key(key);
        }
        if let KeyCode::Tab | KeyCode::BackTab = key.code {
            self.focus = cycle(&FOCUS_ORDER, self.focus, key.code == KeyCode::Tab);
            return Effect::None;
        }
        match (self.focus, key.code) {
            (_, KeyCode::Enter) => self.submit(),
            (BoardFocus::Status, KeyCode::Right | KeyCode::Char(' ')) => {
                self.form.status = self.form.status.next();
                Effect::None
            }
            (BoardFocus::Status, KeyCode::Left) => {
                self.form.status = self.form.status.prev();
                Effect::None
            }
            (focus, _) => {
                if let Some(field) = self.field_mut(focus) {
                    field.handle_key(key);
                }
                Effect::None
            }
        }
    }

    fn handle_table_key(&mut self, key: KeyEvent) -> Effect {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = cycle(&FOCUS_ORDER, self.focus, key.code == KeyCode::Tab);
            }
            KeyCode::Up => {
                if self.selected_task > 0 {
                    self.selected_task -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_task + 1 < self.tasks.len() {
                    self.selected_task += 1;
                }
            }
            KeyCode::Enter if self.shows_table() => {
                if let Some(task) = self.selected() {
                    return Effect::Navigate(Route::TaskDetails(task.id.to_string()));
                }
            }
            _ => {
                if let Some(forward) = focus_step(&key) {
                    self.focus = cycle(&FOCUS_ORDER, self.focus, forward);
                }
            }
        }
        Effect::None
    }

    fn field_mut(&mut self, focus: BoardFocus) -> Option<&mut TextField> {
        match focus {
            BoardFocus::Title => Some(&mut self.form.title),
            BoardFocus::Description => Some(&mut self.form.description),
            BoardFocus::DueDate => Some(&mut self.form.due_date),
            BoardFocus::Status | BoardFocus::Table => None,
        }
    }
}

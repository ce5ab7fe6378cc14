use crate::app::{Command, Effect};
use crate::error::ApiError;
use crate::input::{cycle, is_ctrl, TextField};
use crate::route::Route;
use crate::status::RequestStatus;
use crate::task::{parse_due_date, Task, TaskStatus};
use crossterm::event::{KeyCode, KeyEvent};

pub const UPDATE_FAILED: &str = "Failed to update task.";
pub const DELETE_FAILED: &str = "Failed to delete task.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailError {
    /// No session token, so nothing was requested.
    MissingSession,
    /// A save or delete was rejected or never reached the server.
    RequestFailed(&'static str),
}

impl DetailError {
    pub fn message(&self) -> &'static str {
        match self {
            DetailError::MissingSession => "Unauthorized: No JWT Token found.",
            DetailError::RequestFailed(message) => *message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Description,
    Status,
    DueDate,
}

const EDIT_ORDER: [EditField; 4] = [
    EditField::Title,
    EditField::Description,
    EditField::Status,
    EditField::DueDate,
];

/// Editable copy of the mutable task fields.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: TextField,
    pub description: TextField,
    pub status: TaskStatus,
    pub due_date: TextField,
    pub focus: EditField,
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: TextField::with_value(task.title.clone()),
            description: TextField::with_value(task.description.clone()),
            status: task.status,
            due_date: TextField::with_value(task.due_date.format("%Y-%m-%d").to_string()),
            focus: EditField::Title,
        }
    }

    /// `base` with the draft's fields applied. `None` if the date does not parse.
    pub fn apply_to(&self, base: &Task) -> Option<Task> {
        Some(Task {
            title: self.title.value().to_string(),
            description: self.description.value().to_string(),
            status: self.status,
            due_date: parse_due_date(self.due_date.value())?,
            ..base.clone()
        })
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match (self.focus, key.code) {
            (_, KeyCode::Tab) => self.focus = cycle(&EDIT_ORDER, self.focus, true),
            (_, KeyCode::BackTab) => self.focus = cycle(&EDIT_ORDER, self.focus, false),
            (EditField::Status, KeyCode::Right | KeyCode::Char(' ')) => {
                self.status = self.status.next()
            }
            (EditField::Status, KeyCode::Left) => self.status = self.status.prev(),
            (EditField::Title, _) => {
                self.title.handle_key(key);
            }
            (EditField::Description, _) => {
                self.description.handle_key(key);
            }
            (EditField::DueDate, _) => {
                self.due_date.handle_key(key);
            }
            (EditField::Status, _) => {}
        }
    }
}

/// The `/tasks/:id` screen.
#[derive(Debug, Clone)]
pub struct TaskDetails {
    pub id: String,
    pub status: RequestStatus,
    pub task: Option<Task>,
    pub draft: Option<TaskDraft>,
    pub error: Option<DetailError>,
    pub notice: Option<String>,
    /// A save is in flight; further saves wait for it.
    pub saving: bool,
}

impl TaskDetails {
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: RequestStatus::Initial,
            task: None,
            draft: None,
            error: None,
            notice: None,
            saving: false,
        }
    }

    pub fn mount(&mut self) -> Effect {
        self.status.begin();
        Effect::Run(Command::FetchTask(self.id.clone()))
    }

    pub fn apply_loaded(&mut self, result: Result<Task, ApiError>) {
        match result {
            Ok(task) => {
                self.task = Some(task);
                self.status.succeed();
            }
            Err(ApiError::MissingSession) => {
                self.error = Some(DetailError::MissingSession);
            }
            Err(err) => {
                tracing::error!(id = %self.id, error = %err, "failed to fetch task details");
                self.status.fail();
            }
        }
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn start_edit(&mut self) {
        if let Some(task) = &self.task {
            self.draft = Some(TaskDraft::from_task(task));
        }
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
        self.notice = None;
    }

    /// Sends the edit copy as a full-record update.
    pub fn save(&mut self) -> Effect {
        let (Some(task), Some(draft)) = (&self.task, &self.draft) else {
            return Effect::None;
        };
        match draft.apply_to(task) {
            Some(edited) => self.send(edited),
            None => {
                self.notice = Some("Please enter a valid date (YYYY-MM-DD).".to_string());
                Effect::None
            }
        }
    }

    /// Marks the task completed through the save path. Pending edits go along.
    pub fn mark_complete(&mut self) -> Effect {
        let Some(task) = &self.task else {
            return Effect::None;
        };
        let base = match &self.draft {
            Some(draft) => match draft.apply_to(task) {
                Some(edited) => edited,
                None => {
                    self.notice = Some("Please enter a valid date (YYYY-MM-DD).".to_string());
                    return Effect::None;
                }
            },
            None => task.clone(),
        };
        self.send(Task {
            status: TaskStatus::Completed,
            ..base
        })
    }

    fn send(&mut self, task: Task) -> Effect {
        if self.saving {
            tracing::debug!(id = %self.id, "save already in flight");
            return Effect::None;
        }
        self.saving = true;
        self.notice = None;
        Effect::Run(Command::UpdateTask {
            id: self.id.clone(),
            task,
        })
    }

    pub fn apply_saved(&mut self, sent: Task, result: Result<Option<Task>, ApiError>) {
        self.saving = false;
        match result {
            Ok(echoed) => {
                tracing::info!(id = %self.id, "task updated");
                self.task = Some(echoed.unwrap_or(sent));
                self.draft = None;
            }
            Err(err) => {
                tracing::error!(id = %self.id, error = %err, "failed to update task");
                self.error = Some(DetailError::RequestFailed(UPDATE_FAILED));
            }
        }
    }

    pub fn delete(&self) -> Effect {
        Effect::Run(Command::DeleteTask(self.id.clone()))
    }

    pub fn apply_deleted(&mut self, result: Result<(), ApiError>) -> Effect {
        match result {
            Ok(()) => {
                tracing::info!(id = %self.id, "task deleted");
                Effect::Navigate(Route::Home)
            }
            Err(err) => {
                tracing::error!(id = %self.id, error = %err, "failed to delete task");
                self.error = Some(DetailError::RequestFailed(DELETE_FAILED));
                Effect::None
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if self.error.is_some() || self.status == RequestStatus::Failure {
            return if is_ctrl(&key, 'r') {
                Effect::Reload
            } else {
                Effect::None
            };
        }
        if self.task.is_none() {
            return Effect::None;
        }
        if self.is_editing() {
            if is_ctrl(&key, 's') {
                return self.save();
            }
            if is_ctrl(&key, 'k') {
                return self.mark_complete();
            }
            if is_ctrl(&key, 'd') {
                return self.delete();
            }
            if key.code == KeyCode::Esc {
                self.cancel_edit();
            } else if let Some(draft) = &mut self.draft {
                draft.handle_key(key);
            }
            return Effect::None;
        }
        match key.code {
            KeyCode::Char('e') => {
                self.start_edit();
                Effect::None
            }
            KeyCode::Char('c') => self.mark_complete(),
            KeyCode::Char('d') => self.delete(),
            _ => Effect::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ctrl, key, type_text};
    use crate::task::RecordId;
    use chrono::NaiveDate;
    use reqwest::StatusCode;

    fn task() -> Task {
        Task {
            id: RecordId::Number(5),
            title: "Draft".to_string(),
            description: "first pass".to_string(),
            status: TaskStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            created_at: "2024-02-01".to_string(),
            user_id: Some(RecordId::Number(1)),
        }
    }

    fn loaded() -> TaskDetails {
        let mut details = TaskDetails::new("5".to_string());
        details.mount();
        details.apply_loaded(Ok(task()));
        details
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        }
    }

    fn sent_task(effect: Effect) -> Task {
        match effect {
            Effect::Run(Command::UpdateTask { id, task }) => {
                assert_eq!(id, "5");
                task
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn mount_fetches_by_id() {
        let mut details = TaskDetails::new("5".to_string());
        assert_eq!(
            details.mount(),
            Effect::Run(Command::FetchTask("5".to_string()))
        );
        assert!(details.status.is_loading());
    }

    #[test]
    fn missing_session_is_its_own_error() {
        let mut details = TaskDetails::new("5".to_string());
        details.mount();
        details.apply_loaded(Err(ApiError::MissingSession));
        assert_eq!(details.error, Some(DetailError::MissingSession));
        assert_eq!(
            details.error.as_ref().map(DetailError::message),
            Some("Unauthorized: No JWT Token found.")
        );
    }

    #[test]
    fn fetch_failure_shows_failure_view() {
        let mut details = TaskDetails::new("5".to_string());
        details.mount();
        details.apply_loaded(Err(server_error()));
        assert_eq!(details.status, RequestStatus::Failure);
        assert_eq!(details.error, None);
        assert_eq!(details.handle_key(ctrl('r')), Effect::Reload);
    }

    #[test]
    fn edit_then_save_commits_the_copy() {
        let mut details = loaded();
        details.handle_key(key(KeyCode::Char('e')));
        assert!(details.is_editing());

        type_text(&mut details.draft.as_mut().unwrap().title, " v2");
        let sent = sent_task(details.handle_key(ctrl('s')));
        assert_eq!(sent.title, "Draft v2");
        assert_eq!(sent.created_at, "2024-02-01");
        assert_eq!(details.task.as_ref().unwrap().title, "Draft");

        details.apply_saved(sent, Ok(None));
        assert!(!details.is_editing());
        assert_eq!(details.task.as_ref().unwrap().title, "Draft v2");
    }

    #[test]
    fn mark_complete_goes_through_save() {
        let mut details = loaded();
        let sent = sent_task(details.handle_key(key(KeyCode::Char('c'))));
        assert_eq!(sent.status, TaskStatus::Completed);
        assert_eq!(sent.title, "Draft");

        details.apply_saved(sent, Ok(None));
        assert_eq!(
            details.task.as_ref().unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn mark_complete_while_editing_keeps_edits_and_exits_edit_mode() {
        let mut details = loaded();
        details.start_edit();
        type_text(&mut details.draft.as_mut().unwrap().description, "!");

        let sent = sent_task(details.handle_key(ctrl('k')));
        assert_eq!(sent.status, TaskStatus::Completed);
        assert_eq!(sent.description, "first pass!");

        details.apply_saved(sent, Ok(None));
        assert!(!details.is_editing());
    }

    #[test]
    fn second_save_waits_for_the_first() {
        let mut details = loaded();
        assert!(matches!(details.mark_complete(), Effect::Run(_)));
        assert_eq!(details.mark_complete(), Effect::None);
    }

    #[test]
    fn error_view_only_answers_reload() {
        let mut details = loaded();
        let sent = sent_task(details.mark_complete());
        details.apply_saved(sent, Err(server_error()));

        assert_eq!(details.handle_key(key(KeyCode::Char('e'))), Effect::None);
        assert!(!details.is_editing());
        assert_eq!(details.handle_key(ctrl('r')), Effect::Reload);

        let mut signed_out = TaskDetails::new("5".to_string());
        signed_out.mount();
        signed_out.apply_loaded(Err(ApiError::MissingSession));
        assert_eq!(signed_out.handle_key(ctrl('r')), Effect::Reload);
    }

    #[test]
    fn failed_save_leaves_task_unchanged() {
        let mut details = loaded();
        let sent = sent_task(details.mark_complete());
        details.apply_saved(sent, Err(server_error()));
        assert_eq!(details.error, Some(DetailError::RequestFailed(UPDATE_FAILED)));
        assert_eq!(details.task.as_ref().unwrap().status, TaskStatus::Pending);
        assert!(!details.saving);
    }

    #[test]
    fn invalid_date_blocks_save() {
        let mut details = loaded();
        details.start_edit();
        details.draft.as_mut().unwrap().due_date = TextField::with_value("soon");
        assert_eq!(details.save(), Effect::None);
        assert!(details.notice.is_some());
        assert!(!details.saving);
    }

    #[test]
    fn delete_success_navigates_home() {
        let mut details = loaded();
        assert_eq!(
            details.handle_key(key(KeyCode::Char('d'))),
            Effect::Run(Command::DeleteTask("5".to_string()))
        );
        assert_eq!(details.apply_deleted(Ok(())), Effect::Navigate(Route::Home));
    }

    #[test]
    fn delete_failure_keeps_task() {
        let mut details = loaded();
        assert_eq!(details.apply_deleted(Err(server_error())), Effect::None);
        assert_eq!(details.error, Some(DetailError::RequestFailed(DELETE_FAILED)));
        assert_eq!(details.task, Some(task()));
    }

    #[test]
    fn esc_discards_edits() {
        let mut details = loaded();
        details.start_edit();
        type_text(&mut details.draft.as_mut().unwrap().title, "zzz");
        details.handle_key(key(KeyCode::Esc));
        assert!(!details.is_editing());
        assert_eq!(details.task.as_ref().unwrap().title, "Draft");
    }
}

use crate::api::TaskApi;
use crate::error::ApiError;
use crate::input::is_ctrl;
use crate::login::LoginScreen;
use crate::route::Route;
use crate::session::Session;
use crate::task::{NewTask, Task, TaskRecord};
use crate::task_board::TaskBoard;
use crate::task_details::TaskDetails;
use crossterm::event::KeyEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A remote call a screen asks the app to make.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login {
        email: String,
        password: String,
    },
    Signup {
        name: String,
        email: String,
        password: String,
    },
    FetchTasks,
    CreateTask(NewTask),
    FetchTask(String),
    UpdateTask {
        id: String,
        task: Task,
    },
    DeleteTask(String),
}

/// The result of a [`Command`], delivered back to the screen that issued it.
#[derive(Debug)]
pub enum Outcome {
    LoggedIn(Result<String, ApiError>),
    SignedUp(Result<(), ApiError>),
    TasksLoaded(Result<Vec<Task>, ApiError>),
    TaskCreated {
        local: Task,
        result: Result<Option<Task>, ApiError>,
    },
    TaskLoaded(Result<Task, ApiError>),
    TaskSaved {
        sent: Task,
        result: Result<Option<Task>, ApiError>,
    },
    TaskDeleted(Result<(), ApiError>),
}

impl Outcome {
    /// The outcome a command gets when it cannot be sent for lack of a session.
    fn unauthorized(command: Command) -> Self {
        let err = ApiError::MissingSession;
        match command {
            Command::Login { .. } => Outcome::LoggedIn(Err(err)),
            Command::Signup { .. } => Outcome::SignedUp(Err(err)),
            Command::FetchTasks => Outcome::TasksLoaded(Err(err)),
            Command::CreateTask(new) => Outcome::TaskCreated {
                local: new.to_task(),
                result: Err(err),
            },
            Command::FetchTask(_) => Outcome::TaskLoaded(Err(err)),
            Command::UpdateTask { task, .. } => Outcome::TaskSaved {
                sent: task,
                result: Err(err),
            },
            Command::DeleteTask(_) => Outcome::TaskDeleted(Err(err)),
        }
    }
}

/// What a screen wants the app to do after handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Run(Command),
    Navigate(Route),
    /// Store the token and go home.
    SignIn(String),
    SignOut,
    /// Re-mount the current route from scratch.
    Reload,
    Quit,
}

#[derive(Debug)]
pub enum Screen {
    Login(LoginScreen),
    Tasks(TaskBoard),
    Details(TaskDetails),
    NotFound,
}

impl Screen {
    fn for_route(route: &Route) -> Self {
        match route {
            Route::Login => Screen::Login(LoginScreen::new()),
            Route::Home => Screen::Tasks(TaskBoard::new()),
            Route::TaskDetails(id) => Screen::Details(TaskDetails::new(id.clone())),
            Route::NotFound => Screen::NotFound,
        }
    }

    fn mount(&mut self) -> Effect {
        match self {
            Screen::Tasks(board) => board.mount(),
            Screen::Details(details) => details.mount(),
            Screen::Login(_) | Screen::NotFound => Effect::None,
        }
    }

    /// Screens that carry the header with its Home and Logout actions.
    pub fn has_header(&self) -> bool {
        !matches!(self, Screen::Login(_))
    }
}

#[derive(Debug)]
struct Envelope {
    generation: u64,
    outcome: Outcome,
}

/// Hosts the current screen and runs the commands it issues.
pub struct App {
    api: TaskApi,
    session: Session,
    route: Route,
    screen: Screen,
    /// Bumped on every mount; outcomes from older mounts are dropped.
    generation: u64,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    should_quit: bool,
    tick: u64,
}

impl App {
    pub fn new(api: TaskApi, session: Session) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            session,
            route: Route::Login,
            screen: Screen::Login(LoginScreen::new()),
            generation: 0,
            cancel: CancellationToken::new(),
            tx,
            rx,
            should_quit: false,
            tick: 0,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    #[cfg(test)]
    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Visits `route`, applying the guard, and mounts a fresh screen for it.
    /// Jobs still running for the previous screen are cancelled.
    pub fn navigate(&mut self, route: Route) {
        let target = route.clone().guard(self.session.is_active());
        if target != route {
            tracing::info!(from = %route, to = %target, "redirect");
        } else {
            tracing::info!(route = %target, "navigate");
        }

        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation += 1;

        self.screen = Screen::for_route(&target);
        self.route = target;
        let effect = self.screen.mount();
        self.apply_effect(effect);
    }

    pub fn visit(&mut self, path: &str) {
        self.navigate(Route::parse(path));
    }

    pub fn reload(&mut self) {
        self.navigate(self.route.clone());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if is_ctrl(&key, 'c') || is_ctrl(&key, 'q') {
            self.should_quit = true;
            return;
        }
        if self.screen.has_header() {
            if is_ctrl(&key, 'h') {
                self.apply_effect(Effect::Navigate(Route::Home));
                return;
            }
            if is_ctrl(&key, 'l') {
                self.apply_effect(Effect::SignOut);
                return;
            }
        }
        let effect = match &mut self.screen {
            Screen::Login(screen) => screen.handle_key(key),
            Screen::Tasks(board) => board.handle_key(key),
            Screen::Details(details) => details.handle_key(key),
            Screen::NotFound => Effect::None,
        };
        self.apply_effect(effect);
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Run(command) => self.run(command),
            Effect::Navigate(route) => self.navigate(route),
            Effect::SignIn(token) => match self.session.set(token) {
                Ok(()) => {
                    tracing::info!(expires_at = ?self.session.expires_at(), "signed in");
                    self.navigate(Route::Home);
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to store session");
                    if let Screen::Login(screen) = &mut self.screen {
                        screen.error_message = Some(format!("Could not store session: {}", err));
                    }
                }
            },
            Effect::SignOut => {
                if let Err(err) = self.session.clear() {
                    tracing::error!(error = %err, "failed to clear session");
                }
                tracing::info!("signed out");
                self.navigate(Route::Login);
            }
            Effect::Reload => self.reload(),
            Effect::Quit => self.should_quit = true,
        }
    }

    /// Spawns `command` as a job tied to the current mount.
    fn run(&mut self, command: Command) {
        let generation = self.generation;
        let needs_token = !matches!(command, Command::Login { .. } | Command::Signup { .. });
        let token = self.session.token().map(str::to_owned);

        if needs_token && token.is_none() {
            tracing::warn!(route = %self.route, "no session token; request not sent");
            let _ = self.tx.send(Envelope {
                generation,
                outcome: Outcome::unauthorized(command),
            });
            return;
        }

        let api = self.api.clone();
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(generation, "job cancelled");
                }
                outcome = execute(&api, token.unwrap_or_default(), command) => {
                    let _ = tx.send(Envelope { generation, outcome });
                }
            }
        });
    }

    /// Applies every outcome that has already arrived.
    pub fn drain(&mut self) {
        while let Ok(envelope) = self.rx.try_recv() {
            self.apply_outcome(envelope);
        }
    }

    /// Waits for the next outcome and applies it.
    pub async fn settle(&mut self) {
        if let Some(envelope) = self.rx.recv().await {
            self.apply_outcome(envelope);
        }
    }

    fn apply_outcome(&mut self, envelope: Envelope) {
        if envelope.generation != self.generation {
            tracing::debug!(
                generation = envelope.generation,
                current = self.generation,
                "dropping outcome for a screen that is gone"
            );
            return;
        }
        let effect = match (&mut self.screen, envelope.outcome) {
            (Screen::Login(screen), Outcome::LoggedIn(result)) => screen.apply_login(result),
            (Screen::Login(screen), Outcome::SignedUp(result)) => screen.apply_signup(result),
            (Screen::Tasks(board), Outcome::TasksLoaded(result)) => {
                board.apply_loaded(result);
                Effect::None
            }
            (Screen::Tasks(board), Outcome::TaskCreated { local, result }) => {
                board.apply_created(local, result);
                Effect::None
            }
            (Screen::Details(details), Outcome::TaskLoaded(result)) => {
                details.apply_loaded(result);
                Effect::None
            }
            (Screen::Details(details), Outcome::TaskSaved { sent, result }) => {
                details.apply_saved(sent, result);
                Effect::None
            }
            (Screen::Details(details), Outcome::TaskDeleted(result)) => {
                details.apply_deleted(result)
            }
            (_, _) => {
                tracing::warn!(route = %self.route, "outcome does not belong to the current screen");
                Effect::None
            }
        };
        self.apply_effect(effect);
    }
}

async fn execute(api: &TaskApi, token: String, command: Command) -> Outcome {
    match command {
        Command::Login { email, password } => Outcome::LoggedIn(api.login(&email, &password).await),
        Command::Signup {
            name,
            email,
            password,
        } => Outcome::SignedUp(api.signup(&name, &email, &password).await),
        Command::FetchTasks => Outcome::TasksLoaded(api.list_tasks(&token).await),
        Command::CreateTask(new) => {
            let result = api.create_task(&token, &new).await;
            Outcome::TaskCreated {
                local: new.to_task(),
                result,
            }
        }
        Command::FetchTask(id) => Outcome::TaskLoaded(api.get_task(&token, &id).await),
        Command::UpdateTask { id, task } => {
            let record = TaskRecord::from(task.clone());
            let result = api.update_task(&token, &id, &record).await;
            Outcome::TaskSaved { sent: task, result }
        }
        Command::DeleteTask(id) => Outcome::TaskDeleted(api.delete_task(&token, &id).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ctrl, key, type_text};
    use crate::login::INVALID_CREDENTIALS;
    use crate::status::RequestStatus;
    use crate::task::TaskStatus;
    use crossterm::event::KeyCode;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(id: i64, title: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "description": "desc",
            "status": "Pending",
            "due_date": "2024-05-01",
            "created_at": "2024-04-01",
            "user_id": 1
        })
    }

    fn signed_in(server: &MockServer) -> App {
        let mut session = Session::in_memory();
        session.set("tok".to_string()).unwrap();
        App::new(TaskApi::new(server.uri()), session)
    }

    fn signed_out(server: &MockServer) -> App {
        App::new(TaskApi::new(server.uri()), Session::in_memory())
    }

    fn login_screen(app: &mut App) -> &mut LoginScreen {
        match app.screen_mut() {
            Screen::Login(screen) => screen,
            other => panic!("expected login screen, got {:?}", other),
        }
    }

    fn board(app: &App) -> &TaskBoard {
        match app.screen() {
            Screen::Tasks(board) => board,
            other => panic!("expected task board, got {:?}", other),
        }
    }

    fn details(app: &App) -> &TaskDetails {
        match app.screen() {
            Screen::Details(details) => details,
            other => panic!("expected task details, got {:?}", other),
        }
    }

    async fn submit_login(app: &mut App, email: &str, password: &str) {
        let screen = login_screen(app);
        type_text(&mut screen.email, email);
        type_text(&mut screen.password, password);
        app.handle_key(key(KeyCode::Enter));
        app.settle().await;
    }

    #[tokio::test]
    async fn successful_login_stores_token_and_goes_home() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jwtToken": "tok"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut app = signed_out(&server);
        app.visit("/login");
        submit_login(&mut app, "me@example.com", "password1").await;

        assert_eq!(app.session().token(), Some("tok"));
        assert_eq!(app.route(), &Route::Home);

        app.settle().await;
        assert_eq!(board(&app).status, RequestStatus::NoTasks);
    }

    #[tokio::test]
    async fn rejected_login_stays_on_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "x"})))
            .mount(&server)
            .await;

        let mut app = signed_out(&server);
        app.visit("/login");
        submit_login(&mut app, "me@example.com", "wrong").await;

        assert_eq!(app.session().token(), None);
        assert_eq!(app.route(), &Route::Login);
        assert_eq!(
            login_screen(&mut app).error_message.as_deref(),
            Some(INVALID_CREDENTIALS)
        );
    }

    #[tokio::test]
    async fn short_signup_password_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signup"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = signed_out(&server);
        app.visit("/login");
        app.handle_key(ctrl('s'));
        let screen = login_screen(&mut app);
        type_text(&mut screen.signup.name, "Alice");
        type_text(&mut screen.signup.email, "a@b.c");
        type_text(&mut screen.signup.password, "short");
        app.handle_key(key(KeyCode::Enter));
        app.drain();

        assert!(login_screen(&mut app).signup.error_message.is_some());
    }

    #[tokio::test]
    async fn guard_redirects_and_unknown_paths_land_on_not_found() {
        let server = MockServer::start().await;
        let mut app = signed_out(&server);

        app.visit("/");
        assert_eq!(app.route(), &Route::Login);
        app.visit("/tasks/3");
        assert_eq!(app.route(), &Route::Login);
        app.visit("/no/such/page");
        assert_eq!(app.route(), &Route::NotFound);
    }

    #[tokio::test]
    async fn login_page_redirects_when_signed_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut app = signed_in(&server);
        app.visit("/login");
        assert_eq!(app.route(), &Route::Home);
    }

    #[tokio::test]
    async fn list_loads_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([record(1, "a"), record(2, "b")])),
            )
            .mount(&server)
            .await;

        let mut app = signed_in(&server);
        app.visit("/");
        assert!(board(&app).status.is_loading());

        app.settle().await;
        let board = board(&app);
        assert_eq!(board.status, RequestStatus::Success);
        assert_eq!(board.tasks.len(), 2);
    }

    #[tokio::test]
    async fn list_failure_then_reload_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(1, "a")])))
            .mount(&server)
            .await;

        let mut app = signed_in(&server);
        app.visit("/");
        app.settle().await;
        assert_eq!(board(&app).status, RequestStatus::Failure);

        app.handle_key(ctrl('r'));
        app.settle().await;
        assert_eq!(board(&app).status, RequestStatus::Success);
    }

    #[tokio::test]
    async fn stale_results_are_dropped_after_navigating_away() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([record(1, "a")]))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let mut app = signed_in(&server);
        app.visit("/");
        app.visit("/not-found");

        tokio::time::sleep(Duration::from_millis(400)).await;
        app.drain();
        assert!(matches!(app.screen(), Screen::NotFound));
    }

    #[tokio::test]
    async fn mark_complete_puts_full_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record(1, "a")))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/tasks/1"))
            .and(body_partial_json(json!({
                "id": 1,
                "title": "a",
                "status": "Completed",
                "due_date": "2024-05-01",
                "user_id": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("updated"))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = signed_in(&server);
        app.visit("/tasks/1");
        app.settle().await;
        app.handle_key(key(KeyCode::Char('c')));
        app.settle().await;

        let task = details(&app).task.as_ref().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(details(&app).error, None);
    }

    #[tokio::test]
    async fn delete_success_returns_to_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record(1, "a")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/tasks/1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut app = signed_in(&server);
        app.visit("/tasks/1");
        app.settle().await;
        app.handle_key(key(KeyCode::Char('d')));
        app.settle().await;

        assert_eq!(app.route(), &Route::Home);
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let server = MockServer::start().await;
        let mut app = signed_in(&server);
        app.visit("/not-found");

        app.handle_key(ctrl('l'));
        assert!(!app.session().is_active());
        assert_eq!(app.route(), &Route::Login);
    }

    #[tokio::test]
    async fn commands_without_session_are_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = signed_out(&server);
        app.screen = Screen::Details(TaskDetails::new("1".to_string()));
        let effect = app.screen.mount();
        app.apply_effect(effect);
        app.settle().await;

        assert_eq!(
            details(&app).error,
            Some(crate::task_details::DetailError::MissingSession)
        );
    }
}

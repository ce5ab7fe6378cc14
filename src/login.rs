use crate::app::{Command, Effect};
use crate::error::ApiError;
use crate::input::{cycle, focus_step, is_ctrl, TextField};
use crossterm::event::{KeyCode, KeyEvent};

pub const INVALID_CREDENTIALS: &str = "Invalid Email or Password";
pub const INVALID_PASSWORD: &str = "Invalid Password";
pub const INVALID_NAME: &str = "Invalid User Name. User name must be at least 3 characters";
pub const SIGNUP_OK: &str = "Signup successful! Please log in.";
pub const SIGNUP_FAILED: &str = "Signup failed.";
pub const NETWORK_ERROR: &str = "Network error. Please try again later.";

const REQUIRED: &str = "Please fill out this field.";
const MIN_PASSWORD_LEN: usize = 7;
const MIN_NAME_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Name,
    Email,
    Password,
}

const LOGIN_FIELDS: [AuthField; 2] = [AuthField::Email, AuthField::Password];
const SIGNUP_FIELDS: [AuthField; 3] = [AuthField::Name, AuthField::Email, AuthField::Password];

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: TextField,
    pub email: TextField,
    pub password: TextField,
    pub show_password: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl SignupForm {
    /// Local checks that run before any request is sent.
    fn validate(&self) -> Result<(), &'static str> {
        if self.name.value().is_empty()
            || self.email.is_blank()
            || self.password.value().is_empty()
        {
            return Err(REQUIRED);
        }
        if !self.email.value().contains('@') {
            return Err("Please include an '@' in the email address.");
        }
        if self.password.value().trim().chars().count() < MIN_PASSWORD_LEN {
            return Err(INVALID_PASSWORD);
        }
        if self.name.value().trim().chars().count() < MIN_NAME_LEN {
            return Err(INVALID_NAME);
        }
        Ok(())
    }
}

/// The `/login` screen, which also hosts the signup form.
#[derive(Debug, Clone)]
pub struct LoginScreen {
    pub mode: AuthMode,
    pub focus: AuthField,
    pub email: TextField,
    pub password: TextField,
    pub show_password: bool,
    pub error_message: Option<String>,
    pub signup: SignupForm,
}

impl Default for LoginScreen {
    fn default() -> Self {
        Self {
            mode: AuthMode::Login,
            focus: AuthField::Email,
            email: TextField::default(),
            password: TextField::default(),
            show_password: false,
            error_message: None,
            signup: SignupForm::default(),
        }
    }
}

impl LoginScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn fields(&self) -> &'static [AuthField] {
        match self.mode {
            AuthMode::Login => &LOGIN_FIELDS,
            AuthMode::Signup => &SIGNUP_FIELDS,
        }
    }

    pub fn field_mut(&mut self, field: AuthField) -> &mut TextField {
        match (self.mode, field) {
            (AuthMode::Login, AuthField::Password) => &mut self.password,
            (AuthMode::Login, _) => &mut self.email,
            (AuthMode::Signup, AuthField::Name) => &mut self.signup.name,
            (AuthMode::Signup, AuthField::Email) => &mut self.signup.email,
            (AuthMode::Signup, AuthField::Password) => &mut self.signup.password,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        };
        self.focus = self.fields()[0];
    }

    pub fn toggle_show_password(&mut self) {
        match self.mode {
            AuthMode::Login => self.show_password = !self.show_password,
            AuthMode::Signup => self.signup.show_password = !self.signup.show_password,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if is_ctrl(&key, 's') {
            self.toggle_mode();
            return Effect::None;
        }
        if is_ctrl(&key, 'p') {
            self.toggle_show_password();
            return Effect::None;
        }
        if let Some(forward) = focus_step(&key) {
            self.focus = cycle(self.fields(), self.focus, forward);
            return Effect::None;
        }
        match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::Esc if self.mode == AuthMode::Signup => {
                self.toggle_mode();
                Effect::None
            }
            KeyCode::Esc => Effect::Quit,
            _ => {
                let focus = self.focus;
                self.field_mut(focus).handle_key(key);
                Effect::None
            }
        }
    }

    pub fn submit(&mut self) -> Effect {
        match self.mode {
            AuthMode::Login => self.submit_login(),
            AuthMode::Signup => self.submit_signup(),
        }
    }

    fn submit_login(&mut self) -> Effect {
        self.error_message = None;
        if self.email.is_blank() || self.password.value().is_empty() {
            self.error_message = Some(REQUIRED.to_string());
            return Effect::None;
        }
        if !self.email.value().contains('@') {
            self.error_message = Some("Please include an '@' in the email address.".to_string());
            return Effect::None;
        }
        Effect::Run(Command::Login {
            email: self.email.value().to_string(),
            password: self.password.value().to_string(),
        })
    }

    fn submit_signup(&mut self) -> Effect {
        let form = &mut self.signup;
        form.error_message = None;
        form.success_message = None;
        if let Err(message) = form.validate() {
            form.error_message = Some(message.to_string());
            return Effect::None;
        }
        Effect::Run(Command::Signup {
            name: form.name.value().to_string(),
            email: form.email.value().to_string(),
            password: form.password.value().to_string(),
        })
    }

    pub fn apply_login(&mut self, result: Result<String, ApiError>) -> Effect {
        match result {
            Ok(token) => Effect::SignIn(token),
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                self.error_message = Some(INVALID_CREDENTIALS.to_string());
                Effect::None
            }
        }
    }

    pub fn apply_signup(&mut self, result: Result<(), ApiError>) -> Effect {
        let form = &mut self.signup;
        match result {
            Ok(()) => {
                tracing::info!("signup succeeded");
                form.success_message = Some(SIGNUP_OK.to_string());
                form.name.clear();
                form.email.clear();
                form.password.clear();
            }
            Err(err) => {
                tracing::warn!(error = %err, "signup failed");
                let message = if err.is_transport() {
                    NETWORK_ERROR
                } else {
                    err.server_message().unwrap_or(SIGNUP_FAILED)
                };
                form.error_message = Some(message.to_string());
            }
        }
        Effect::None
    }
}

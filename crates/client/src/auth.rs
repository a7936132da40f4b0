//! Login/signup form state machine and role-gated access.
//!
//! ```text
//! Anonymous ──login──▶ Authenticating ──ok──▶ Authenticated
//!     ▲                      │
//!     └──────── error ◀──────┘
//! Anonymous ──signup──▶ Registering ──▶ Anonymous (success message | error)
//! ```
//!
//! Local checks (empty fields, password policy) never reach the
//! authenticator. The form's error and success messages are a single
//! [`Feedback`] value, so they cannot both be set.

use std::sync::{Mutex, MutexGuard};

use protocol::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::Authenticator;

/// Minimum password length for signup.
pub const MIN_PASSWORD_LEN: usize = 6;

pub const FIELDS_REQUIRED_MESSAGE: &str = "Please fill in all fields";
pub const PASSWORD_TOO_SHORT_MESSAGE: &str = "Password must be at least 6 characters long";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials or email not verified";
pub const SIGNUP_FAILED_MESSAGE: &str = "Signup failed. Please try again.";
pub const SIGNUP_SUCCESS_MESSAGE: &str =
    "Account created successfully! Please check your email for verification.";

/// Which form is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Signup,
}

/// Inline message under the form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    None,
    Error(String),
    Success(String),
}

impl Feedback {
    pub fn error(&self) -> Option<&str> {
        match self {
            Feedback::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn success(&self) -> Option<&str> {
        match self {
            Feedback::Success(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Form fields and flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    pub feedback: Feedback,
    /// Set while the authenticator is being called; gates resubmission.
    pub is_loading: bool,
}

impl AuthForm {
    fn clear_fields(&mut self) {
        self.email.clear();
        self.password.clear();
        self.confirm_password.clear();
    }
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub email: String,
    pub role: Role,
}

/// Coarse state of the session machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Registering,
    Authenticated,
}

/// Result of a login or signup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Another attempt is in progress.
    Busy,
    /// Rejected locally; the authenticator was not called.
    Invalid(String),
    /// Session established.
    LoggedIn(UserSession),
    /// Account created; the form is back in login mode.
    Registered,
    /// The authenticator refused or failed.
    Failed(String),
}

/// Something the application lets a role do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Upload,
    Browse,
    Download,
}

impl Capability {
    /// Ops users upload; client users browse and download.
    pub fn is_granted_to(&self, role: Role) -> bool {
        match self {
            Capability::Upload => role == Role::Ops,
            Capability::Browse | Capability::Download => role == Role::Client,
        }
    }
}

/// Access check failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("not signed in")]
    NotAuthenticated,

    #[error("{role} users may not {capability:?}")]
    Forbidden { role: Role, capability: Capability },
}

/// Authentication workflow over an [`Authenticator`].
pub struct AuthSession<A> {
    authenticator: A,
    form: Mutex<AuthForm>,
    session: watch::Sender<Option<UserSession>>,
}

impl<A: Authenticator> AuthSession<A> {
    pub fn new(authenticator: A) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            authenticator,
            form: Mutex::new(AuthForm::default()),
            session,
        }
    }

    /// Snapshot of the form.
    pub fn form(&self) -> AuthForm {
        self.lock_form().clone()
    }

    /// Current session, if authenticated.
    pub fn session(&self) -> Option<UserSession> {
        self.session.borrow().clone()
    }

    /// Receiver notified when the session is created or destroyed.
    pub fn subscribe(&self) -> watch::Receiver<Option<UserSession>> {
        self.session.subscribe()
    }

    pub fn phase(&self) -> AuthPhase {
        let form = self.lock_form();
        if form.is_loading {
            match form.mode {
                AuthMode::Login => AuthPhase::Authenticating,
                AuthMode::Signup => AuthPhase::Registering,
            }
        } else if self.session.borrow().is_some() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }

    pub fn set_email(&self, email: impl Into<String>) {
        self.lock_form().email = email.into();
    }

    pub fn set_password(&self, password: impl Into<String>) {
        self.lock_form().password = password.into();
    }

    pub fn set_confirm_password(&self, confirm: impl Into<String>) {
        self.lock_form().confirm_password = confirm.into();
    }

    pub fn set_role(&self, role: Role) {
        self.lock_form().role = role;
    }

    /// Switch between login and signup, clearing feedback and all fields.
    pub fn toggle_mode(&self) -> AuthMode {
        let mut form = self.lock_form();
        form.mode = match form.mode {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        };
        form.feedback = Feedback::None;
        form.clear_fields();
        debug!(mode = ?form.mode, "Toggled auth mode");
        form.mode
    }

    /// Submit the form in its current mode.
    pub async fn submit(&self) -> AuthOutcome {
        let form = self.form();
        match form.mode {
            AuthMode::Login => self.login(&form.email, &form.password, form.role).await,
            AuthMode::Signup => {
                self.signup(&form.email, &form.password, &form.confirm_password, form.role)
                    .await
            }
        }
    }

    /// Log in. A failed attempt destroys any existing session.
    pub async fn login(&self, email: &str, password: &str, role: Role) -> AuthOutcome {
        {
            let mut form = self.lock_form();
            if form.is_loading {
                return AuthOutcome::Busy;
            }
            form.feedback = Feedback::None;
            form.role = role;

            if email.is_empty() || password.is_empty() {
                return invalid(&mut form, FIELDS_REQUIRED_MESSAGE);
            }
            form.is_loading = true;
        }
        let _loading = Loading { form: &self.form };

        info!(email, role = %role, "Logging in");
        match self.authenticator.login(email, password, role).await {
            Ok(true) => {
                let session = UserSession {
                    email: email.to_string(),
                    role,
                };
                self.session.send_replace(Some(session.clone()));
                info!(email, role = %role, "Authenticated");
                AuthOutcome::LoggedIn(session)
            }
            Ok(false) => {
                info!(email, "Login refused");
                self.end_session();
                self.fail(INVALID_CREDENTIALS_MESSAGE)
            }
            Err(err) => {
                warn!(email, error = %err, "Login call failed");
                self.end_session();
                self.fail(INVALID_CREDENTIALS_MESSAGE)
            }
        }
    }

    /// Register a new account.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
        role: Role,
    ) -> AuthOutcome {
        {
            let mut form = self.lock_form();
            if form.is_loading {
                return AuthOutcome::Busy;
            }
            form.feedback = Feedback::None;
            form.role = role;

            if email.is_empty() || password.is_empty() || confirm_password.is_empty() {
                return invalid(&mut form, FIELDS_REQUIRED_MESSAGE);
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return invalid(&mut form, PASSWORD_TOO_SHORT_MESSAGE);
            }
            if password != confirm_password {
                return invalid(&mut form, PASSWORD_MISMATCH_MESSAGE);
            }
            form.is_loading = true;
        }
        let _loading = Loading { form: &self.form };

        info!(email, role = %role, "Signing up");
        match self.authenticator.signup(email, password, role).await {
            Ok(result) if result.success => {
                let mut form = self.lock_form();
                form.mode = AuthMode::Login;
                form.clear_fields();
                form.feedback = Feedback::Success(SIGNUP_SUCCESS_MESSAGE.to_string());
                info!(email, "Account created, verification pending");
                AuthOutcome::Registered
            }
            Ok(result) => {
                let message = result
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| SIGNUP_FAILED_MESSAGE.to_string());
                info!(email, reason = %message, "Signup refused");
                self.fail(&message)
            }
            Err(err) => {
                warn!(email, error = %err, "Signup call failed");
                self.fail(SIGNUP_FAILED_MESSAGE)
            }
        }
    }

    /// Re-establish a session persisted by a previous run.
    pub fn resume(&self, session: UserSession) {
        debug!(email = %session.email, role = %session.role, "Resuming session");
        self.session.send_replace(Some(session));
    }

    /// Destroy the session.
    pub fn logout(&self) {
        if self.end_session() {
            info!("Logged out");
        }
    }

    /// The session, if its role is granted `capability`.
    pub fn require(&self, capability: Capability) -> Result<UserSession, AccessError> {
        let session = self.session().ok_or(AccessError::NotAuthenticated)?;
        if capability.is_granted_to(session.role) {
            Ok(session)
        } else {
            Err(AccessError::Forbidden {
                role: session.role,
                capability,
            })
        }
    }

    fn end_session(&self) -> bool {
        self.session.send_replace(None).is_some()
    }

    fn fail(&self, message: &str) -> AuthOutcome {
        self.lock_form().feedback = Feedback::Error(message.to_string());
        AuthOutcome::Failed(message.to_string())
    }

    fn lock_form(&self) -> MutexGuard<'_, AuthForm> {
        self.form.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn invalid(form: &mut AuthForm, message: &str) -> AuthOutcome {
    form.feedback = Feedback::Error(message.to_string());
    AuthOutcome::Invalid(message.to_string())
}

/// Clears `is_loading` when the attempt finishes or is dropped.
struct Loading<'a> {
    form: &'a Mutex<AuthForm>,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        let mut form = self.form.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        form.is_loading = false;
    }
}

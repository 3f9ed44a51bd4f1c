//! Session manager. Owns the access token from login to logout.
//!
//! State machine: `Anonymous -> Authenticated -> Anonymous`. A session is
//! never refreshed in place; every login mints a new [`Session`] and revokes
//! the previous one. Any unauthorized response reported through
//! [`SessionManager::observe`] for the current session drops back to
//! `Anonymous`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use nexus_core::models::auth::{RegisterResponse, TokenResponse};
use nexus_core::validation::{LoginForm, RegistrationForm};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AuthError, HttpError};
use crate::gateway::{ApiGateway, Method};

const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";

/// Opaque bearer credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

struct SessionInner {
    id: u64,
    token: AccessToken,
    token_type: String,
    issued_at: DateTime<Utc>,
    active: AtomicBool,
}

/// An authenticated session. Clones share the same revocation flag.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Monotonically increasing per manager; a newer login has a larger id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn token(&self) -> &AccessToken {
        &self.inner.token
    }

    pub fn token_type(&self) -> &str {
        &self.inner.token_type
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.inner.issued_at
    }

    /// False once the manager has logged out or invalidated this session.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    fn revoke(&self) {
        self.inner.active.store(false, Ordering::Release);
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("issued_at", &self.inner.issued_at)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Observable authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// The only component allowed to mint or revoke sessions.
pub struct SessionManager {
    gateway: ApiGateway,
    state: watch::Sender<SessionState>,
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new(gateway: ApiGateway) -> Self {
        Self {
            gateway,
            state: watch::Sender::new(SessionState::Anonymous),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        match &*self.state.borrow() {
            SessionState::Authenticated(session) => Some(session.clone()),
            SessionState::Anonymous => None,
        }
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether results obtained under `session` may still be applied.
    pub fn is_current(&self, session: &Session) -> bool {
        session.is_active()
            && matches!(&*self.state.borrow(), SessionState::Authenticated(cur) if cur == session)
    }

    /// Authenticate and make the new session current.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let form = LoginForm::new(email, password);
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let resp: TokenResponse = self
            .gateway
            .request_json(Method::POST, LOGIN_PATH, Some(&form.to_request()), None)
            .await
            .map_err(|e| match e {
                HttpError::Unauthorized { .. } => AuthError::InvalidCredentials,
                other => AuthError::Http(other),
            })?;

        if resp.access_token.is_empty() {
            warn!("login response carried an empty access token");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.install(resp.access_token, resp.token_type);
        info!(session_id = session.id(), "logged in");
        Ok(session)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, form: &RegistrationForm) -> Result<(), AuthError> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let resp: RegisterResponse = self
            .gateway
            .request_json(Method::POST, REGISTER_PATH, Some(&form.to_request()), None)
            .await
            .map_err(|e| match e {
                HttpError::Server { status, detail } if (400..500).contains(&status) => {
                    AuthError::Rejected(detail)
                }
                other => AuthError::Http(other),
            })?;

        info!(message = %resp.message, "registered account");
        Ok(())
    }

    /// Adopt a token obtained out of band (e.g. handed over by another
    /// process) as the current session.
    pub fn resume(&self, token: impl Into<String>) -> Session {
        let session = self.install(token.into(), "bearer".to_string());
        debug!(session_id = session.id(), "resumed session from token");
        session
    }

    /// Drop the current session. Idempotent.
    pub fn logout(&self) {
        let previous = self.state.send_replace(SessionState::Anonymous);
        if let SessionState::Authenticated(session) = previous {
            session.revoke();
            info!(session_id = session.id(), "logged out");
        }
    }

    /// Report the outcome of an authenticated call made under `session`.
    ///
    /// An unauthorized error ends `session` if it is still current. The
    /// result is handed back untouched.
    pub fn observe<T>(&self, session: &Session, result: Result<T, HttpError>) -> Result<T, HttpError> {
        if let Err(err) = &result
            && err.is_auth()
        {
            self.invalidate(session);
        }
        result
    }

    fn invalidate(&self, session: &Session) {
        let changed = self.state.send_if_modified(|state| {
            let is_current = matches!(state, SessionState::Authenticated(current) if *current == *session);
            if is_current {
                *state = SessionState::Anonymous;
            }
            is_current
        });
        session.revoke();
        if changed {
            warn!(session_id = session.id(), "session rejected by server; login required");
        }
    }

    fn install(&self, token: String, token_type: String) -> Session {
        let session = Session {
            inner: Arc::new(SessionInner {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                token: AccessToken(token),
                token_type,
                issued_at: Utc::now(),
                active: AtomicBool::new(true),
            }),
        };
        let previous = self
            .state
            .send_replace(SessionState::Authenticated(session.clone()));
        if let SessionState::Authenticated(old) = previous {
            old.revoke();
        }
        session
    }
}

//! Session/token lifecycle against the auth endpoints.
//!
//! Three states: unauthenticated (no token), restoring (`initializing` while a
//! persisted token is validated), authenticated (token + profile set). The
//! persisted token and the in-memory token move in lockstep on every
//! transition.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Method;
use serde::Deserialize;

use crate::error::Result;
use crate::http::Api;
use crate::models::Profile;

/// Persistence seam for the bearer token.
///
/// Exactly one token string lives under a fixed storage key; implementations
/// range from the OS keychain (CLI) to an in-memory map (tests).
pub trait TokenStore: Send + Sync {
    fn load_token(&self) -> Result<Option<String>>;
    fn save_token(&self, token: &str) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<Profile>,
    initializing: bool,
}

/// Owns the bearer token and the current user profile.
///
/// Constructed once per process and handed to each resource store, which
/// reads the current token through [`SessionStore::token`].
pub struct SessionStore {
    api: Arc<dyn Api>,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: Profile,
}

impl SessionStore {
    pub fn new(api: Arc<dyn Api>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            tokens,
            state: Mutex::new(SessionState {
                initializing: true,
                ..SessionState::default()
            }),
        }
    }

    /// Restore a persisted session, if any. Run once at startup.
    ///
    /// A stored token is optimistically applied and then validated against
    /// the profile endpoint; validation failure means the token expired, so
    /// the session is cleared silently rather than surfaced as an error.
    pub async fn bootstrap(&self) {
        let stored = match self.tokens.load_token() {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!("Failed to read persisted token: {error}");
                None
            }
        };

        if let Some(token) = stored {
            self.lock_state().token = Some(token.clone());
            match self.fetch_profile(&token).await {
                Ok(profile) => {
                    self.lock_state().user = Some(profile);
                }
                Err(error) => {
                    tracing::warn!("Failed to restore persisted session: {error}");
                    if let Err(error) = self.tokens.clear_token() {
                        tracing::warn!("Failed to clear persisted token: {error}");
                    }
                    let mut state = self.lock_state();
                    state.token = None;
                    state.user = None;
                }
            }
        }

        self.lock_state().initializing = false;
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile> {
        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let response = self
            .api
            .request(Method::POST, "/auth/login", &[], Some(payload), None)
            .await?;
        let session: AuthResponse = serde_json::from_value(response)?;
        self.apply_session(session)
    }

    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Profile> {
        let payload = serde_json::json!({
            "name": name,
            "email": email,
            "password": password,
        });
        let response = self
            .api
            .request(Method::POST, "/auth/register", &[], Some(payload), None)
            .await?;
        let session: AuthResponse = serde_json::from_value(response)?;
        self.apply_session(session)
    }

    /// Drop the session locally. Never calls the server.
    pub fn sign_out(&self) -> Result<()> {
        {
            let mut state = self.lock_state();
            state.token = None;
            state.user = None;
        }
        self.tokens.clear_token()
    }

    /// Current bearer token, if a session is active.
    pub fn token(&self) -> Option<String> {
        self.lock_state().token.clone()
    }

    /// Current user profile, if a session is active.
    pub fn user(&self) -> Option<Profile> {
        self.lock_state().user.clone()
    }

    /// True while a persisted token is being validated at startup.
    pub fn initializing(&self) -> bool {
        self.lock_state().initializing
    }

    async fn fetch_profile(&self, token: &str) -> Result<Profile> {
        let response = self
            .api
            .request(Method::GET, "/auth/me", &[], None, Some(token))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Persist first, then swap the in-memory token and user atomically.
    fn apply_session(&self, session: AuthResponse) -> Result<Profile> {
        self.tokens.save_token(&session.token)?;
        let mut state = self.lock_state();
        state.token = Some(session.token);
        state.user = Some(session.user.clone());
        Ok(session.user)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        formatter
            .debug_struct("SessionStore")
            .field("token", &state.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &state.user)
            .field("initializing", &state.initializing)
            .finish()
    }
}

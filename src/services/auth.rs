// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the hosted auth service.
//!
//! Handles:
//! - Email/password sign-in and sign-up
//! - Token refresh shortly before expiry
//! - Sign-out (remote revoke is best effort, local state is always cleared)
//! - Session persistence between runs
//! - Ordered change notifications for the session store

use crate::error::{AppError, Result};
use crate::models::Session;
use crate::services::supabase::SupabaseClient;
use crate::time_utils::unix_now;
use reqwest::Method;
use serde_json::json;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Refresh the access token when it expires within this margin.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Buffered change notifications per subscriber before it lags.
const EVENT_CAPACITY: usize = 32;

/// Kind of session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A session change notification. The session fully replaces the previous one.
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// The auth collaborator as seen by the session store.
pub trait AuthProvider: Send + Sync + 'static {
    /// Current session, refreshed if needed. `None` when signed out.
    fn current_session(&self) -> impl Future<Output = Result<Option<Session>>> + Send;

    /// Change stream. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// End the session.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is usable right away.
    SignedIn(Session),
    /// The backend sent a confirmation email first.
    ConfirmationRequired { email: String },
}

/// HTTP client for the auth service with local session state.
pub struct AuthClient {
    backend: SupabaseClient,
    session: RwLock<Option<Session>>,
    storage: Option<SessionFile>,
    /// Serializes refresh calls so a refresh token is used once.
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<AuthChange>,
}

impl AuthClient {
    /// Create the client, restoring a persisted session if there is one.
    pub fn new(backend: SupabaseClient, session_file: Option<PathBuf>) -> Self {
        let storage = session_file.map(SessionFile::new);
        let restored = storage.as_ref().and_then(SessionFile::load);
        if let Some(session) = &restored {
            tracing::debug!(user_id = %session.user.id, "Restored persisted session");
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            session: RwLock::new(restored),
            storage,
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let email = validate_credentials(email, password)?;

        let response = self
            .backend
            .request(Method::POST, &self.backend.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: Session = SupabaseClient::check_response_json(response)
            .await
            .map_err(rejected_grant)?;
        let session = session.with_issue_time(unix_now());

        tracing::info!(user_id = %session.user.id, "Signed in");
        self.set_session(Some(session.clone()), AuthEvent::SignedIn)
            .await;
        Ok(session)
    }

    /// Register a new account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let email = validate_credentials(email, password)?;

        let response = self
            .backend
            .request(Method::POST, &self.backend.auth_url("signup"), None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: serde_json::Value = SupabaseClient::check_response_json(response).await?;

        // Autoconfirm projects answer with a session, others with the bare user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)
                .map_err(|e| AppError::Transport(format!("JSON parse error: {e}")))?;
            let session = session.with_issue_time(unix_now());
            tracing::info!(user_id = %session.user.id, "Signed up and signed in");
            self.set_session(Some(session.clone()), AuthEvent::SignedIn)
                .await;
            return Ok(SignUpOutcome::SignedIn(session));
        }

        let email = body
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or(email)
            .to_string();
        tracing::info!(email = %email, "Sign-up pending email confirmation");
        Ok(SignUpOutcome::ConfirmationRequired { email })
    }

    /// Access token for data requests, if signed in.
    pub async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.current_session().await?.map(|s| s.access_token))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .backend
            .request(Method::POST, &self.backend.auth_url("token"), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let session: Session = SupabaseClient::check_response_json(response)
            .await
            .map_err(rejected_grant)?;
        Ok(session.with_issue_time(unix_now()))
    }

    /// Replace the session, persist it and notify subscribers.
    ///
    /// The write lock is held while notifying so subscribers observe changes
    /// in the same order the state changed.
    async fn set_session(&self, session: Option<Session>, event: AuthEvent) {
        let mut slot = self.session.write().await;
        *slot = session.clone();

        if let Some(storage) = &self.storage {
            match &session {
                Some(session) => storage.save(session).await,
                None => storage.clear().await,
            }
        }

        // No subscribers is fine.
        let _ = self.events.send(AuthChange { event, session });
    }
}

impl AuthProvider for AuthClient {
    async fn current_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.session.read().await.clone() else {
            return Ok(None);
        };
        if !session.expires_within(unix_now(), TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(Some(session));
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-check after acquiring the lock: another task may have refreshed
        // or signed out while we were waiting.
        let Some(session) = self.session.read().await.clone() else {
            return Ok(None);
        };
        if !session.expires_within(unix_now(), TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!(user_id = %refreshed.user.id, "Access token refreshed");
                self.set_session(Some(refreshed.clone()), AuthEvent::TokenRefreshed)
                    .await;
                Ok(Some(refreshed))
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(error = %e, "Refresh token rejected, signing out");
                self.set_session(None, AuthEvent::SignedOut).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            let revoke = async {
                let response = self
                    .backend
                    .request(Method::POST, &self.backend.auth_url("logout"), Some(&token))
                    .send()
                    .await?;
                SupabaseClient::check_response(response).await.map(|_| ())
            };
            if let Err(e) = revoke.await {
                tracing::warn!(error = %e, "Remote sign-out failed, clearing local session anyway");
            }
        }

        self.set_session(None, AuthEvent::SignedOut).await;
        tracing::info!("Signed out");
        Ok(())
    }
}

/// The token endpoint answers bad credentials and dead refresh tokens with
/// 400 `invalid_grant`.
fn rejected_grant(err: AppError) -> AppError {
    match err {
        AppError::Query {
            status: 400 | 401 | 403,
            message,
        } => AppError::Unauthorized(message),
        other => other,
    }
}

fn validate_credentials<'a>(email: &'a str, password: &str) -> Result<&'a str> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(email)
}

/// JSON file holding the persisted session.
struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Option<Session> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
                None
            }
        }
    }

    async fn save(&self, session: &Session) {
        let result = async {
            if let Some(dir) = self.path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            let raw = serde_json::to_vec(session).map_err(std::io::Error::other)?;
            tokio::fs::write(&self.path, raw).await
        };
        if let Err(e) = result.await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist session");
        }
    }

    async fn clear(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove session file")
            }
        }
    }
}

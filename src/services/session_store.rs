// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: bridges auth change notifications into watchable state.

use crate::models::{Session, User};
use crate::services::auth::{AuthEvent, AuthProvider};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the rest of the client knows about authentication right now.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// True until the initial session check has settled
    pub loading: bool,
    pub session: Option<Session>,
    /// Bumped on every sign-in and sign-out, not on token refresh.
    ///
    /// Watchers only see the latest snapshot; a changed epoch tells them a
    /// sign-out happened in between even when the same user is back.
    pub epoch: u64,
}

impl SessionSnapshot {
    fn loading() -> Self {
        Self {
            loading: true,
            session: None,
            epoch: 0,
        }
    }

    fn resolved(session: Option<Session>, epoch: u64) -> Self {
        Self {
            loading: false,
            session,
            epoch,
        }
    }

    /// Present iff a session is present.
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Holds the current session and keeps it in sync with the auth client.
///
/// Each notification replaces the held snapshot wholesale. The subscription is
/// cancelled by `teardown` (or on drop).
pub struct SessionStore {
    state: watch::Receiver<SessionSnapshot>,
    listener: JoinHandle<()>,
}

impl SessionStore {
    /// Start tracking the session of `auth`.
    ///
    /// The initial snapshot is `loading`; it resolves once the current session
    /// has been requested, to "signed out" if that request fails.
    pub fn start<A: AuthProvider>(auth: Arc<A>) -> Self {
        let (tx, rx) = watch::channel(SessionSnapshot::loading());

        // Subscribe before the initial request so no change can slip between.
        let mut changes = auth.subscribe();

        let listener = tokio::spawn(async move {
            let mut epoch = 1;
            let initial = resolve_current(auth.as_ref()).await;
            tx.send_replace(SessionSnapshot::resolved(initial, epoch));

            loop {
                match changes.recv().await {
                    Ok(change) => {
                        tracing::debug!(event = ?change.event, "Session changed");
                        if change.event != AuthEvent::TokenRefreshed {
                            epoch += 1;
                        }
                        tx.send_replace(SessionSnapshot::resolved(change.session, epoch));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session notifications lagged, re-reading session");
                        // The skipped changes may include a sign-out.
                        epoch += 1;
                        let current = resolve_current(auth.as_ref()).await;
                        tx.send_replace(SessionSnapshot::resolved(current, epoch));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            state: rx,
            listener,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every replacement of the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Cancel the subscription. Consumes the store, so it happens once.
    pub fn teardown(self) {
        tracing::debug!("Session store torn down");
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn resolve_current<A: AuthProvider>(auth: &A) -> Option<Session> {
    match auth.current_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Initial session check failed, treating as signed out");
            None
        }
    }
}

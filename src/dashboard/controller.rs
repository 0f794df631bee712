// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard controller: owns all dashboard state and the requests behind it.
//!
//! The controller is driven from a single event loop. Session snapshots and
//! user gestures change state synchronously; backend requests are queued as
//! futures and their outcomes are fed back through [`DashboardController::apply`].
//!
//! Every request is tagged with a generation. Loads use the load generation
//! (bumped on every reload), completions use the session generation (bumped
//! when the signed-in user changes). An outcome whose generation is no longer
//! current is dropped, so a late response can never touch state that belongs
//! to a different session or a newer load.

use crate::db::OfferStore;
use crate::error::{AppError, Result};
use crate::models::{Offer, User};
use crate::services::session_store::SessionSnapshot;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

/// Observable dashboard states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
    /// Initial session check in flight
    Loading,
    Unauthenticated,
    /// Signed in, offers loading or unavailable
    AuthenticatedEmpty,
    /// Signed in, offers listed
    AuthenticatedReady,
    /// Detail dialog open
    OfferSelected,
    /// Completion request in flight for the open offer
    Completing,
}

/// One independently loaded piece of dashboard data.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Idle,
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Slot<T> {
    pub fn is_settled(&self) -> bool {
        matches!(self, Slot::Ready(_) | Slot::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// The open detail dialog. Holds its own copy of the offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub offer: Offer,
    pub completing: bool,
}

/// Settled backend request, tagged with the generation that issued it.
#[derive(Debug)]
pub enum Outcome {
    Offers {
        generation: u64,
        result: Result<Vec<Offer>>,
    },
    ClickCount {
        generation: u64,
        count: u64,
    },
    Completion {
        generation: u64,
        offer_id: String,
        result: Result<()>,
    },
}

/// State machine tying session, data and the detail dialog together.
pub struct DashboardController<S: OfferStore> {
    store: Arc<S>,
    session_loading: bool,
    user: Option<User>,
    session_generation: u64,
    load_generation: u64,
    /// Last session epoch seen from the session store
    session_epoch: u64,
    offers: Slot<Vec<Offer>>,
    click_count: Slot<u64>,
    /// Completions confirmed while the count fetch was still in flight
    completions_since_load: u64,
    dialog: Option<Dialog>,
    pending: FuturesUnordered<BoxFuture<'static, Outcome>>,
}

impl<S: OfferStore> DashboardController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            session_loading: true,
            user: None,
            session_generation: 0,
            load_generation: 0,
            session_epoch: 0,
            offers: Slot::Idle,
            click_count: Slot::Idle,
            completions_since_load: 0,
            dialog: None,
            pending: FuturesUnordered::new(),
        }
    }

    // ─── Session ─────────────────────────────────────────────────

    /// React to a session snapshot from the session store.
    ///
    /// Signing out clears everything, including an open dialog. A different
    /// user, or the same user in a new epoch, starts a fresh load; a
    /// refreshed token for the same user does not.
    pub fn on_session(&mut self, snapshot: &SessionSnapshot) {
        if snapshot.loading {
            return;
        }
        self.session_loading = false;

        // A new epoch means a sign-out or sign-in happened since the last
        // snapshot, even if the user id is unchanged.
        let same_epoch = snapshot.epoch == self.session_epoch;
        self.session_epoch = snapshot.epoch;

        match snapshot.user() {
            None => {
                if self.user.take().is_some() {
                    tracing::info!("Session ended, returning to sign-in");
                }
                self.reset();
            }
            Some(user)
                if same_epoch && self.user.as_ref().is_some_and(|u| u.id == user.id) =>
            {
                self.user = Some(user.clone());
            }
            Some(user) => {
                tracing::info!(user_id = %user.id, "Session started");
                self.reset();
                self.user = Some(user.clone());
                self.start_load(user.id.clone());
            }
        }
    }

    fn reset(&mut self) {
        self.session_generation += 1;
        self.load_generation += 1;
        self.offers = Slot::Idle;
        self.click_count = Slot::Idle;
        self.completions_since_load = 0;
        self.dialog = None;
    }

    // ─── Data Loading ────────────────────────────────────────────

    /// Re-run the offers + click count load for the signed-in user.
    ///
    /// Refused while a completion is in flight.
    pub fn reload(&mut self) -> Result<()> {
        let user_id = self.require_user()?.id.clone();
        if self.dialog.as_ref().is_some_and(|d| d.completing) {
            return Err(AppError::InvalidState(
                "A completion is in progress".to_string(),
            ));
        }
        self.start_load(user_id);
        Ok(())
    }

    /// Queue both fetches. Each fills its own slot when it settles.
    fn start_load(&mut self, user_id: String) {
        self.load_generation += 1;
        let generation = self.load_generation;
        self.offers = Slot::Pending;
        self.click_count = Slot::Pending;
        self.completions_since_load = 0;

        tracing::debug!(generation, user_id = %user_id, "Loading offers and click count");

        let store = Arc::clone(&self.store);
        self.pending.push(Box::pin(async move {
            let result = store.fetch_offers().await;
            Outcome::Offers { generation, result }
        }));

        let store = Arc::clone(&self.store);
        self.pending.push(Box::pin(async move {
            let count = store.fetch_user_total_clicks(&user_id).await;
            Outcome::ClickCount { generation, count }
        }));
    }

    // ─── Dialog ──────────────────────────────────────────────────

    /// Open the detail dialog for an offer in the current list.
    pub fn select_offer(&mut self, offer_id: &str) -> Result<&Offer> {
        self.require_user()?;
        if self.dialog.as_ref().is_some_and(|d| d.completing) {
            return Err(AppError::InvalidState(
                "A completion is in progress".to_string(),
            ));
        }

        let offer = self
            .offers
            .ready()
            .ok_or_else(|| AppError::InvalidState("Offers are not loaded".to_string()))?
            .iter()
            .find(|o| o.id == offer_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Offer {offer_id}")))?;

        let dialog = self.dialog.insert(Dialog {
            offer,
            completing: false,
        });
        Ok(&dialog.offer)
    }

    /// Close the dialog. Returns whether one was open.
    ///
    /// Refused while its completion is in flight.
    pub fn close_dialog(&mut self) -> Result<bool> {
        match &self.dialog {
            Some(dialog) if dialog.completing => Err(AppError::InvalidState(
                "A completion is in progress".to_string(),
            )),
            Some(_) => {
                self.dialog = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Complete the open offer.
    ///
    /// Returns the link to open right away; the completion record is written
    /// in the background and the dialog closes once that settles, whatever the
    /// result. An offer without a valid link is refused here, the dialog stays
    /// open and the backend is not contacted.
    pub fn complete_selected(&mut self) -> Result<String> {
        let user_id = self.require_user()?.id.clone();
        let dialog = self
            .dialog
            .as_mut()
            .ok_or_else(|| AppError::InvalidState("No offer selected".to_string()))?;
        if dialog.completing {
            return Err(AppError::InvalidState(
                "A completion is in progress".to_string(),
            ));
        }

        let link = dialog.offer.completion_link()?.to_string();
        dialog.completing = true;

        let offer_id = dialog.offer.id.clone();
        let generation = self.session_generation;
        let store = Arc::clone(&self.store);
        self.pending.push(Box::pin(async move {
            let result = store.track_offer_click(&offer_id, &user_id).await;
            Outcome::Completion {
                generation,
                offer_id,
                result,
            }
        }));

        Ok(link)
    }

    // ─── Outcomes ────────────────────────────────────────────────

    /// Whether any request is still outstanding.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Wait for the next outstanding request to settle.
    ///
    /// Returns `None` immediately when nothing is outstanding.
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        self.pending.next().await
    }

    /// Apply a settled request to the state.
    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Offers { generation, result } => {
                if generation != self.load_generation {
                    tracing::debug!(generation, "Discarding stale offers result");
                    return;
                }
                self.offers = match result {
                    Ok(offers) => Slot::Ready(offers),
                    Err(e) => {
                        tracing::error!(error = %e, "Error loading offers");
                        Slot::Failed(e.to_string())
                    }
                };
            }
            Outcome::ClickCount { generation, count } => {
                if generation != self.load_generation {
                    tracing::debug!(generation, "Discarding stale click count");
                    return;
                }
                self.click_count = Slot::Ready(count + self.completions_since_load);
                self.completions_since_load = 0;
            }
            Outcome::Completion {
                generation,
                offer_id,
                result,
            } => {
                if generation != self.session_generation {
                    tracing::debug!(generation, offer_id = %offer_id, "Discarding completion from an ended session");
                    return;
                }
                match result {
                    Ok(()) => {
                        // Count only grows, and only after the insert is confirmed.
                        match &mut self.click_count {
                            Slot::Ready(count) => *count += 1,
                            Slot::Pending => self.completions_since_load += 1,
                            Slot::Idle | Slot::Failed(_) => {}
                        }
                        tracing::info!(offer_id = %offer_id, "Offer tracked successfully");
                    }
                    Err(e) => {
                        tracing::error!(offer_id = %offer_id, error = %e, "Failed to track offer");
                    }
                }
                if self
                    .dialog
                    .as_ref()
                    .is_some_and(|d| d.completing && d.offer.id == offer_id)
                {
                    self.dialog = None;
                }
            }
        }
    }

    /// Wait for one request and apply it. Returns false when none was pending.
    pub async fn settle_next(&mut self) -> bool {
        match self.next_outcome().await {
            Some(outcome) => {
                self.apply(outcome);
                true
            }
            None => false,
        }
    }

    /// Apply outstanding requests until none are left.
    pub async fn settle_all(&mut self) {
        while self.settle_next().await {}
    }

    // ─── Queries ─────────────────────────────────────────────────

    pub fn state(&self) -> DashboardState {
        if self.session_loading {
            return DashboardState::Loading;
        }
        if self.user.is_none() {
            return DashboardState::Unauthenticated;
        }
        match &self.dialog {
            Some(dialog) if dialog.completing => DashboardState::Completing,
            Some(_) => DashboardState::OfferSelected,
            None if !self.is_loading() && self.offers.ready().is_some() => {
                DashboardState::AuthenticatedReady
            }
            None => DashboardState::AuthenticatedEmpty,
        }
    }

    /// True until both the offers and the click count have settled.
    pub fn is_loading(&self) -> bool {
        self.user.is_some() && !(self.offers.is_settled() && self.click_count.is_settled())
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Offers to list; empty unless loaded.
    pub fn offers(&self) -> &[Offer] {
        self.offers.ready().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Why the offers could not be loaded, if they could not.
    pub fn offers_error(&self) -> Option<&str> {
        match &self.offers {
            Slot::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Completed offer count, once known.
    pub fn click_count(&self) -> Option<u64> {
        self.click_count.ready().copied()
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    fn require_user(&self) -> Result<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::InvalidState("Not signed in".to_string()))
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offer repository: the only place that talks to the offer tables.

use crate::db::rest::{Direction, RestClient};
use crate::db::tables;
use crate::error::Result;
use crate::models::{NewOfferClick, Offer};
use crate::services::auth::AuthClient;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;

/// Offer operations the dashboard depends on.
pub trait OfferStore: Send + Sync + 'static {
    /// Active offers, newest first. No partial results on failure.
    fn fetch_offers(&self) -> impl Future<Output = Result<Vec<Offer>>> + Send;

    /// Completions recorded by `user_id`. Degrades to 0 on any failure.
    fn fetch_user_total_clicks(&self, user_id: &str) -> impl Future<Output = u64> + Send;

    /// Record one completion of `offer_id` by `user_id`, stamped now.
    ///
    /// Not idempotent: every call inserts a new record.
    fn track_offer_click(
        &self,
        offer_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// `OfferStore` backed by the REST query service.
///
/// Requests run with the current session's access token so row-level
/// policies on the backend apply.
#[derive(Clone)]
pub struct OfferRepository {
    rest: RestClient,
    auth: Arc<AuthClient>,
}

impl OfferRepository {
    pub fn new(rest: RestClient, auth: Arc<AuthClient>) -> Self {
        Self { rest, auth }
    }

    async fn count_clicks(&self, user_id: &str) -> Result<u64> {
        let token = self.auth.access_token().await?;
        self.rest
            .from(tables::OFFER_CLICKS)
            .select("*")
            .eq("user_id", user_id)
            .bearer(token)
            .count()
            .await
    }
}

impl OfferStore for OfferRepository {
    async fn fetch_offers(&self) -> Result<Vec<Offer>> {
        let token = self.auth.access_token().await?;
        let offers: Vec<Offer> = self
            .rest
            .from(tables::OFFERS)
            .select("*")
            .eq("is_active", true)
            .order("created_at", Direction::Descending)
            .bearer(token)
            .fetch()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error fetching offers"))?;

        tracing::debug!(count = offers.len(), "Fetched active offers");
        Ok(offers)
    }

    async fn fetch_user_total_clicks(&self, user_id: &str) -> u64 {
        match self.count_clicks(user_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Error fetching click count, using 0");
                0
            }
        }
    }

    async fn track_offer_click(&self, offer_id: &str, user_id: &str) -> Result<()> {
        let record = NewOfferClick {
            offer_id: offer_id.to_string(),
            user_id: user_id.to_string(),
            clicked_at: format_utc_rfc3339(Utc::now()),
        };

        let token = self.auth.access_token().await?;
        self.rest
            .from(tables::OFFER_CLICKS)
            .bearer(token)
            .insert(&[record])
            .await
            .inspect_err(|e| tracing::error!(offer_id, user_id, error = %e, "Error tracking click"))?;

        tracing::info!(offer_id, user_id, "Offer click tracked");
        Ok(())
    }
}

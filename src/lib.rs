// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! TaskEarn: browse offers and record their completion.
//!
//! This crate provides the client for a hosted auth + data backend: a
//! session store, the offer repository, and the dashboard controller that
//! ties them together, plus a terminal front-end.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{OfferRepository, RestClient};
use services::{AuthClient, SupabaseClient};
use std::sync::Arc;

/// Backend-facing components, constructed once and shared.
pub struct AppContext {
    pub config: Config,
    pub auth: Arc<AuthClient>,
    pub repository: Arc<OfferRepository>,
}

impl AppContext {
    /// Build the backend handle and inject it into auth and the repository.
    pub fn new(config: Config) -> error::Result<Self> {
        let backend = SupabaseClient::new(&config)?;
        let auth = Arc::new(AuthClient::new(
            backend.clone(),
            config.session_file.clone(),
        ));
        let repository = Arc::new(OfferRepository::new(
            RestClient::new(backend),
            Arc::clone(&auth),
        ));
        Ok(Self {
            config,
            auth,
            repository,
        })
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Handle to the hosted backend (auth + REST query service).
//!
//! Constructed once at startup and passed to the auth client and the offer
//! repository. Cloning is cheap; clones share the connection pool.

use crate::config::Config;
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Backend HTTP handle.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    anon_key: Arc<str>,
}

impl SupabaseClient {
    /// Create a backend handle from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: Arc::from(config.supabase_url.as_str()),
            anon_key: Arc::from(config.anon_key.as_str()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public API key; also the bearer token for anonymous requests.
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// URL of an auth endpoint, e.g. `auth_url("token")`.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// URL of a table in the REST query service.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Start a request carrying the public API key.
    ///
    /// `bearer` is the session access token; anonymous requests use the key.
    pub fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.as_ref())
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    /// Check response status and return error if not successful.
    pub async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Backend rate limit hit (429)");
        }
        Err(AppError::from_status(status, body))
    }

    /// Check response and parse JSON body.
    pub async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("JSON parse error: {e}")))
    }
}

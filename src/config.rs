// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.
//!
//! Only two values matter to the backend: the service URL and its public
//! API key. Both fall back to the local development stack when unset.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Local development stack started by the backend's CLI.
pub const DEFAULT_SUPABASE_URL: &str = "http://localhost:54321";
/// Public (anonymous) key of the local development stack.
pub const DEFAULT_ANON_KEY: &str = "sb_publishable_local-development-key";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend (no trailing slash)
    pub supabase_url: String,
    /// Public API key sent with every request
    pub anon_key: String,
    /// Where the auth client persists its session (None disables persistence)
    pub session_file: Option<PathBuf>,
    /// Per-request timeout
    pub http_timeout: Duration,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase_url = first_var(&["SUPABASE_URL", "REACT_APP_SUPABASE_URL"])
            .unwrap_or_else(|| DEFAULT_SUPABASE_URL.to_string());
        let anon_key = first_var(&["SUPABASE_ANON_KEY", "REACT_APP_SUPABASE_ANON_KEY"])
            .unwrap_or_else(|| DEFAULT_ANON_KEY.to_string());

        let session_file = match env::var("TASKEARN_SESSION_FILE") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => default_session_file(),
        };

        let http_timeout = match env::var("TASKEARN_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("TASKEARN_HTTP_TIMEOUT_SECS", raw))?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let log_format = match env::var("TASKEARN_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            supabase_url,
            anon_key,
            session_file,
            http_timeout: Duration::from_secs(http_timeout),
            log_format,
        }
        .normalized()
    }

    /// Replace the endpoint and key, e.g. from command-line flags.
    pub fn with_endpoint(
        mut self,
        url: Option<String>,
        anon_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = url {
            self.supabase_url = url;
        }
        if let Some(key) = anon_key {
            self.anon_key = key;
        }
        self.normalized()
    }

    /// Offline defaults for tests: no persisted session, short timeout.
    pub fn test_default() -> Self {
        Self {
            supabase_url: "http://127.0.0.1:9".to_string(),
            anon_key: "test-anon-key".to_string(),
            session_file: None,
            http_timeout: Duration::from_secs(2),
            log_format: LogFormat::Pretty,
        }
    }

    fn normalized(mut self) -> Result<Self, ConfigError> {
        self.supabase_url = self.supabase_url.trim().trim_end_matches('/').to_string();
        if !(self.supabase_url.starts_with("http://") || self.supabase_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(
                "SUPABASE_URL",
                self.supabase_url.clone(),
            ));
        }
        self.anon_key = self.anon_key.trim().to_string();
        if self.anon_key.is_empty() {
            return Err(ConfigError::Invalid("SUPABASE_ANON_KEY", String::new()));
        }
        Ok(self)
    }
}

fn first_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
}

fn default_session_file() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".taskearn").join("session.json"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Minimal fluent client for the REST query service.
//!
//! Supports what the client needs and nothing more:
//! - filtered, ordered selects
//! - exact row counts (HEAD + `Content-Range`)
//! - inserts without a returned representation

use crate::error::{AppError, Result};
use crate::services::supabase::SupabaseClient;
use reqwest::header::CONTENT_RANGE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;

/// Sort direction for `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// REST query client.
#[derive(Clone)]
pub struct RestClient {
    backend: SupabaseClient,
}

impl RestClient {
    pub fn new(backend: SupabaseClient) -> Self {
        Self { backend }
    }

    /// Start a query against `table`.
    pub fn from(&self, table: &str) -> Query<'_> {
        Query {
            backend: &self.backend,
            url: self.backend.rest_url(table),
            params: Vec::new(),
            bearer: None,
        }
    }
}

/// A query under construction.
pub struct Query<'a> {
    backend: &'a SupabaseClient,
    url: String,
    params: Vec<(String, String)>,
    bearer: Option<String>,
}

impl Query<'_> {
    /// Columns to return (`*` for all).
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    /// Keep rows where `column = value`.
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.params
            .push(("order".to_string(), format!("{column}.{}", direction.as_str())));
        self
    }

    /// Run as the signed-in user instead of anonymously.
    pub fn bearer(mut self, access_token: Option<String>) -> Self {
        self.bearer = access_token;
        self
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        self.backend
            .request(method, &self.url, self.bearer.as_deref())
            .query(&self.params)
    }

    /// Fetch matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let response = self.request(Method::GET).send().await?;
        SupabaseClient::check_response_json(response).await
    }

    /// Exact number of matching rows, without transferring them.
    pub async fn count(self) -> Result<u64> {
        let response = self
            .request(Method::HEAD)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = SupabaseClient::check_response(response).await?;

        let header = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Transport("Missing Content-Range header".to_string()))?;

        parse_content_range_total(header).ok_or_else(|| {
            AppError::Transport(format!("Unparsable Content-Range header: {header}"))
        })
    }

    /// Insert rows; the backend does not echo them back.
    pub async fn insert<T: Serialize>(self, rows: &[T]) -> Result<()> {
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        SupabaseClient::check_response(response).await?;
        Ok(())
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Offer and completion ("offer click") models.

use crate::error::{AppError, Result};
use crate::models::null_as_default;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Avatar service used when an offer has no icon.
const AVATAR_FALLBACK_URL: &str = "https://ui-avatars.com/api/";

/// A task published by the backend. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Offer {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Icon URL (absent or empty means "generate one")
    #[serde(default)]
    pub icon_url: Option<String>,
    /// External link the user follows to complete the offer
    #[serde(default)]
    #[validate(url)]
    pub link: Option<String>,
    /// Instructional steps, in display order
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<String>,
    /// Terms and conditions, in display order
    #[serde(default, deserialize_with = "null_as_default")]
    pub terms: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// The link to open when the user completes this offer.
    ///
    /// Fails with `Validation` when the link is absent, empty, not a URL, or
    /// not http(s).
    pub fn completion_link(&self) -> Result<&str> {
        let link = self
            .link
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| AppError::Validation(AppError::MISSING_LINK.to_string()))?;

        self.validate()
            .map_err(|_| AppError::Validation(AppError::MISSING_LINK.to_string()))?;

        if !(link.starts_with("https://") || link.starts_with("http://")) {
            return Err(AppError::Validation(AppError::MISSING_LINK.to_string()));
        }
        Ok(link)
    }

    /// Icon to display, falling back to a generated avatar from the title.
    pub fn icon(&self) -> String {
        match self.icon_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => format!(
                "{}?name={}&background=random",
                AVATAR_FALLBACK_URL,
                urlencoding::encode(&self.title)
            ),
        }
    }
}

/// Stored completion record (`offer_clicks` row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferClick {
    pub id: String,
    pub user_id: String,
    pub offer_id: String,
    pub clicked_at: String,
}

/// Insert payload for a completion record; the backend assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOfferClick {
    pub offer_id: String,
    pub user_id: String,
    /// RFC 3339 UTC timestamp
    pub clicked_at: String,
}

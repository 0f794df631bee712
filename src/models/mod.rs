// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod offer;
pub mod session;

pub use offer::{NewOfferClick, Offer, OfferClick};
pub use session::{Session, User};

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the type's default (e.g. an empty step list).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

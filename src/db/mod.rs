// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data layer over the hosted REST query service.

pub mod offers;
pub mod rest;

pub use offers::{OfferRepository, OfferStore};
pub use rest::{Direction, RestClient};

/// Table names as constants.
pub mod tables {
    pub const OFFERS: &str = "offers";
    /// Completion records, one row per completed offer
    pub const OFFER_CLICKS: &str = "offer_clicks";
}

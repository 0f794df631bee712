// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - backend access and session tracking.

pub mod auth;
pub mod session_store;
pub mod supabase;

pub use auth::{AuthChange, AuthClient, AuthEvent, AuthProvider, SignUpOutcome};
pub use session_store::{SessionSnapshot, SessionStore};
pub use supabase::SupabaseClient;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plain-text rendering of the dashboard screens.

use crate::dashboard::controller::{DashboardController, DashboardState, Dialog};
use crate::db::OfferStore;
use crate::models::Offer;
use std::fmt::Write;

const APP_NAME: &str = "TaskEarn";
const CARD_DESCRIPTION_CHARS: usize = 90;

/// Render whatever screen the controller is on.
pub fn render<S: OfferStore>(controller: &DashboardController<S>) -> String {
    match controller.state() {
        DashboardState::Loading => "Checking your session...\n".to_string(),
        DashboardState::Unauthenticated => render_sign_in(),
        _ => render_dashboard(controller),
    }
}

/// The authentication screen.
pub fn render_sign_in() -> String {
    format!(
        "Welcome to {APP_NAME}\n\
         Sign in to see available tasks:\n  \
         login <email> <password>\n  \
         signup <email> <password>\n"
    )
}

fn render_dashboard<S: OfferStore>(controller: &DashboardController<S>) -> String {
    let mut out = String::new();
    let email = controller.user().and_then(|u| u.email.as_deref());
    out.push_str(&render_navbar(email, controller.click_count()));
    out.push('\n');
    out.push_str("Available Tasks\n");
    out.push_str("Select a task to view details and complete it.\n\n");

    if controller.is_loading() {
        for _ in 0..3 {
            out.push_str("  [ ........ ]  loading\n");
        }
    } else if controller.offers().is_empty() {
        out.push_str("  No tasks available\n  Check back later for new offers.\n");
    } else {
        for (index, offer) in controller.offers().iter().enumerate() {
            out.push_str(&render_offer_card(index + 1, offer));
        }
    }

    if let Some(dialog) = controller.dialog() {
        out.push('\n');
        out.push_str(&render_dialog(dialog));
    }
    out
}

/// Top bar with the signed-in user and their completed count.
pub fn render_navbar(email: Option<&str>, click_count: Option<u64>) -> String {
    let count = click_count.map_or_else(|| "-".to_string(), |n| n.to_string());
    format!(
        "{APP_NAME} | {} | Completed: {count} Tasks | logout\n",
        email.unwrap_or("")
    )
}

/// One selectable entry in the offer list.
pub fn render_offer_card(position: usize, offer: &Offer) -> String {
    format!(
        "  [{position}] {}  (Active)\n      {}\n      icon: {}\n",
        offer.title,
        truncate(&offer.description, CARD_DESCRIPTION_CHARS),
        offer.icon()
    )
}

/// The detail dialog for the open offer.
pub fn render_dialog(dialog: &Dialog) -> String {
    let offer = &dialog.offer;
    let mut out = String::new();

    let _ = writeln!(out, "┌─ {} ", offer.title);
    let _ = writeln!(out, "│ {}", offer.description);
    let _ = writeln!(out, "│");
    let _ = writeln!(out, "│ STEPS TO COMPLETE");
    if offer.steps.is_empty() {
        let _ = writeln!(out, "│   No specific steps provided.");
    } else {
        for (index, step) in offer.steps.iter().enumerate() {
            let _ = writeln!(out, "│   {}. {}", index + 1, step);
        }
    }

    if !offer.terms.is_empty() {
        let _ = writeln!(out, "│");
        let _ = writeln!(out, "│ TERMS & CONDITIONS");
        for term in &offer.terms {
            let _ = writeln!(out, "│   - {term}");
        }
    }

    let _ = writeln!(out, "│");
    let action = if dialog.completing {
        "Processing...".to_string()
    } else {
        match offer.completion_link() {
            Ok(link) => format!("complete -> {link}   |   close"),
            Err(_) => "complete (unavailable: no link)   |   close".to_string(),
        }
    };
    let _ = writeln!(out, "└─ {action}");
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Commands typed into the interactive dashboard.

use crate::error::{AppError, Result};
use crate::models::Offer;

/// A user gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the detail dialog (list position or offer id)
    Open(String),
    Close,
    Complete,
    Refresh,
    Login { email: String, password: String },
    Signup { email: String, password: String },
    Logout,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  open <n|id>                 show details for an offer
  complete                    open the offer link and record completion
  close                       close the detail view
  refresh                     reload offers and your completed count
  login <email> <password>    sign in
  signup <email> <password>   create an account
  logout                      sign out
  help                        show this help
  quit                        exit
";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("open" | "show", [target]) => Command::Open(target.to_string()),
        ("close" | "cancel", []) => Command::Close,
        ("complete" | "done", []) => Command::Complete,
        ("refresh" | "reload", []) => Command::Refresh,
        ("login", [email, password]) => Command::Login {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("signup", [email, password]) => Command::Signup {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("logout", []) => Command::Logout,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (verb, _) => {
            return Err(AppError::Validation(format!(
                "Unrecognized command '{verb}' (try 'help')"
            )))
        }
    };
    Ok(Some(command))
}

/// Resolve a 1-based list position or an offer id to an offer id.
pub fn resolve_offer<'a>(offers: &'a [Offer], target: &str) -> Option<&'a str> {
    if let Ok(position) = target.parse::<usize>() {
        if let Some(offer) = position.checked_sub(1).and_then(|i| offers.get(i)) {
            return Some(&offer.id);
        }
    }
    offers
        .iter()
        .find(|o| o.id == target)
        .map(|o| o.id.as_str())
}

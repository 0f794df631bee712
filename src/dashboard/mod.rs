// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard: controller state machine, text rendering and input commands.

pub mod command;
pub mod controller;
pub mod view;

pub use command::Command;
pub use controller::{DashboardController, DashboardState, Dialog, Outcome, Slot};

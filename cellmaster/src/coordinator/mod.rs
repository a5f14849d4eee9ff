// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The master coordination state machine.
//!
//! This module owns the top-level hierarchical state machine, processes
//! operator commands, routes site reports, arms the phase timeouts, and
//! publishes state changes. All of it runs on one cooperative dispatcher
//! loop; see [`Master::run`].

mod dispatcher;
mod imp;
mod internal_events;
mod state;

pub use imp::*;
pub use state::*;

use internal_events::*;

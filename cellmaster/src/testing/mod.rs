// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The testing-phase state machines.
//!
//! During a `next` cycle every site walks through its own small state
//! machine ([`site`]); the multi-site layer ([`multi_site`]) aggregates them,
//! detects cycle completion, and mediates the shared-resource negotiation.

mod multi_site;
mod site;

pub use multi_site::*;
pub use site::*;

// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events processed by the dispatcher loop.
//!
//! Everything that can wake the master is funneled into one event type, so
//! all state transitions happen sequentially in [`Master::run`]'s select
//! loop.
//!
//! [`Master::run`]: crate::coordinator::Master::run

use crate::messages::{ResourceRequest, SiteEvent};

/// One unit of work for the dispatcher loop.
#[derive(Debug)]
pub(super) enum InternalEvent {
    /// A report from a site arrived over the bus.
    Site(SiteEvent),
    /// An operator command document arrived from the UI transport.
    Operator(serde_json::Value),
    /// The phase timeout fired; carries the armed message.
    Timeout(String),
    /// The resource configuration requested during testing has been applied.
    ///
    /// Carries the negotiation epoch it belongs to; a stale epoch means the
    /// cycle it was spawned for is long gone and the event is dropped.
    ResourceConfigApplied {
        /// The negotiation epoch at spawn time.
        epoch: u64,
        /// The request that was applied.
        request: ResourceRequest,
    },
    /// The once-a-second UI tick.
    Tick,
}

// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// The top-level master state.
///
/// While [`Testing`](Self::Testing), the multi-site testing machine tracks
/// the inner progress; externally all its substates appear as the single
/// name `testing`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MasterState {
    /// Initializing, transport not up yet.
    Startup,
    /// Waiting for every site's control to report in.
    Connecting,
    /// All sites present, no test program loaded.
    Initialized,
    /// A test program is being distributed and started.
    Loading,
    /// The test program is loaded on every site; ready for a cycle.
    Ready,
    /// A test cycle is running.
    Testing,
    /// The test program is being shut down.
    Unloading,
    /// Unrecoverable protocol failure, e.g. an interface version mismatch.
    /// Terminal until process restart.
    Error,
    /// Recoverable failure; an operator `reset` leads back to `connecting`.
    SoftError,
}

impl MasterState {
    /// The externally visible state name.
    pub fn external_name(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Connecting => "connecting",
            Self::Initialized => "initialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Testing => "testing",
            Self::Unloading => "unloading",
            Self::Error => "error",
            Self::SoftError => "softerror",
        }
    }
}

impl fmt::Display for MasterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.external_name())
    }
}

// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the master core.
//!
//! Only conditions that are fatal at startup or that a caller can sensibly
//! handle are expressed as `Result` errors. Runtime misbehavior of a site is
//! not an error value: it drives the master into its `softerror` state, from
//! which only an operator reset leads out.

use crate::{messages::SiteId, testing::SiteTestingState};
use camino::Utf8PathBuf;
use thiserror::Error;

/// A fatal problem with the master configuration, surfaced at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("master got invalid configuration")]
    Parse(#[source] serde_json::Error),

    /// The configuration names no sites.
    #[error("master got no sites assigned")]
    NoSites,
}

/// An error while loading or persisting user settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read user settings from `{path}`")]
    Read {
        /// Path of the settings file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The settings file could not be parsed.
    #[error("failed to parse user settings in `{path}`")]
    Parse {
        /// Path of the settings file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The settings file could not be written.
    #[error("failed to write user settings to `{path}`")]
    Write {
        /// Path of the settings file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// An operator payload named a setting outside the known set.
    #[error("unknown user setting `{name}`")]
    UnknownSetting {
        /// The offending name.
        name: String,
    },

    /// An operator payload carried a value that does not coerce to an
    /// integer.
    #[error("user setting `{name}` has a non-integer value")]
    BadValue {
        /// The offending setting name.
        name: String,
    },
}

/// The job data source could not produce test parameters for a lot.
#[derive(Debug, Error)]
#[error("failed to retrieve job data for lot `{lot_number}`: {reason}")]
pub struct JobDataError {
    /// The requested lot number.
    pub lot_number: String,
    /// Human-readable description of the failure.
    pub reason: String,
}

/// An error while building a [`Master`](crate::coordinator::Master).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MasterBuildError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The persistent user settings could not be initialized.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// A per-site testing event arrived in a state that does not accept it.
///
/// These are benign at the coordination level (a duplicate bus delivery looks
/// exactly like this); the dispatcher logs them and moves on.
#[derive(Debug, Error)]
#[error("site `{site_id}` cannot accept `{event}` in state `{state}`")]
pub struct SiteTransitionError {
    /// The reporting site.
    pub site_id: SiteId,
    /// Name of the rejected event.
    pub event: &'static str,
    /// The site's testing state at the time.
    pub state: SiteTestingState,
}

/// A violation of the multi-site testing protocol.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestingError {
    /// Two sites asked for different configurations of the shared resource
    /// within the same cycle. Fails the cycle.
    #[error(
        "mismatch in resource request from site `{site_id}`: \
         previous request of site `{other_site_id}` differs"
    )]
    ResourceMismatch {
        /// The site whose request exposed the mismatch.
        site_id: SiteId,
        /// The site that requested a different configuration earlier.
        other_site_id: SiteId,
    },

    /// A single-site event was invalid for that site's current state.
    #[error(transparent)]
    Transition(#[from] SiteTransitionError),
}

/// An operator command that could not be executed.
///
/// Dispatch failures are logged and swallowed; the master stays in its
/// current state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The command document was malformed or named an unknown verb.
    #[error("unknown or malformed operator command")]
    Parse(#[source] serde_json::Error),

    /// The verb is known but not allowed in the current state.
    #[error("command `{verb}` is not allowed in state `{state}`")]
    InvalidState {
        /// The command verb.
        verb: String,
        /// The master state at dispatch time.
        state: String,
    },

    /// A `usersettings` payload was invalid or could not be persisted.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

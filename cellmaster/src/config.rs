// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master configuration.
//!
//! The configuration is parsed once at startup and is immutable afterwards.
//! Key names follow the cell's JSON configuration document.

use crate::{errors::ConfigError, messages::SiteId};
use camino::Utf8PathBuf;
use serde::Deserialize;

/// Immutable configuration of the master, parsed at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct MasterConfig {
    /// Identifier of the tester device this master controls.
    pub device_id: String,

    /// The configured sites, in cell order. Must not be empty.
    pub sites: Vec<SiteId>,

    /// Hostname of the message broker. Used by the embedding transport, not
    /// by the core itself.
    pub broker_host: String,

    /// Port of the message broker.
    pub broker_port: u16,

    /// Whether the phase timeouts are armed at all. Disabled in interactive
    /// debugging setups.
    pub enable_timeouts: bool,

    /// Deployment environment name, e.g. `"F1"`.
    pub environment: String,

    /// Format of the job description files, forwarded to the job data
    /// source.
    #[serde(default)]
    pub jobformat: Option<String>,

    /// Where to persist user settings. Settings are kept in memory only when
    /// unset.
    #[serde(default)]
    pub user_settings_filepath: Option<Utf8PathBuf>,

    /// Skip retrieval and verification of job data on `load` and broadcast a
    /// debug stub parameter set instead.
    #[serde(default)]
    pub skip_jobdata_verification: bool,
}

impl MasterConfig {
    /// Parses a configuration document and checks it for sanity.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks an already-deserialized configuration for sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        Ok(())
    }

    /// Whether user settings survive restarts.
    pub fn persistent_user_settings_enabled(&self) -> bool {
        self.user_settings_filepath.is_some()
    }
}

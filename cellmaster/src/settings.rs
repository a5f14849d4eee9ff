// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User settings: a fixed set of per-run switches the operator can toggle.
//!
//! Settings are broadcast to the sites with every `next` command as the run
//! configuration. When a settings path is configured, every change rewrites
//! the file with a defaults-filled snapshot, so the file on disk is always
//! complete and loadable by older and newer masters alike.

use crate::errors::SettingsError;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fmt, io::Write, str::FromStr};

/// The known user setting names.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingName {
    /// Stop the run when a part fails.
    StopOnFail,
    /// Execute one test at a time, waiting for the operator in between.
    SingleStep,
    /// Stop right before the given test number.
    StopAtTestNumber,
    /// Raise the hardware trigger line when the given test starts.
    TriggerOnTest,
    /// Raise the hardware trigger line on the first failing test.
    TriggerOnFail,
    /// Apply trigger settings per site instead of cell-wide.
    TriggerSiteSpecific,
}

impl SettingName {
    /// All known names, in the order they are reported to the operator.
    pub const ALL: [SettingName; 6] = [
        SettingName::StopOnFail,
        SettingName::SingleStep,
        SettingName::StopAtTestNumber,
        SettingName::TriggerOnTest,
        SettingName::TriggerOnFail,
        SettingName::TriggerSiteSpecific,
    ];

    /// The wire name of this setting.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopOnFail => "stop_on_fail",
            Self::SingleStep => "single_step",
            Self::StopAtTestNumber => "stop_at_test_number",
            Self::TriggerOnTest => "trigger_on_test",
            Self::TriggerOnFail => "trigger_on_fail",
            Self::TriggerSiteSpecific => "trigger_site_specific",
        }
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SettingName {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SettingsError::UnknownSetting { name: s.to_owned() })
    }
}

/// The value of one setting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct SettingValue {
    /// Whether the setting is in effect.
    pub active: bool,
    /// Numeric argument, `-1` when the setting takes none.
    pub value: i64,
}

impl Default for SettingValue {
    fn default() -> Self {
        Self {
            active: false,
            value: -1,
        }
    }
}

/// One entry of a `usersettings` operator payload, as received on the wire.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UserSettingEntry {
    /// The setting name.
    pub name: String,
    /// Whether the setting should be in effect.
    pub active: bool,
    /// Numeric argument; numbers and numeric strings are accepted.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl UserSettingEntry {
    /// Coerces the wire value to an integer; an absent value becomes `-1`.
    fn coerced_value(&self) -> Result<i64, SettingsError> {
        let bad = || SettingsError::BadValue {
            name: self.name.clone(),
        };
        match &self.value {
            None | Some(serde_json::Value::Null) => Ok(-1),
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(bad),
            Some(serde_json::Value::String(s)) => {
                if s.is_empty() {
                    Ok(-1)
                } else {
                    s.trim().parse().map_err(|_| bad())
                }
            }
            Some(_) => Err(bad()),
        }
    }
}

/// One entry of the settings snapshot pushed to the operator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserSetting {
    /// The setting name.
    pub name: SettingName,
    /// Whether the setting is in effect.
    pub active: bool,
    /// Numeric argument, `-1` when unset.
    pub value: i64,
}

/// The full settings map. Always carries every known name.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserSettings {
    values: IndexMap<SettingName, SettingValue>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl UserSettings {
    /// The hardcoded defaults: every setting inactive with value `-1`.
    pub fn defaults() -> Self {
        Self {
            values: SettingName::ALL
                .into_iter()
                .map(|name| (name, SettingValue::default()))
                .collect(),
        }
    }

    /// Builds a settings map from an operator payload, merged over the
    /// defaults. Settings the payload does not mention revert to their
    /// default.
    pub fn from_entries(entries: &[UserSettingEntry]) -> Result<Self, SettingsError> {
        let mut settings = Self::defaults();
        for entry in entries {
            let name: SettingName = entry.name.parse()?;
            let value = SettingValue {
                active: entry.active,
                value: entry.coerced_value()?,
            };
            settings.values.insert(name, value);
        }
        Ok(settings)
    }

    /// Looks up a single setting.
    pub fn get(&self, name: SettingName) -> SettingValue {
        self.values.get(&name).copied().unwrap_or_default()
    }

    /// The snapshot pushed to operator clients.
    pub fn to_message(&self) -> Vec<UserSetting> {
        self.values
            .iter()
            .map(|(name, value)| UserSetting {
                name: *name,
                active: value.active,
                value: value.value,
            })
            .collect()
    }

    /// Loads settings from `path`, falling back to the defaults when the
    /// file does not exist. Names missing from the file are filled with
    /// their defaults.
    pub fn load_or_defaults(path: &Utf8Path) -> Result<Self, SettingsError> {
        let input = match std::fs::read_to_string(path) {
            Ok(input) => input,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::defaults());
            }
            Err(error) => {
                return Err(SettingsError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };
        let partial: IndexMap<SettingName, SettingValue> =
            serde_json::from_str(&input).map_err(|error| SettingsError::Parse {
                path: path.to_owned(),
                error,
            })?;

        let mut settings = Self::defaults();
        for (name, value) in partial {
            settings.values.insert(name, value);
        }
        Ok(settings)
    }

    /// Atomically rewrites `path` with the defaults-filled snapshot.
    pub fn store(&self, path: &Utf8Path) -> Result<(), SettingsError> {
        let write_error = |error| SettingsError::Write {
            path: path.to_owned(),
            error,
        };
        let json = serde_json::to_string_pretty(self).expect("settings map serializes");
        AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(json.as_bytes()))
            .map_err(|error| match error {
                atomicwrites::Error::Internal(error) => write_error(error),
                atomicwrites::Error::User(error) => write_error(error),
            })
    }
}
